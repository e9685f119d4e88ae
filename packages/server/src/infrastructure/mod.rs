//! Infrastructure 層
//!
//! - `dto`: WebSocket メッセージの JSON 表現とドメインモデルとの変換
//! - `message_pusher`: `MessagePusher` trait の実装

pub mod dto;
pub mod message_pusher;
