//! ドメイン層
//!
//! 共有キャンバスのセッション（描画履歴と参加者）と、それを操作するための
//! インターフェースを定義します。

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod value_object;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use entity::{DrawSegment, Participant, Session};
pub use error::{MessagePushError, SessionError, ValueObjectError};
pub use event::ServerEvent;
pub use message_pusher::{BroadcastReport, MessagePusher, PusherChannel};
pub use value_object::{Color, ConnectionId, Timestamp};

/// プロセス全体で共有するセッション
///
/// セッションの変更と、それに続くブロードキャストは、このロックを保持したまま行う。
pub type SharedSession = Arc<Mutex<Session>>;
