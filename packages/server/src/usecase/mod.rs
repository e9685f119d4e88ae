//! ユースケース層
//!
//! セッションの変更とブロードキャストを 1 つのクリティカルセクションにまとめます。
//! ロックの取得順は常に `SharedSession` → MessagePusher 内部のレジストリ。

mod clear_canvas;
mod connect_participant;
mod disconnect_participant;
mod draw_segment;
mod error;
mod sync_session;

pub use clear_canvas::ClearCanvasUseCase;
pub use connect_participant::{ConnectParticipantUseCase, ConnectedParticipant};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use draw_segment::DrawSegmentUseCase;
pub use error::{CommandError, ConnectError};
pub use sync_session::SyncSessionUseCase;
