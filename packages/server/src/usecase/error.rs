//! ユースケース層のエラー型

use thiserror::Error;

use crate::domain::{ConnectionId, MessagePushError, SessionError};

/// 参加者接続のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to deliver init message: {0}")]
    InitFailed(#[from] MessagePushError),
}

/// クライアントコマンド（draw / clear / sync）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("connection {0} is not a participant of the session")]
    UnknownParticipant(ConnectionId),

    #[error(transparent)]
    Push(#[from] MessagePushError),
}
