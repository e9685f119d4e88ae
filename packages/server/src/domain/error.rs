//! ドメイン層のエラー型

use thiserror::Error;

use super::value_object::ConnectionId;

/// 値オブジェクトの生成エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueObjectError {
    #[error("color must not be empty")]
    ColorEmpty,

    #[error("color exceeds {0} characters")]
    ColorTooLong(usize),

    #[error("segment field `{0}` is not a finite number")]
    NonFiniteNumber(&'static str),

    #[error("line width must not be negative (got {0})")]
    NegativeWidth(f64),
}

/// セッション集約の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection {0} is not registered")]
    ClientNotFound(ConnectionId),

    #[error("failed to push message: {0}")]
    PushFailed(String),

    #[error("failed to encode message: {0}")]
    EncodeFailed(String),
}
