//! Message router: dispatches a decoded text message to the matching use case.

use thiserror::Error;

use crate::{
    domain::{ConnectionId, DrawSegment, ValueObjectError},
    infrastructure::dto::websocket::ClientMessage,
    ui::state::AppState,
    usecase::CommandError,
};

/// What a routed message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Drawn { delivered: usize },
    Cleared { delivered: usize },
    Synced,
}

/// A message that was dropped. The connection stays open in every case.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type")]
    UnknownType,

    #[error("invalid draw segment: {0}")]
    InvalidSegment(#[from] ValueObjectError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

pub async fn route_message(
    state: &AppState,
    sender: &ConnectionId,
    payload: &[u8],
) -> Result<RouteOutcome, RouteError> {
    let text = std::str::from_utf8(payload)?;
    let message: ClientMessage = serde_json::from_str(text)?;

    match message {
        ClientMessage::Draw { data } => {
            let segment = DrawSegment::try_from(data)?;
            let delivered = state.draw_segment_usecase.execute(sender, segment).await?;
            Ok(RouteOutcome::Drawn {
                delivered: delivered.len(),
            })
        }
        ClientMessage::Clear => {
            let delivered = state.clear_canvas_usecase.execute(sender).await?;
            Ok(RouteOutcome::Cleared {
                delivered: delivered.len(),
            })
        }
        ClientMessage::Sync => {
            state.sync_session_usecase.execute(sender).await?;
            Ok(RouteOutcome::Synced)
        }
        ClientMessage::Unknown => Err(RouteError::UnknownType),
    }
}
