//! Conversion logic between DTOs and domain entities.

use crate::domain::{Color, DrawSegment, ServerEvent, ValueObjectError};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<dto::DrawSegmentDto> for DrawSegment {
    type Error = ValueObjectError;

    fn try_from(dto: dto::DrawSegmentDto) -> Result<Self, Self::Error> {
        DrawSegment::new(
            (dto.x0, dto.y0),
            (dto.x1, dto.y1),
            Color::new(dto.color)?,
            dto.width,
        )
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&DrawSegment> for dto::DrawSegmentDto {
    fn from(model: &DrawSegment) -> Self {
        Self {
            x0: model.x0,
            y0: model.y0,
            x1: model.x1,
            y1: model.y1,
            color: model.color.as_str().to_string(),
            width: model.width,
        }
    }
}

impl<'a> From<&ServerEvent<'a>> for dto::ServerMessage<'a> {
    fn from(event: &ServerEvent<'a>) -> Self {
        match *event {
            ServerEvent::Init {
                color,
                active_users,
                history,
            } => Self::Init {
                color: color.as_str(),
                active_users,
                draw_history: history.iter().map(dto::DrawSegmentDto::from).collect(),
            },
            ServerEvent::Draw(segment) => Self::Draw {
                data: segment.into(),
            },
            ServerEvent::Clear => Self::Clear,
            ServerEvent::UserCount(count) => Self::UserCount { count },
        }
    }
}

/// Serialize a server event into the JSON text carried by one frame.
pub fn encode_server_event(event: &ServerEvent<'_>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&dto::ServerMessage::from(event))
}
