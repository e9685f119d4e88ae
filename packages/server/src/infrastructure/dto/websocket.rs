//! WebSocket message DTOs.
//!
//! client → server:
//!
//! ```text
//! {"type":"draw","data":{"x0":n,"y0":n,"x1":n,"y1":n,"color":s,"width":n}}
//! {"type":"clear"}
//! {"type":"sync"}
//! ```
//!
//! server → client:
//!
//! ```text
//! {"type":"init","color":s,"activeUsers":n,"drawHistory":[segment,...]}
//! {"type":"draw","data":segment}
//! {"type":"clear"}
//! {"type":"userCount","count":n}
//! ```

use serde::{Deserialize, Serialize};

/// One line segment as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSegmentDto {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
    pub width: f64,
}

/// Messages sent by a participant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Draw { data: DrawSegmentDto },
    Clear,
    Sync,
    /// Any other `type` value.
    #[serde(other)]
    Unknown,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage<'a> {
    Init {
        color: &'a str,
        #[serde(rename = "activeUsers")]
        active_users: usize,
        #[serde(rename = "drawHistory")]
        draw_history: Vec<DrawSegmentDto>,
    },
    Draw {
        data: DrawSegmentDto,
    },
    Clear,
    UserCount {
        count: usize,
    },
}
