//! Data Transfer Objects (DTOs) for the canvas wire protocol.

pub mod conversion;
pub mod websocket;
