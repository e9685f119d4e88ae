//! Shared-canvas WebSocket server.
//!
//! Clients draw line segments on a common canvas; every accepted `draw` is kept
//! in an in-memory history and relayed to the other connected clients.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod protocol;
pub mod ui;
pub mod usecase;
