//! Raw-socket WebSocket server: accept loop, upgrade and per-connection loop.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
