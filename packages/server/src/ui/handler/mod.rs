//! Connection handlers.

mod router;
mod upgrade;
mod websocket;

pub use websocket::handle_connection;
