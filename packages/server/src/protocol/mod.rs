//! WebSocket protocol engine: opening handshake and frame codec.

pub mod codec;
pub mod frame;
pub mod handshake;
pub mod message;

pub use codec::{CodecError, FrameCodec, Inbound};
pub use frame::{Frame, FrameError, OpCode, Role, close_code};
pub use handshake::{HandshakeError, UpgradeRequest};
pub use message::{DataMessage, MessageAssembler};
