//! WebSocket frame encoding and decoding (RFC 6455 §5).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```
//!
//! The functions here are pure: they never perform I/O. [`super::codec`]
//! adapts them to `tokio_util::codec` for use over a socket.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Default limit on a single frame's payload.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

const FIN_BIT: u8 = 0x80;
const RSV_BITS: u8 = 0x70;
const OPCODE_BITS: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN_BITS: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Parse the low nibble of the first header byte, or `None` for reserved codes.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    /// Close, ping and pong are control opcodes.
    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// Which end of the connection is decoding.
///
/// Frames sent by a client must be masked, frames sent by a server must not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Close status codes used by this server (RFC 6455 §7.4.1).
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const MESSAGE_TOO_BIG: u16 = 1009;

    /// Code to answer a peer's close frame with.
    ///
    /// A close without a code is answered with 1000. Codes an endpoint may
    /// send are echoed. Reserved (1004-1006, 1015) and unassigned codes are
    /// answered with 1002.
    pub fn reply_to(received: Option<u16>) -> u16 {
        match received {
            None => NORMAL,
            Some(code @ (1000..=1003 | 1007..=1014 | 3000..=4999)) => code,
            Some(_) => PROTOCOL_ERROR,
        }
    }
}

/// One decoded (and unmasked) WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            opcode,
            payload: payload.into(),
        }
    }

    /// A complete (FIN=1) text frame.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, payload)
    }

    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Ping, payload)
    }

    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Pong, payload)
    }

    /// Close frame carrying `code` and a UTF-8 `reason`.
    ///
    /// The reason is truncated so the payload stays within
    /// [`MAX_CONTROL_PAYLOAD`].
    pub fn close(code: u16, reason: &str) -> Self {
        let mut end = reason.len().min(MAX_CONTROL_PAYLOAD - 2);
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        let mut payload = BytesMut::with_capacity(2 + end);
        payload.put_u16(code);
        payload.put_slice(&reason.as_bytes()[..end]);
        Self::new(true, OpCode::Close, payload.freeze())
    }

    /// Status code of a close frame, if it carries one.
    pub fn close_code(&self) -> Option<u16> {
        match (self.opcode, self.payload.as_ref()) {
            (OpCode::Close, [hi, lo, ..]) => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

/// Violations detected while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("client frame is not masked")]
    Unmasked,

    #[error("server frame must not be masked")]
    UnexpectedMask,

    #[error("reserved bits set without a negotiated extension: {0:#04x}")]
    ReservedBits(u8),

    #[error("reserved opcode {0:#x}")]
    ReservedOpcode(u8),

    #[error("control frame must not be fragmented")]
    FragmentedControl,

    #[error("control frame payload of {0} bytes exceeds 125")]
    ControlTooLong(u64),

    #[error("payload length {0} is not minimally encoded")]
    NonMinimalLength(u64),

    #[error("close frame payload of 1 byte cannot carry a status code")]
    InvalidClosePayload,

    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,

    #[error("new data frame while a fragmented message is in progress")]
    InterleavedMessage,

    #[error("64-bit payload length has its most significant bit set")]
    LengthOverflow,

    #[error("payload of {declared} bytes exceeds the limit of {limit}")]
    PayloadTooLarge { declared: u64, limit: usize },
}

impl FrameError {
    /// Fatal errors leave the byte stream unframeable and end the connection.
    ///
    /// Every other violation is confined to a single frame, whose bytes have
    /// already been consumed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LengthOverflow | Self::PayloadTooLarge { .. })
    }

    /// Close status to send when this error ends the connection.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } => close_code::MESSAGE_TOO_BIG,
            _ => close_code::PROTOCOL_ERROR,
        }
    }
}

/// Result of decoding one complete frame from a buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Decoded {
    /// Bytes the frame occupied, header included.
    pub consumed: usize,
    /// The frame, or the recoverable violation it carried.
    pub frame: Result<Frame, FrameError>,
}

/// XOR `payload` with `key`, in place. Applying it twice restores the input.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

struct Header {
    fin: bool,
    rsv: u8,
    opcode: u8,
    mask: Option<[u8; 4]>,
    payload_len: u64,
    len_marker: u8,
    header_len: usize,
}

/// Parse the header, or `Ok(None)` if `src` does not hold all of it yet.
fn parse_header(src: &[u8], max_payload: usize) -> Result<Option<Header>, FrameError> {
    let [b0, b1, rest @ ..] = src else {
        return Ok(None);
    };
    let len_marker = b1 & LEN_BITS;
    let (payload_len, mut header_len) = match len_marker {
        LEN_16 => match rest {
            [a, b, ..] => (u64::from(u16::from_be_bytes([*a, *b])), 4),
            _ => return Ok(None),
        },
        LEN_64 => match rest.get(..8) {
            Some(ext) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(ext);
                let len = u64::from_be_bytes(raw);
                if len >> 63 != 0 {
                    return Err(FrameError::LengthOverflow);
                }
                (len, 10)
            }
            None => return Ok(None),
        },
        inline => (u64::from(inline), 2),
    };

    if payload_len > max_payload as u64 {
        return Err(FrameError::PayloadTooLarge {
            declared: payload_len,
            limit: max_payload,
        });
    }

    let mask = if b1 & MASK_BIT != 0 {
        let Some(key) = src.get(header_len..header_len + 4) else {
            return Ok(None);
        };
        header_len += 4;
        Some([key[0], key[1], key[2], key[3]])
    } else {
        None
    };

    Ok(Some(Header {
        fin: b0 & FIN_BIT != 0,
        rsv: b0 & RSV_BITS,
        opcode: b0 & OPCODE_BITS,
        mask,
        payload_len,
        len_marker,
        header_len,
    }))
}

fn validate(header: &Header, role: Role) -> Result<OpCode, FrameError> {
    if header.rsv != 0 {
        return Err(FrameError::ReservedBits(header.rsv));
    }
    let opcode = OpCode::from_u8(header.opcode).ok_or(FrameError::ReservedOpcode(header.opcode))?;
    match (role, header.mask.is_some()) {
        (Role::Server, false) => return Err(FrameError::Unmasked),
        (Role::Client, true) => return Err(FrameError::UnexpectedMask),
        _ => {}
    }
    let minimal = match header.len_marker {
        LEN_16 => header.payload_len >= u64::from(LEN_16),
        LEN_64 => header.payload_len > u64::from(u16::MAX),
        _ => true,
    };
    if !minimal {
        return Err(FrameError::NonMinimalLength(header.payload_len));
    }
    if opcode.is_control() {
        if !header.fin {
            return Err(FrameError::FragmentedControl);
        }
        if header.payload_len > MAX_CONTROL_PAYLOAD as u64 {
            return Err(FrameError::ControlTooLong(header.payload_len));
        }
        if opcode == OpCode::Close && header.payload_len == 1 {
            return Err(FrameError::InvalidClosePayload);
        }
    }
    Ok(opcode)
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` while `src` holds an incomplete frame. A complete frame
/// that breaks the protocol in a way confined to itself is reported through
/// [`Decoded::frame`] with its bytes still counted in [`Decoded::consumed`], so
/// the caller can skip it. `Err` means the stream cannot be framed any further.
pub fn decode_frame(
    src: &[u8],
    role: Role,
    max_payload: usize,
) -> Result<Option<Decoded>, FrameError> {
    let Some(header) = parse_header(src, max_payload)? else {
        return Ok(None);
    };
    // payload_len <= max_payload, so it fits in usize
    let total = header.header_len + header.payload_len as usize;
    if src.len() < total {
        return Ok(None);
    }

    let frame = validate(&header, role).map(|opcode| {
        let mut payload = src[header.header_len..total].to_vec();
        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }
        Frame::new(header.fin, opcode, payload)
    });

    Ok(Some(Decoded {
        consumed: total,
        frame,
    }))
}

/// Minimum bytes `src` must hold before [`decode_frame`] can finish, if the
/// header is already readable.
pub fn frame_len_hint(src: &[u8], max_payload: usize) -> Option<usize> {
    parse_header(src, max_payload)
        .ok()
        .flatten()
        .map(|header| header.header_len + header.payload_len as usize)
}

/// Append the wire form of `frame` to `dst`.
///
/// Pass `mask` only when encoding as a client; a server never masks.
pub fn encode_frame(frame: &Frame, mask: Option<[u8; 4]>, dst: &mut BytesMut) {
    let len = frame.payload.len();
    let first = (if frame.fin { FIN_BIT } else { 0 }) | frame.opcode.as_u8();
    let mask_bit = if mask.is_some() { MASK_BIT } else { 0 };

    dst.reserve(14 + len);
    dst.put_u8(first);
    if len < usize::from(LEN_16) {
        dst.put_u8(mask_bit | len as u8);
    } else if len <= usize::from(u16::MAX) {
        dst.put_u8(mask_bit | LEN_16);
        dst.put_u16(len as u16);
    } else {
        dst.put_u8(mask_bit | LEN_64);
        dst.put_u64(len as u64);
    }

    match mask {
        Some(key) => {
            dst.put_slice(&key);
            let start = dst.len();
            dst.put_slice(&frame.payload);
            apply_mask(&mut dst[start..], key);
        }
        None => dst.put_slice(&frame.payload),
    }
}

/// Encode a JSON text payload as a single unmasked server frame (`0x81`).
pub fn encode_text(payload: &str) -> Bytes {
    let mut dst = BytesMut::new();
    encode_frame(
        &Frame::text(Bytes::copy_from_slice(payload.as_bytes())),
        None,
        &mut dst,
    );
    dst.freeze()
}
