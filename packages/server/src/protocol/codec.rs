//! `tokio_util::codec` adapter over the frame functions.

use std::io;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::frame::{self, DEFAULT_MAX_PAYLOAD, Frame, FrameError, Role};

/// Item yielded by [`FrameCodec`]: a frame, or a frame-local violation that
/// was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    Violation(FrameError),
}

/// Errors that end a framed stream.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    #[error("unrecoverable frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Frame codec for one side of a WebSocket connection.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    role: Role,
    max_payload: usize,
}

impl FrameCodec {
    pub fn new(role: Role, max_payload: usize) -> Self {
        Self { role, max_payload }
    }

    /// Codec for the accepting side, which reads masked frames and writes
    /// unmasked ones.
    pub fn server(max_payload: usize) -> Self {
        Self::new(Role::Server, max_payload)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::server(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for FrameCodec {
    type Item = Inbound;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, CodecError> {
        match frame::decode_frame(src, self.role, self.max_payload)? {
            Some(decoded) => {
                src.advance(decoded.consumed);
                Ok(Some(match decoded.frame {
                    Ok(frame) => Inbound::Frame(frame),
                    Err(violation) => Inbound::Violation(violation),
                }))
            }
            None => {
                if let Some(needed) = frame::frame_len_hint(src, self.max_payload) {
                    src.reserve(needed.saturating_sub(src.len()));
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), CodecError> {
        let mask = match self.role {
            Role::Server => None,
            Role::Client => Some(rand::random::<[u8; 4]>()),
        };
        frame::encode_frame(&item, mask, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{OpCode, encode_text};

    fn client_bytes(frames: &[Frame]) -> BytesMut {
        let mut codec = FrameCodec::new(Role::Client, DEFAULT_MAX_PAYLOAD);
        let mut dst = BytesMut::new();
        for frame in frames {
            codec.encode(frame.clone(), &mut dst).unwrap();
        }
        dst
    }

    #[test]
    fn test_decoder_yields_frames_in_order_and_drains_buffer() {
        // テスト項目: 連続したフレームを順番に取り出し、バッファを消費する
        // given (前提条件):
        let mut codec = FrameCodec::default();
        let mut src = client_bytes(&[Frame::text("one"), Frame::ping("p"), Frame::text("two")]);

        // when (操作):
        let mut items = Vec::new();
        while let Some(item) = codec.decode(&mut src).unwrap() {
            items.push(item);
        }

        // then (期待する結果):
        assert_eq!(
            items,
            vec![
                Inbound::Frame(Frame::text("one")),
                Inbound::Frame(Frame::ping("p")),
                Inbound::Frame(Frame::text("two")),
            ]
        );
        assert!(src.is_empty());
    }

    #[test]
    fn test_decoder_waits_for_split_frame() {
        // テスト項目: 分割して届いたフレームは揃ってから返される
        // given (前提条件):
        let mut codec = FrameCodec::default();
        let whole = client_bytes(&[Frame::text("split across reads")]);
        let mut src = BytesMut::from(&whole[..5]);

        // when (操作):
        let first = codec.decode(&mut src).unwrap();
        src.extend_from_slice(&whole[5..]);
        let second = codec.decode(&mut src).unwrap();

        // then (期待する結果):
        assert_eq!(first, None);
        assert_eq!(second, Some(Inbound::Frame(Frame::text("split across reads"))));
    }

    #[test]
    fn test_decoder_reports_unmasked_frame_and_continues() {
        // テスト項目: マスクなしフレームは Violation として返し、後続フレームは読める
        // given (前提条件):
        let mut codec = FrameCodec::default();
        let mut src = BytesMut::from(&encode_text("unmasked")[..]);
        src.extend_from_slice(&client_bytes(&[Frame::text("masked")]));

        // when (操作):
        let first = codec.decode(&mut src).unwrap();
        let second = codec.decode(&mut src).unwrap();

        // then (期待する結果):
        assert_eq!(first, Some(Inbound::Violation(FrameError::Unmasked)));
        assert_eq!(second, Some(Inbound::Frame(Frame::text("masked"))));
    }

    #[test]
    fn test_decoder_fails_on_oversized_frame() {
        // テスト項目: 上限を超えるフレームはストリームエラーになる
        // given (前提条件):
        let mut codec = FrameCodec::server(16);
        let mut src = client_bytes(&[Frame::text(vec![b'a'; 17])]);

        // when (操作):
        let result = codec.decode(&mut src);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(CodecError::Frame(FrameError::PayloadTooLarge { declared: 17, limit: 16 }))
        ));
    }

    #[test]
    fn test_server_encoder_never_masks() {
        // テスト項目: サーバー側エンコーダはマスクビットを立てない
        // given (前提条件):
        let mut codec = FrameCodec::default();
        let mut dst = BytesMut::new();

        // when (操作):
        codec.encode(Frame::pong("abc"), &mut dst).unwrap();

        // then (期待する結果):
        assert_eq!(dst[0], 0x80 | OpCode::Pong.as_u8());
        assert_eq!(dst[1] & 0x80, 0);
        assert_eq!(&dst[2..], b"abc");
    }
}
