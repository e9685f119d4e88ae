//! Reassembly of fragmented data messages.

use bytes::{Bytes, BytesMut};

use super::frame::{Frame, FrameError, OpCode};

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMessage {
    Text(Bytes),
    Binary(Bytes),
}

/// Joins a data frame with FIN=0 and its continuation frames into one
/// message. Control frames are not passed through here.
#[derive(Debug)]
pub struct MessageAssembler {
    max_message: usize,
    in_progress: Option<(OpCode, BytesMut)>,
}

impl MessageAssembler {
    pub fn new(max_message: usize) -> Self {
        Self {
            max_message,
            in_progress: None,
        }
    }

    /// Feed one data frame. Returns the message once its final fragment arrives.
    ///
    /// On error the partial message is discarded.
    pub fn push(&mut self, frame: Frame) -> Result<Option<DataMessage>, FrameError> {
        match (frame.opcode, self.in_progress.take()) {
            (OpCode::Text | OpCode::Binary, Some(_)) => Err(FrameError::InterleavedMessage),
            (OpCode::Text | OpCode::Binary, None) if frame.fin => {
                Ok(Some(finish(frame.opcode, frame.payload)))
            }
            (OpCode::Text | OpCode::Binary, None) => {
                self.in_progress = Some((frame.opcode, BytesMut::from(&frame.payload[..])));
                Ok(None)
            }
            (OpCode::Continuation, None) => Err(FrameError::UnexpectedContinuation),
            (OpCode::Continuation, Some((opcode, mut buffer))) => {
                let declared = (buffer.len() + frame.payload.len()) as u64;
                if declared > self.max_message as u64 {
                    return Err(FrameError::PayloadTooLarge {
                        declared,
                        limit: self.max_message,
                    });
                }
                buffer.extend_from_slice(&frame.payload);
                if frame.fin {
                    Ok(Some(finish(opcode, buffer.freeze())))
                } else {
                    self.in_progress = Some((opcode, buffer));
                    Ok(None)
                }
            }
            (_, pending) => {
                // control frame: leave any partial message untouched
                self.in_progress = pending;
                Ok(None)
            }
        }
    }
}

fn finish(opcode: OpCode, payload: Bytes) -> DataMessage {
    match opcode {
        OpCode::Binary => DataMessage::Binary(payload),
        _ => DataMessage::Text(payload),
    }
}
