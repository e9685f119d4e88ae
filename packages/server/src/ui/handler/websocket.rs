//! Per-connection WebSocket loop.

use std::{net::SocketAddr, pin::pin, sync::Arc, time::Duration};

use bytes::Bytes;
use canvas_shared::time::millis_to_rfc3339;
use futures_util::{
    sink::{Sink, SinkExt},
    stream::{Stream, StreamExt},
};
use tokio::{
    net::TcpStream,
    sync::mpsc,
    time::{self, Instant, Interval},
};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::ConnectionId,
    protocol::{CodecError, DataMessage, Frame, Inbound, MessageAssembler, OpCode, close_code},
    ui::state::AppState,
};

use super::{
    router::route_message,
    upgrade::{UpgradeError, WebSocketStream, upgrade},
};

/// How long a queued close frame may take to reach the peer.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// How the reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    /// Transport closed or failed. Nothing more can be written.
    Ended,
    /// A close frame was handed to the writer.
    CloseQueued,
}

/// Entry point for an accepted TCP connection.
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let (request, socket) = match upgrade(stream, &state.config).await {
        Ok(upgraded) => upgraded,
        Err(UpgradeError::Rejected(e)) => {
            tracing::warn!(%peer, status = e.status().0, error = %e, "rejected upgrade request");
            return;
        }
        Err(e) => {
            tracing::debug!(%peer, error = %e, "connection dropped during handshake");
            return;
        }
    };
    tracing::debug!(%peer, path = %request.path, "upgraded connection");

    handle_socket(socket, peer, state).await;
}

async fn handle_socket(socket: WebSocketStream, peer: SocketAddr, state: Arc<AppState>) {
    // Create a channel for this connection to receive broadcasts
    let (tx, rx) = mpsc::unbounded_channel();
    let connected = match state.connect_participant_usecase.execute(tx).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(%peer, error = %e, "failed to register connection");
            return;
        }
    };
    let connection_id = connected.id;
    tracing::info!(
        %peer,
        %connection_id,
        connected_at = millis_to_rfc3339(connected.connected_at.value()).unwrap_or_default(),
        "connection established"
    );

    let (sink, stream) = socket.split();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let mut send_task = tokio::spawn(writer_loop(sink, rx, control_rx, connection_id));
    let mut recv_task = tokio::spawn(reader_loop(
        stream,
        control_tx,
        state.clone(),
        cancel.clone(),
        connection_id,
    ));

    // If either task completes, the other one is stopped.
    // The reader only observes cancellation between frames, never inside a use case.
    let outcome = tokio::select! {
        outcome = &mut recv_task => outcome.unwrap_or(ReadOutcome::Ended),
        _ = &mut send_task => {
            cancel.cancel();
            if let Err(e) = recv_task.await {
                tracing::error!(%connection_id, error = %e, "reader task failed");
            }
            ReadOutcome::Ended
        }
    };

    if let Some(remaining) = state
        .disconnect_participant_usecase
        .execute(&connection_id)
        .await
    {
        tracing::info!(%peer, %connection_id, remaining, "connection closed");
    }

    let flush = outcome == ReadOutcome::CloseQueued && !send_task.is_finished();
    if flush && time::timeout(CLOSE_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        tracing::debug!(%connection_id, "close frame not flushed in time");
    }
    send_task.abort();
}

/// Writes queued control frames and broadcast messages to the socket.
///
/// Stops after writing a close frame, after a failed write, or when both
/// channels are closed.
async fn writer_loop<S>(
    sink: S,
    mut messages: mpsc::UnboundedReceiver<String>,
    mut control: mpsc::UnboundedReceiver<Frame>,
    connection_id: ConnectionId,
) where
    S: Sink<Frame, Error = CodecError>,
{
    let mut sink = pin!(sink);
    loop {
        let frame = tokio::select! {
            biased;
            Some(frame) = control.recv() => frame,
            Some(text) = messages.recv() => Frame::text(text),
            else => break,
        };

        let closing = frame.opcode == OpCode::Close;
        if let Err(e) = sink.send(frame).await {
            tracing::error!(%connection_id, error = %e, "failed to write frame");
            break;
        }
        if closing {
            break;
        }
    }
}

/// Reads frames until the peer goes away, the connection must be closed, or
/// `cancel` fires.
async fn reader_loop<S>(
    stream: S,
    control: mpsc::UnboundedSender<Frame>,
    state: Arc<AppState>,
    cancel: CancellationToken,
    connection_id: ConnectionId,
) -> ReadOutcome
where
    S: Stream<Item = Result<Inbound, CodecError>>,
{
    let mut stream = pin!(stream);
    let config = &state.config;
    let mut assembler = MessageAssembler::new(config.max_frame_size);
    let mut violations = 0u32;
    let mut last_seen = Instant::now();
    let mut ping = config
        .ping_interval
        .map(|period| time::interval_at(Instant::now() + period, period));

    loop {
        let item = tokio::select! {
            () = cancel.cancelled() => return ReadOutcome::Ended,
            item = stream.next() => item,
            _ = tick(&mut ping) => {
                if let Some(period) = config.ping_interval
                    && last_seen.elapsed() >= period * 2
                {
                    tracing::warn!(%connection_id, "peer stopped responding to pings");
                    return queue_close(&control, close_code::GOING_AWAY, "ping timeout");
                }
                if control.send(Frame::ping(Bytes::new())).is_err() {
                    return ReadOutcome::Ended;
                }
                continue;
            }
        };

        let frame = match item {
            None => return ReadOutcome::Ended,
            Some(Err(CodecError::Io(e))) => {
                tracing::error!(%connection_id, error = %e, "failed to read from socket");
                return ReadOutcome::Ended;
            }
            Some(Err(CodecError::Frame(e))) => {
                tracing::warn!(%connection_id, error = %e, "unrecoverable frame error");
                return queue_close(&control, e.close_code(), &e.to_string());
            }
            Some(Ok(Inbound::Violation(e))) => {
                violations += 1;
                tracing::warn!(%connection_id, error = %e, violations, "dropped invalid frame");
                if violations >= config.max_frame_violations {
                    return queue_close(
                        &control,
                        close_code::PROTOCOL_ERROR,
                        "too many protocol violations",
                    );
                }
                continue;
            }
            Some(Ok(Inbound::Frame(frame))) => frame,
        };

        violations = 0;
        last_seen = Instant::now();

        match frame.opcode {
            OpCode::Ping => {
                if control.send(Frame::pong(frame.payload)).is_err() {
                    return ReadOutcome::Ended;
                }
            }
            OpCode::Pong => tracing::trace!(%connection_id, "received pong"),
            OpCode::Close => {
                let received = frame.close_code();
                let code = if frame.payload.len() == 1 {
                    close_code::PROTOCOL_ERROR
                } else {
                    close_code::reply_to(received)
                };
                tracing::debug!(%connection_id, ?received, code, "peer requested close");
                return queue_close(&control, code, "");
            }
            _ => match assembler.push(frame) {
                Ok(Some(DataMessage::Text(payload))) => {
                    match route_message(&state, &connection_id, &payload).await {
                        Ok(outcome) => tracing::debug!(%connection_id, ?outcome, "routed message"),
                        Err(e) => tracing::warn!(%connection_id, error = %e, "dropped message"),
                    }
                }
                Ok(Some(DataMessage::Binary(payload))) => {
                    tracing::debug!(%connection_id, len = payload.len(), "ignored binary message");
                }
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    tracing::warn!(%connection_id, error = %e, "message exceeds size limit");
                    return queue_close(&control, e.close_code(), &e.to_string());
                }
                Err(e) => {
                    violations += 1;
                    tracing::warn!(%connection_id, error = %e, violations, "dropped invalid fragment");
                    if violations >= config.max_frame_violations {
                        return queue_close(
                            &control,
                            close_code::PROTOCOL_ERROR,
                            "too many protocol violations",
                        );
                    }
                }
            },
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn queue_close(control: &mpsc::UnboundedSender<Frame>, code: u16, reason: &str) -> ReadOutcome {
    if control.send(Frame::close(code, reason)).is_ok() {
        ReadOutcome::CloseQueued
    } else {
        ReadOutcome::Ended
    }
}
