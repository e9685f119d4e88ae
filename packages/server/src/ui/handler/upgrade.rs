//! HTTP/1.1 upgrade on a raw TCP stream.

use std::io;

use bytes::BytesMut;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tokio_util::codec::{Framed, FramedParts};

use crate::{
    config::ServerConfig,
    protocol::{
        Frame, FrameCodec, HandshakeError, UpgradeRequest,
        handshake::{find_head_end, parse_upgrade_request},
    },
};

/// A connection promoted to the WebSocket data phase.
pub type WebSocketStream = Framed<TcpStream, FrameCodec>;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("handshake rejected: {0}")]
    Rejected(#[from] HandshakeError),

    #[error("transport error during handshake: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the connection before the request head was complete")]
    Incomplete,
}

/// Read the request head, answer it, and hand back the framed stream.
///
/// A rejected request gets its HTTP error response before the stream is shut
/// down. Bytes that arrived after the head are kept for the frame decoder.
pub async fn upgrade(
    mut stream: TcpStream,
    config: &ServerConfig,
) -> Result<(UpgradeRequest, WebSocketStream), UpgradeError> {
    let (request, leftover) = match read_request(&mut stream, config).await {
        Ok(accepted) => accepted,
        Err(UpgradeError::Rejected(e)) => {
            reject(&mut stream, &e).await?;
            return Err(e.into());
        }
        Err(e) => return Err(e),
    };

    stream.write_all(request.response().as_bytes()).await?;

    let mut parts =
        FramedParts::new::<Frame>(stream, FrameCodec::server(config.max_frame_size));
    parts.read_buf = leftover;
    Ok((request, Framed::from_parts(parts)))
}

async fn read_request<S>(
    stream: &mut S,
    config: &ServerConfig,
) -> Result<(UpgradeRequest, BytesMut), UpgradeError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);
    let head_end = loop {
        if let Some(end) = find_head_end(&buf) {
            break end;
        }
        if buf.len() >= config.max_head_size {
            return Err(HandshakeError::HeadTooLarge(config.max_head_size).into());
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Err(UpgradeError::Incomplete);
        }
    };
    if head_end > config.max_head_size {
        return Err(HandshakeError::HeadTooLarge(config.max_head_size).into());
    }

    let leftover = buf.split_off(head_end);
    let head = std::str::from_utf8(&buf[..head_end - 4])
        .map_err(|_| HandshakeError::MalformedRequest("request head is not UTF-8"))?;
    let request = parse_upgrade_request(head, &config.path)?;
    Ok((request, leftover))
}

async fn reject<S>(stream: &mut S, error: &HandshakeError) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(error.to_response().as_bytes()).await?;
    stream.shutdown().await
}
