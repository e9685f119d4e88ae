//! Server execution logic.

use std::{future::Future, io, sync::Arc, time::Duration};

use tokio::net::TcpListener;

use crate::{
    config::ServerConfig,
    usecase::{
        ClearCanvasUseCase, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        DrawSegmentUseCase, SyncSessionUseCase,
    },
};

use super::{handler::handle_connection, signal::shutdown_signal, state::AppState};

/// Pause after a failed `accept` (e.g. the process ran out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Shared canvas WebSocket server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     ServerConfig::default(),
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     draw_segment_usecase,
///     clear_canvas_usecase,
///     sync_session_usecase,
/// );
/// server.run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        draw_segment_usecase: Arc<DrawSegmentUseCase>,
        clear_canvas_usecase: Arc<ClearCanvasUseCase>,
        sync_session_usecase: Arc<SyncSessionUseCase>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                config,
                connect_participant_usecase,
                disconnect_participant_usecase,
                draw_segment_usecase,
                clear_canvas_usecase,
                sync_session_usecase,
            }),
        }
    }

    /// Bind to the configured address and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "Shared canvas server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}{}", bind_addr, self.state.config.path);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// Each connection runs on its own task; in-flight connections are not
    /// awaited when the loop stops.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "accepted connection");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
                        }
                        tokio::spawn(handle_connection(stream, peer, self.state.clone()));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        Ok(())
    }
}
