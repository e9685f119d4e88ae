//! Shared canvas WebSocket server.
//!
//! Every participant draws on one common canvas; draws are kept in memory and
//! relayed to all other connected participants.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin canvas-server
//! cargo run --bin canvas-server -- --host 0.0.0.0 --port 3000 --ping-interval-secs 30
//! ```

use std::{collections::HashMap, sync::Arc, time::Duration};

use canvas_server::{
    config::ServerConfig,
    domain::Session,
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::Server,
    usecase::{
        ClearCanvasUseCase, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        DrawSegmentUseCase, SyncSessionUseCase,
    },
};
use canvas_shared::{logger::setup_logger, time::SystemClock};
use clap::Parser;
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "canvas-server")]
#[command(about = "Shared canvas WebSocket server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Request path of the WebSocket endpoint
    #[arg(long, default_value = "/ws")]
    path: String,

    /// Largest accepted frame payload in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    max_frame_size: usize,

    /// Consecutive invalid frames that close the connection
    #[arg(long, default_value_t = 3)]
    max_frame_violations: u32,

    /// Seconds between server pings (0 disables liveness probing)
    #[arg(long, default_value_t = 0)]
    ping_interval_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            path: args.path,
            max_frame_size: args.max_frame_size,
            max_frame_violations: args.max_frame_violations,
            ping_interval: (args.ping_interval_secs > 0)
                .then(|| Duration::from_secs(args.ping_interval_secs)),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = ServerConfig::from(args);

    // Initialize dependencies in order:
    // 1. Session
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Create the shared session (in-memory canvas)
    let session = Arc::new(Mutex::new(Session::new()));

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher_clients = Arc::new(Mutex::new(HashMap::new()));
    let message_pusher = Arc::new(WebSocketMessagePusher::new(message_pusher_clients));

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        session.clone(),
        message_pusher.clone(),
        Arc::new(SystemClock),
    ));
    let disconnect_participant_usecase = Arc::new(DisconnectParticipantUseCase::new(
        session.clone(),
        message_pusher.clone(),
    ));
    let draw_segment_usecase = Arc::new(DrawSegmentUseCase::new(
        session.clone(),
        message_pusher.clone(),
    ));
    let clear_canvas_usecase = Arc::new(ClearCanvasUseCase::new(
        session.clone(),
        message_pusher.clone(),
    ));
    let sync_session_usecase = Arc::new(SyncSessionUseCase::new(session, message_pusher));

    // 4. Create and run the server
    let server = Server::new(
        config,
        connect_participant_usecase,
        disconnect_participant_usecase,
        draw_segment_usecase,
        clear_canvas_usecase,
        sync_session_usecase,
    );
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
