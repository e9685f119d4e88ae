//! Server state shared by every connection task.

use std::sync::Arc;

use crate::{
    config::ServerConfig,
    usecase::{
        ClearCanvasUseCase, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        DrawSegmentUseCase, SyncSessionUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// DrawSegmentUseCase（描画のユースケース）
    pub draw_segment_usecase: Arc<DrawSegmentUseCase>,
    /// ClearCanvasUseCase（キャンバス消去のユースケース）
    pub clear_canvas_usecase: Arc<ClearCanvasUseCase>,
    /// SyncSessionUseCase（状態再送のユースケース）
    pub sync_session_usecase: Arc<SyncSessionUseCase>,
}
