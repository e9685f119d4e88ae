//! UseCase: キャンバスの消去
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ClearCanvasUseCase::execute() メソッド
//! - 履歴のリセットと、送信者以外への clear のブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - clear の後に参加した人の init が空の履歴になることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：描画済みのキャンバスを消去
//! - エッジケース：clear 後の新規参加

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, ServerEvent, SharedSession};

use super::error::CommandError;

/// キャンバス消去のユースケース
pub struct ClearCanvasUseCase {
    session: SharedSession,
    message_pusher: Arc<dyn MessagePusher>,
}

impl ClearCanvasUseCase {
    pub fn new(session: SharedSession, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            session,
            message_pusher,
        }
    }

    /// 消去を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - clear を送信キューに積めた参加者
    pub async fn execute(&self, sender: &ConnectionId) -> Result<Vec<ConnectionId>, CommandError> {
        let mut session = self.session.lock().await;
        if session.participant(sender).is_none() {
            return Err(CommandError::UnknownParticipant(*sender));
        }

        let targets = session.broadcast_targets(sender);
        let report = self
            .message_pusher
            .broadcast(&targets, &ServerEvent::Clear)
            .await?;
        let discarded = session.history().len();
        session.clear_history();
        session.mark_unreachable(&report.skipped);

        tracing::info!(connection_id = %sender, discarded, "canvas cleared");

        Ok(report.delivered)
    }
}
