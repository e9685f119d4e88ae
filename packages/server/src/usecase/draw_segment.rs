//! UseCase: 描画セグメントの追加
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DrawSegmentUseCase::execute() メソッド
//! - 履歴への追加と、送信者以外への draw のブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - N 人の参加者がいるとき、draw は送信者を除く N−1 人にだけ届く
//! - 履歴が処理順に並ぶことを保証（後から参加した人が同じ絵を再現できる）
//!
//! ### どのような状況を想定しているか
//! - 正常系：3 人の参加者で 1 人が描画
//! - 異常系：参加者でない接続からの描画
//! - エッジケース：送信できない参加者がいる場合

use std::sync::Arc;

use crate::domain::{ConnectionId, DrawSegment, MessagePusher, ServerEvent, SharedSession};

use super::error::CommandError;

/// 描画のユースケース
pub struct DrawSegmentUseCase {
    session: SharedSession,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DrawSegmentUseCase {
    pub fn new(session: SharedSession, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            session,
            message_pusher,
        }
    }

    /// 描画を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - draw を送信キューに積めた参加者
    /// * `Err(CommandError)` - 送信者が参加者でない、またはエンコード失敗
    pub async fn execute(
        &self,
        sender: &ConnectionId,
        segment: DrawSegment,
    ) -> Result<Vec<ConnectionId>, CommandError> {
        let mut session = self.session.lock().await;
        if session.participant(sender).is_none() {
            return Err(CommandError::UnknownParticipant(*sender));
        }

        // 履歴への追加は送信キューに積んだ後。途中で中断されても履歴とブロードキャストがずれない。
        let targets = session.broadcast_targets(sender);
        let report = self
            .message_pusher
            .broadcast(&targets, &ServerEvent::Draw(&segment))
            .await?;
        session.append_segment(segment);
        session.mark_unreachable(&report.skipped);

        tracing::debug!(
            connection_id = %sender,
            history_len = session.history().len(),
            "segment drawn"
        );

        Ok(report.delivered)
    }
}
