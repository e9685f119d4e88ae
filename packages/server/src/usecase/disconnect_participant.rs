//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 参加者の削除と、残った参加者への userCount のブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 切断はクローズ・読み込みエラー・書き込みエラーのどこからでも起こりうる
//! - 同じ接続の切断が 2 回処理されても参加者数を二重に減らさないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断
//! - エッジケース：同じ接続の 2 回目の切断、未登録の接続の切断

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, ServerEvent, SharedSession};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    session: SharedSession,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(session: SharedSession, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            session,
            message_pusher,
        }
    }

    /// 参加者切断を実行（冪等）
    ///
    /// # Returns
    ///
    /// * `Some(remaining)` - 切断した結果の残り人数
    /// * `None` - 既に切断済み。何もブロードキャストしない
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<usize> {
        let mut session = self.session.lock().await;

        self.message_pusher.unregister_client(connection_id).await;
        let removed = session.remove_participant(connection_id)?;

        let remaining = session.participant_count();
        let targets = session.reachable_ids();
        match self
            .message_pusher
            .broadcast(&targets, &ServerEvent::UserCount(remaining))
            .await
        {
            Ok(report) => session.mark_unreachable(&report.skipped),
            Err(e) => tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "failed to broadcast user count"
            ),
        }

        tracing::info!(
            connection_id = %connection_id,
            color = %removed.color,
            active_users = remaining,
            "participant left"
        );

        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{
        create_test_message_pusher, create_test_session, drain, join,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_participants() {
        // テスト項目: 切断すると残りの参加者に減った人数が届く
        // given (前提条件):
        let session = create_test_session();
        let pusher = create_test_message_pusher();
        let (alice, mut rx_alice) = join(&session, &pusher).await;
        let (bob, mut rx_bob) = join(&session, &pusher).await;
        let usecase = DisconnectParticipantUseCase::new(session.clone(), pusher);

        // when (操作):
        let remaining = usecase.execute(&bob).await;

        // then (期待する結果):
        assert_eq!(remaining, Some(1));
        assert_eq!(
            drain(&mut rx_alice),
            vec![json!({"type": "userCount", "count": 1})]
        );
        assert!(drain(&mut rx_bob).is_empty());
        assert_eq!(session.lock().await.reachable_ids(), vec![alice]);
    }

    #[tokio::test]
    async fn test_disconnect_twice_does_not_double_count() {
        // テスト項目: 同じ接続の 2 回目の切断は何もしない
        // given (前提条件):
        let session = create_test_session();
        let pusher = create_test_message_pusher();
        let (_alice, mut rx_alice) = join(&session, &pusher).await;
        let (_bob, _rx_bob) = join(&session, &pusher).await;
        let (charlie, _rx_charlie) = join(&session, &pusher).await;
        let usecase = DisconnectParticipantUseCase::new(session.clone(), pusher);

        // when (操作):
        let first = usecase.execute(&charlie).await;
        let second = usecase.execute(&charlie).await;

        // then (期待する結果):
        assert_eq!(first, Some(2));
        assert_eq!(second, None);
        assert_eq!(
            drain(&mut rx_alice),
            vec![json!({"type": "userCount", "count": 2})]
        );
        assert_eq!(session.lock().await.participant_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_connection_is_noop() {
        // テスト項目: 登録されていない接続の切断は None を返す
        // given (前提条件):
        let session = create_test_session();
        let pusher = create_test_message_pusher();
        let (_alice, mut rx_alice) = join(&session, &pusher).await;
        let usecase = DisconnectParticipantUseCase::new(session, pusher);

        // when (操作):
        let result = usecase.execute(&ConnectionId::generate()).await;

        // then (期待する結果):
        assert_eq!(result, None);
        assert!(drain(&mut rx_alice).is_empty());
    }
}
