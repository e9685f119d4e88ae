//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - init メッセージ（色・参加者数・描画履歴）の送信と userCount のブロードキャスト
//!
//! ### なぜこのテストが必要か
//! - 新規参加者が既存の描画をすべて受け取れることを保証
//! - 参加者数の変化が全員（新規参加者を含む）に通知されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の参加者、既存の参加者がいる状態での参加
//! - 異常系：init を送れない（チャンネルが閉じている）場合のロールバック

use std::sync::Arc;

use canvas_shared::time::Clock;

use crate::domain::{
    Color, ConnectionId, MessagePusher, Participant, PusherChannel, ServerEvent, SharedSession,
    Timestamp,
};

use super::error::ConnectError;

/// 接続に成功した参加者の情報
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedParticipant {
    pub id: ConnectionId,
    pub color: Color,
    pub connected_at: Timestamp,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    session: SharedSession,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        session: SharedSession,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            message_pusher,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 新しい接続へのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectedParticipant)` - 接続成功（割り当てた ID と色）
    /// * `Err(ConnectError)` - 接続失敗。セッションとレジストリは元の状態に戻る
    pub async fn execute(&self, sender: PusherChannel) -> Result<ConnectedParticipant, ConnectError> {
        let id = ConnectionId::generate();
        let color = Color::random();
        let connected_at = Timestamp::new(self.clock.now_millis());

        let mut session = self.session.lock().await;

        // 1. セッションとレジストリに追加
        session.add_participant(Participant::new(id, color.clone(), connected_at))?;
        self.message_pusher.register_client(id, sender).await;

        // 2. 新しい接続にだけ init を送る
        let init = ServerEvent::Init {
            color: &color,
            active_users: session.participant_count(),
            history: session.history(),
        };
        let pushed = self.message_pusher.push_to(&id, &init).await;
        if let Err(e) = pushed {
            session.remove_participant(&id);
            self.message_pusher.unregister_client(&id).await;
            return Err(e.into());
        }

        // 3. 新しい接続を含む全員に参加者数を通知
        let targets = session.reachable_ids();
        let count = ServerEvent::UserCount(session.participant_count());
        match self.message_pusher.broadcast(&targets, &count).await {
            Ok(report) => session.mark_unreachable(&report.skipped),
            Err(e) => tracing::warn!(connection_id = %id, error = %e, "failed to broadcast user count"),
        }

        tracing::info!(
            connection_id = %id,
            color = %color,
            active_users = session.participant_count(),
            "participant joined"
        );

        Ok(ConnectedParticipant {
            id,
            color,
            connected_at,
        })
    }
}
