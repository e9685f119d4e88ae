//! UseCase: セッション状態の再送（sync）

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, ServerEvent, SharedSession};

use super::error::CommandError;

/// sync のユースケース
///
/// 要求した接続にだけ、新しい init（自分の色・参加者数・描画履歴）を送る。
pub struct SyncSessionUseCase {
    session: SharedSession,
    message_pusher: Arc<dyn MessagePusher>,
}

impl SyncSessionUseCase {
    pub fn new(session: SharedSession, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            session,
            message_pusher,
        }
    }

    pub async fn execute(&self, requester: &ConnectionId) -> Result<(), CommandError> {
        let session = self.session.lock().await;
        let participant = session
            .participant(requester)
            .ok_or(CommandError::UnknownParticipant(*requester))?;

        let init = ServerEvent::Init {
            color: &participant.color,
            active_users: session.participant_count(),
            history: session.history(),
        };
        self.message_pusher.push_to(requester, &init).await?;

        tracing::debug!(
            connection_id = %requester,
            history_len = session.history().len(),
            "session synced"
        );
        Ok(())
    }
}
