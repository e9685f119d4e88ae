//! WebSocket 接続向けの MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `PusherChannel` を管理（Connection Registry の送信側）
//! - イベントを JSON にエンコードしてチャンネルへ積む（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! ソケットへの書き込みは UI 層の writer タスクが行います。
//! ここではチャンネルに積むだけなのでブロックしません。そのため、
//! セッションのロックを保持したまま呼び出しても I/O 待ちは発生しません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{
        BroadcastReport, ConnectionId, MessagePushError, MessagePusher, PusherChannel, ServerEvent,
    },
    infrastructure::dto::conversion::encode_server_event,
};

/// 接続チャンネルを使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// Key: 接続 ID / Value: その接続の writer タスクへのチャンネル
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new(clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>) -> Self {
        Self { clients }
    }

    fn encode(event: &ServerEvent<'_>) -> Result<String, MessagePushError> {
        encode_server_event(event).map_err(|e| MessagePushError::EncodeFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!(%connection_id, "registered to MessagePusher");
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!(%connection_id, "unregistered from MessagePusher");
        }
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent<'_>,
    ) -> Result<(), MessagePushError> {
        let content = Self::encode(event)?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or(MessagePushError::ClientNotFound(*connection_id))?;
        sender
            .send(content)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!(%connection_id, kind = event.kind(), "pushed message");
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &ServerEvent<'_>,
    ) -> Result<BroadcastReport, MessagePushError> {
        let content = Self::encode(event)?;
        let clients = self.clients.lock().await;

        let mut report = BroadcastReport::default();
        for target in targets {
            match clients.get(target) {
                Some(sender) if sender.send(content.clone()).is_ok() => {
                    report.delivered.push(*target);
                }
                Some(_) => {
                    // ブロードキャストでは一部の送信失敗を許容
                    tracing::warn!(connection_id = %target, "transport not writable, skipping");
                    report.skipped.push(*target);
                }
                None => {
                    tracing::warn!(connection_id = %target, "not registered during broadcast, skipping");
                    report.skipped.push(*target);
                }
            }
        }
        tracing::debug!(
            kind = event.kind(),
            delivered = report.delivered.len(),
            skipped = report.skipped.len(),
            "broadcasted message"
        );

        Ok(report)
    }
}
