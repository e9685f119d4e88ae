//! MessagePusher trait 定義
//!
//! 参加者へのイベント送信（Broadcast Dispatcher）のインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError, ServerEvent};

/// 接続ごとの送信チャンネル
///
/// 受信側は接続の writer タスクが持ち、受け取ったテキストを 1 フレームずつソケットへ書き込む。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// ブロードキャストの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 送信キューに積めた参加者
    pub delivered: Vec<ConnectionId>,
    /// 送信できずに飛ばした参加者（チャンネル切断済み、または未登録）
    pub skipped: Vec<ConnectionId>,
}

/// MessagePusher trait
///
/// 送信は best-effort・at-most-once。リトライはしない。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除（未登録でもエラーにしない）
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 特定の接続にだけ送信
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent<'_>,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続に送信
    ///
    /// 送信できない接続は `BroadcastReport::skipped` に入り、エラーにはならない。
    /// `Err` になるのはイベント自体をエンコードできなかった場合だけ。
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        event: &ServerEvent<'_>,
    ) -> Result<BroadcastReport, MessagePushError>;
}
