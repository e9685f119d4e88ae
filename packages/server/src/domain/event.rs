//! サーバーからクライアントへ届けるイベント
//!
//! ワイヤ形式（JSON）への変換は Infrastructure 層が行う。

use super::{entity::DrawSegment, value_object::Color};

/// 参加者に送るイベント
///
/// 履歴はセッションから借用する。送信時にシリアライズされ、保持はされない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServerEvent<'a> {
    /// 参加時・sync 要求時の全状態
    Init {
        color: &'a Color,
        active_users: usize,
        history: &'a [DrawSegment],
    },
    Draw(&'a DrawSegment),
    Clear,
    UserCount(usize),
}

impl ServerEvent<'_> {
    /// ログ出力用のイベント名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Draw(_) => "draw",
            Self::Clear => "clear",
            Self::UserCount(_) => "userCount",
        }
    }
}
