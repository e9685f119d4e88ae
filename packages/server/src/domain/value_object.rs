//! 値オブジェクト
//!
//! 接続 ID・表示色・タイムスタンプを型として表現します。

use std::fmt;

use rand::Rng;
use uuid::Uuid;

use super::error::ValueObjectError;

/// 色文字列の最大長
pub const MAX_COLOR_LENGTH: usize = 64;

/// 接続 ID
///
/// ハンドシェイク成功時にサーバーが払い出す。クライアントからは指定できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい接続 ID を生成（UUID v4）
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 表示色（CSS の色文字列）
///
/// サーバーが割り当てる参加者の色と、描画セグメントの線の色の両方に使う。
/// 色としての妥当性は検証せず、空文字列と長すぎる文字列だけを拒否する。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::ColorEmpty);
        }
        if value.chars().count() > MAX_COLOR_LENGTH {
            return Err(ValueObjectError::ColorTooLong(MAX_COLOR_LENGTH));
        }
        Ok(Self(value))
    }

    /// `hsl(H, 70%, 50%)`（H は 0..360 の一様乱数）
    pub fn random() -> Self {
        Self::from_hue(rand::rng().random_range(0..360))
    }

    pub fn from_hue(hue: u16) -> Self {
        Self(format!("hsl({}, 70%, 50%)", hue % 360))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix タイムスタンプ（ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: 生成される接続 ID は重複しない
        // given (前提条件):

        // when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_color_is_hsl_triple() {
        // テスト項目: ランダムな色は hsl(H, 70%, 50%) 形式で H は 0..360
        // given (前提条件):

        for _ in 0..100 {
            // when (操作):
            let color = Color::random();

            // then (期待する結果):
            let hue = color
                .as_str()
                .strip_prefix("hsl(")
                .and_then(|rest| rest.strip_suffix(", 70%, 50%)"))
                .and_then(|hue| hue.parse::<u16>().ok())
                .expect("color should be an hsl triple");
            assert!(hue < 360);
        }
    }

    #[test]
    fn test_color_rejects_empty_and_too_long_values() {
        // テスト項目: 空文字列と長すぎる色文字列は拒否される
        // given (前提条件):
        let too_long = "a".repeat(MAX_COLOR_LENGTH + 1);

        // when (操作):
        let empty = Color::new("  ".to_string());
        let long = Color::new(too_long);
        let ok = Color::new("#ff0000".to_string());

        // then (期待する結果):
        assert_eq!(empty, Err(ValueObjectError::ColorEmpty));
        assert_eq!(long, Err(ValueObjectError::ColorTooLong(MAX_COLOR_LENGTH)));
        assert_eq!(ok.as_ref().map(Color::as_str), Ok("#ff0000"));
    }

    #[test]
    fn test_from_hue_wraps_around() {
        // テスト項目: 360 以上の色相は 0..360 に丸められる
        // given (前提条件):
        let hue = 370;

        // when (操作):
        let color = Color::from_hue(hue);

        // then (期待する結果):
        assert_eq!(color.as_str(), "hsl(10, 70%, 50%)");
    }
}
