//! エンティティ
//!
//! - `DrawSegment`: 1 本の線分（不変）
//! - `Participant`: 接続中の参加者とそのメタデータ
//! - `Session`: 描画履歴と参加者集合を持つ集約

use std::collections::BTreeMap;

use super::{
    error::{SessionError, ValueObjectError},
    value_object::{Color, ConnectionId, Timestamp},
};

/// 描画セグメント（線分）
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: Color,
    pub width: f64,
}

impl DrawSegment {
    pub fn new(
        (x0, y0): (f64, f64),
        (x1, y1): (f64, f64),
        color: Color,
        width: f64,
    ) -> Result<Self, ValueObjectError> {
        for (name, value) in [("x0", x0), ("y0", y0), ("x1", x1), ("y1", y1), ("width", width)] {
            if !value.is_finite() {
                return Err(ValueObjectError::NonFiniteNumber(name));
            }
        }
        if width < 0.0 {
            return Err(ValueObjectError::NegativeWidth(width));
        }
        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            color,
            width,
        })
    }
}

/// 参加者
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ConnectionId,
    pub color: Color,
    pub connected_at: Timestamp,
    /// 最後の送信が成功したかどうか。false の参加者には以降ブロードキャストせず、切断処理で取り除かれる。
    pub alive: bool,
}

impl Participant {
    pub fn new(id: ConnectionId, color: Color, connected_at: Timestamp) -> Self {
        Self {
            id,
            color,
            connected_at,
            alive: true,
        }
    }
}

/// 共有キャンバスのセッション（集約ルート）
///
/// 不変条件: `history` は直近の clear 以降に受理された draw を処理順に並べたもの。
#[derive(Debug, Clone, Default)]
pub struct Session {
    participants: BTreeMap<ConnectionId, Participant>,
    history: Vec<DrawSegment>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_participant(&mut self, participant: Participant) -> Result<(), SessionError> {
        if self.participants.contains_key(&participant.id) {
            return Err(SessionError::DuplicateConnection(participant.id));
        }
        self.participants.insert(participant.id, participant);
        Ok(())
    }

    /// 参加者を削除する。既に削除済みなら `None`（冪等）。
    pub fn remove_participant(&mut self, id: &ConnectionId) -> Option<Participant> {
        self.participants.remove(id)
    }

    pub fn participant(&self, id: &ConnectionId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// 到達不能とマークされていない参加者の ID
    pub fn reachable_ids(&self) -> Vec<ConnectionId> {
        self.participants
            .values()
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect()
    }

    /// `exclude` 以外の到達可能な参加者の ID
    pub fn broadcast_targets(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.participants
            .values()
            .filter(|p| p.alive && p.id != *exclude)
            .map(|p| p.id)
            .collect()
    }

    /// 送信に失敗した参加者を到達不能として記録する
    pub fn mark_unreachable(&mut self, ids: &[ConnectionId]) {
        for id in ids {
            if let Some(participant) = self.participants.get_mut(id) {
                participant.alive = false;
            }
        }
    }

    pub fn append_segment(&mut self, segment: DrawSegment) {
        self.history.push(segment);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[DrawSegment] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(x: f64) -> DrawSegment {
        DrawSegment::new((x, 0.0), (x + 1.0, 1.0), Color::from_hue(0), 2.0).unwrap()
    }

    fn participant() -> Participant {
        Participant::new(ConnectionId::generate(), Color::from_hue(120), Timestamp::new(1000))
    }

    #[test]
    fn test_draw_segment_rejects_non_finite_and_negative_values() {
        // テスト項目: 非有限の座標と負の線幅は拒否される
        // given (前提条件):
        let color = Color::from_hue(0);

        // when (操作):
        let nan = DrawSegment::new((f64::NAN, 0.0), (1.0, 1.0), color.clone(), 1.0);
        let inf = DrawSegment::new((0.0, 0.0), (1.0, 1.0), color.clone(), f64::INFINITY);
        let negative = DrawSegment::new((0.0, 0.0), (1.0, 1.0), color, -1.0);

        // then (期待する結果):
        assert_eq!(nan, Err(ValueObjectError::NonFiniteNumber("x0")));
        assert_eq!(inf, Err(ValueObjectError::NonFiniteNumber("width")));
        assert_eq!(negative, Err(ValueObjectError::NegativeWidth(-1.0)));
    }

    #[test]
    fn test_add_and_remove_participant_is_idempotent() {
        // テスト項目: 参加者の削除は 2 回呼んでも 1 回分しか反映されない
        // given (前提条件):
        let mut session = Session::new();
        let alice = participant();
        let bob = participant();
        session.add_participant(alice.clone()).unwrap();
        session.add_participant(bob.clone()).unwrap();

        // when (操作):
        let first = session.remove_participant(&alice.id);
        let second = session.remove_participant(&alice.id);

        // then (期待する結果):
        assert_eq!(first, Some(alice));
        assert_eq!(second, None);
        assert_eq!(session.participant_count(), 1);
        assert_eq!(session.reachable_ids(), vec![bob.id]);
    }

    #[test]
    fn test_add_duplicate_participant_fails() {
        // テスト項目: 同じ接続 ID の参加者は二重登録できない
        // given (前提条件):
        let mut session = Session::new();
        let alice = participant();
        session.add_participant(alice.clone()).unwrap();

        // when (操作):
        let result = session.add_participant(alice.clone());

        // then (期待する結果):
        assert_eq!(result, Err(SessionError::DuplicateConnection(alice.id)));
        assert_eq!(session.participant_count(), 1);
    }

    #[test]
    fn test_broadcast_targets_exclude_sender() {
        // テスト項目: 送信者以外の全参加者がブロードキャスト対象になる
        // given (前提条件):
        let mut session = Session::new();
        let people: Vec<Participant> = (0..3).map(|_| participant()).collect();
        for p in &people {
            session.add_participant(p.clone()).unwrap();
        }

        // when (操作):
        let targets = session.broadcast_targets(&people[0].id);

        // then (期待する結果):
        assert_eq!(targets.len(), 2);
        assert!(!targets.contains(&people[0].id));
        assert!(targets.contains(&people[1].id));
        assert!(targets.contains(&people[2].id));
    }

    #[test]
    fn test_history_preserves_order_until_cleared() {
        // テスト項目: 履歴は追加順を保ち、clear で空になる
        // given (前提条件):
        let mut session = Session::new();

        // when (操作):
        for x in [3.0, 1.0, 2.0] {
            session.append_segment(segment(x));
        }
        let before: Vec<f64> = session.history().iter().map(|s| s.x0).collect();
        session.clear_history();

        // then (期待する結果):
        assert_eq!(before, vec![3.0, 1.0, 2.0]);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_mark_unreachable_ignores_unknown_ids() {
        // テスト項目: 到達不能マークは登録済みの参加者だけに反映される
        // given (前提条件):
        let mut session = Session::new();
        let alice = participant();
        session.add_participant(alice.clone()).unwrap();

        // when (操作):
        session.mark_unreachable(&[alice.id, ConnectionId::generate()]);

        // then (期待する結果):
        assert_eq!(session.participant(&alice.id).map(|p| p.alive), Some(false));
        assert_eq!(session.participant_count(), 1);
    }

    #[test]
    fn test_unreachable_participant_is_not_a_broadcast_target() {
        // テスト項目: 到達不能な参加者はブロードキャスト対象から外れるが、人数には含まれる
        // given (前提条件):
        let mut session = Session::new();
        let people: Vec<Participant> = (0..3).map(|_| participant()).collect();
        for p in &people {
            session.add_participant(p.clone()).unwrap();
        }
        session.mark_unreachable(&[people[2].id]);

        // when (操作):
        let targets = session.broadcast_targets(&people[0].id);
        let reachable = session.reachable_ids();

        // then (期待する結果):
        assert_eq!(targets, vec![people[1].id]);
        assert_eq!(reachable.len(), 2);
        assert!(!reachable.contains(&people[2].id));
        assert_eq!(session.participant_count(), 3);
    }
}
