use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Action, MatchSnapshot, PlayerId};

/// Schema version written by this crate's archive encoder.
pub const CURRENT_REPLAY_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub fog_of_war: bool,
    #[serde(default = "default_funds_per_building")]
    pub funds_per_building: i32,
    #[serde(default = "default_true")]
    pub co_powers: bool,
}

fn default_funds_per_building() -> i32 {
    1000
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    /// Zero-based turn index (one turn per player per day).
    pub turn: u32,
    pub day: u32,
    pub player: PlayerId,
    /// Position of the action within its turn.
    pub seq: u32,
    pub action: Action,
}

/// A parsed match transcript: initial state plus the authoritative action log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayDocument {
    /// Schema version the archive was decoded from.
    pub source_version: u32,
    pub info: MatchInfo,
    pub initial: MatchSnapshot,
    pub log: ActionLog,
}

impl ReplayDocument {
    /// Number of turn-start snapshots addressable in this replay (turn 0 included).
    pub fn turn_count(&self) -> u32 {
        self.log.turn_count()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("action {index} starts with turn {turn}, expected turn 0")]
    DoesNotStartAtZero { index: usize, turn: u32 },
    #[error("action {index} references turn {turn} beyond the log (expected turn {expected})")]
    TurnBeyondLog {
        index: usize,
        turn: u32,
        expected: u32,
    },
    #[error("action {index} goes back to turn {turn}")]
    TurnOutOfOrder { index: usize, turn: u32 },
    #[error("action {index} has sequence {seq} after sequence {previous} in turn {turn}")]
    SequenceOutOfOrder {
        index: usize,
        turn: u32,
        seq: u32,
        previous: u32,
    },
    #[error("turn {turn} continues after its EndTurn at action {index}")]
    ActionAfterEndTurn { index: usize, turn: u32 },
    #[error("turn {turn} changes player mid-turn at action {index}")]
    PlayerChangedMidTurn { index: usize, turn: u32 },
}

/// Ordered action log with a per-turn index.
///
/// Turn `t` owns `actions[turn_starts[t]..turn_starts[t + 1]]`; every turn but
/// the last ends with `EndTurn`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RecordedAction>", into = "Vec<RecordedAction>")]
pub struct ActionLog {
    actions: Vec<RecordedAction>,
    turn_starts: Vec<usize>,
}

impl ActionLog {
    pub fn new(actions: Vec<RecordedAction>) -> Result<Self, LogError> {
        let mut turn_starts = vec![0];
        let mut current_turn = 0_u32;
        let mut previous: Option<&RecordedAction> = None;

        for (index, recorded) in actions.iter().enumerate() {
            match previous {
                None => {
                    if recorded.turn != 0 {
                        return Err(LogError::DoesNotStartAtZero {
                            index,
                            turn: recorded.turn,
                        });
                    }
                }
                Some(prev) if prev.action.is_end_turn() => {
                    if recorded.turn < current_turn + 1 {
                        return Err(LogError::ActionAfterEndTurn {
                            index,
                            turn: prev.turn,
                        });
                    }
                    if recorded.turn > current_turn + 1 {
                        return Err(LogError::TurnBeyondLog {
                            index,
                            turn: recorded.turn,
                            expected: current_turn + 1,
                        });
                    }
                    current_turn = recorded.turn;
                    turn_starts.push(index);
                }
                Some(prev) => {
                    if recorded.turn < prev.turn {
                        return Err(LogError::TurnOutOfOrder {
                            index,
                            turn: recorded.turn,
                        });
                    }
                    if recorded.turn > prev.turn {
                        return Err(LogError::TurnBeyondLog {
                            index,
                            turn: recorded.turn,
                            expected: prev.turn,
                        });
                    }
                    if recorded.seq <= prev.seq {
                        return Err(LogError::SequenceOutOfOrder {
                            index,
                            turn: recorded.turn,
                            seq: recorded.seq,
                            previous: prev.seq,
                        });
                    }
                    if recorded.player != prev.player {
                        return Err(LogError::PlayerChangedMidTurn {
                            index,
                            turn: recorded.turn,
                        });
                    }
                }
            }
            previous = Some(recorded);
        }

        // A trailing EndTurn opens an (empty) turn whose start state is addressable.
        if actions.last().is_some_and(|a| a.action.is_end_turn()) {
            turn_starts.push(actions.len());
        }

        Ok(Self {
            actions,
            turn_starts,
        })
    }

    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_starts.len() as u32
    }

    /// Actions recorded for `turn`, or `None` when the turn is outside the log.
    pub fn turn(&self, turn: u32) -> Option<&[RecordedAction]> {
        let t = turn as usize;
        let start = *self.turn_starts.get(t)?;
        let end = self
            .turn_starts
            .get(t + 1)
            .copied()
            .unwrap_or(self.actions.len());
        Some(&self.actions[start..end])
    }
}

impl TryFrom<Vec<RecordedAction>> for ActionLog {
    type Error = LogError;

    fn try_from(actions: Vec<RecordedAction>) -> Result<Self, Self::Error> {
        Self::new(actions)
    }
}

impl From<ActionLog> for Vec<RecordedAction> {
    fn from(log: ActionLog) -> Self {
        log.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UnitId;

    fn rec(turn: u32, seq: u32, action: Action) -> RecordedAction {
        RecordedAction {
            turn,
            day: turn / 2 + 1,
            player: PlayerId(turn % 2),
            seq,
            action,
        }
    }

    #[test]
    fn indexes_turns_by_end_turn_boundaries() {
        let log = ActionLog::new(vec![
            rec(0, 0, Action::Capture { unit: UnitId(1) }),
            rec(0, 1, Action::EndTurn),
            rec(1, 0, Action::EndTurn),
            rec(2, 0, Action::Capture { unit: UnitId(1) }),
        ])
        .expect("valid log");

        assert_eq!(log.turn_count(), 3);
        assert_eq!(log.turn(0).map(<[_]>::len), Some(2));
        assert_eq!(log.turn(1).map(<[_]>::len), Some(1));
        assert_eq!(log.turn(2).map(<[_]>::len), Some(1));
        assert!(log.turn(3).is_none());
    }

    #[test]
    fn trailing_end_turn_opens_empty_turn() {
        let log = ActionLog::new(vec![rec(0, 0, Action::EndTurn)]).expect("valid log");
        assert_eq!(log.turn_count(), 2);
        assert_eq!(log.turn(1).map(<[_]>::len), Some(0));
    }

    #[test]
    fn rejects_turn_beyond_log() {
        let err = ActionLog::new(vec![
            rec(0, 0, Action::EndTurn),
            rec(2, 0, Action::EndTurn),
        ])
        .unwrap_err();
        assert!(matches!(err, LogError::TurnBeyondLog { turn: 2, .. }));
    }

    #[test]
    fn rejects_turn_change_without_end_turn() {
        let err = ActionLog::new(vec![
            rec(0, 0, Action::Capture { unit: UnitId(1) }),
            rec(1, 0, Action::EndTurn),
        ])
        .unwrap_err();
        assert!(matches!(err, LogError::TurnBeyondLog { turn: 1, .. }));
    }

    #[test]
    fn rejects_actions_after_end_turn_in_same_turn() {
        let err = ActionLog::new(vec![
            rec(0, 0, Action::EndTurn),
            rec(0, 1, Action::Capture { unit: UnitId(1) }),
        ])
        .unwrap_err();
        assert!(matches!(err, LogError::ActionAfterEndTurn { .. }));
    }

    #[test]
    fn log_serializes_as_plain_list() {
        let log = ActionLog::new(vec![rec(0, 0, Action::EndTurn)]).expect("valid log");
        let json = serde_json::to_value(&log).expect("serialize");
        assert!(json.is_array());
        let back: ActionLog = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, log);
    }
}
