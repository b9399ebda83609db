use std::sync::Arc;

use warroom_protocol::{PlayerId, RecordedAction, ReplayDocument};

use crate::cache::SnapshotCache;
use crate::config::ReplayConfig;
use crate::error::{ReplayError, SimError};
use crate::fog::{visible_set, VisibleSet};
use crate::rules::Ruleset;
use crate::sim::advance;
use crate::state::GameState;
use crate::turn::begin_match;

/// Read-only inputs shared by every step of a replay.
#[derive(Clone, Debug)]
pub struct ReplayContext {
    pub rules: Arc<Ruleset>,
    pub config: ReplayConfig,
}

/// Where a replay stopped being reproducible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailurePoint {
    pub turn: u32,
    pub seq: u32,
}

/// One loaded replay with its snapshot cache. Seeking needs `&mut self`; the
/// session has a single writer.
#[derive(Debug)]
pub struct ReplaySession {
    ctx: ReplayContext,
    document: Arc<ReplayDocument>,
    initial: Arc<GameState>,
    cache: SnapshotCache,
    failure: Option<FailurePoint>,
}

impl ReplaySession {
    pub fn new(
        rules: Arc<Ruleset>,
        config: ReplayConfig,
        document: ReplayDocument,
    ) -> Result<Self, ReplayError> {
        let mut initial = GameState::from_snapshot(&rules, &document.info, &document.initial)
            .map_err(|reason| ReplayError::InitialState { reason })?;
        begin_match(&rules, &mut initial).map_err(|e| ReplayError::InitialState {
            reason: e.to_string(),
        })?;
        crate::fog::refresh_vision(&rules, &mut initial);

        tracing::info!(
            match_id = document.info.id,
            turns = document.turn_count(),
            actions = document.log.len(),
            "Replay session ready"
        );

        let cache = SnapshotCache::new(config.snapshot_density, config.snapshot_capacity);
        Ok(Self {
            ctx: ReplayContext { rules, config },
            document: Arc::new(document),
            initial: Arc::new(initial),
            cache,
            failure: None,
        })
    }

    pub fn context(&self) -> &ReplayContext {
        &self.ctx
    }

    pub fn document(&self) -> &Arc<ReplayDocument> {
        &self.document
    }

    pub fn turn_count(&self) -> u32 {
        self.document.turn_count()
    }

    pub fn initial_state(&self) -> &Arc<GameState> {
        &self.initial
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// The first action found not to reproduce, if any seek has hit one.
    pub fn last_failure(&self) -> Option<FailurePoint> {
        self.failure
    }

    /// Replace the configuration. Cached snapshots depend on it, so they are
    /// dropped.
    pub fn set_config(&mut self, config: ReplayConfig) {
        self.cache = SnapshotCache::new(config.snapshot_density, config.snapshot_capacity);
        self.ctx.config = config;
    }

    /// State at the start of `turn`.
    pub fn snapshot_at(&mut self, turn: u32) -> Result<Arc<GameState>, ReplayError> {
        self.snapshot_at_with(turn, || false)
    }

    /// Like [`snapshot_at`](Self::snapshot_at), checking `cancelled` between
    /// actions. Turns completed before cancellation stay cached.
    pub fn snapshot_at_with(
        &mut self,
        turn: u32,
        cancelled: impl Fn() -> bool,
    ) -> Result<Arc<GameState>, ReplayError> {
        let available = self.turn_count();
        if turn >= available {
            return Err(ReplayError::TurnOutOfRange {
                requested: turn,
                available,
            });
        }
        if turn == 0 {
            return Ok(Arc::clone(&self.initial));
        }
        if let Some(state) = self.cache.get(turn) {
            return Ok(state);
        }

        let (mut current_turn, mut state) = self
            .cache
            .nearest_at_or_before(turn)
            .unwrap_or((0, Arc::clone(&self.initial)));
        tracing::debug!(from = current_turn, to = turn, "Seeking");

        let document = Arc::clone(&self.document);
        while current_turn < turn {
            let actions = document.log.turn(current_turn).unwrap_or_default();
            for recorded in actions {
                if cancelled() {
                    tracing::warn!(target_turn = turn, at_turn = current_turn, "Seek cancelled");
                    return Err(ReplayError::Cancelled);
                }
                state = self.step(&state, recorded)?;
            }
            current_turn += 1;
            self.cache.insert(current_turn, Arc::clone(&state));
            tracing::debug!(turn = current_turn, day = state.day, "Replayed turn");
        }
        Ok(state)
    }

    /// State after the first `actions` actions of `turn`.
    pub fn state_at(&mut self, turn: u32, actions: usize) -> Result<Arc<GameState>, ReplayError> {
        let mut state = self.snapshot_at(turn)?;
        let document = Arc::clone(&self.document);
        let recorded = document.log.turn(turn).unwrap_or_default();
        if actions > recorded.len() {
            return Err(ReplayError::ActionOutOfRange {
                turn,
                requested: actions,
                available: recorded.len(),
            });
        }
        for action in &recorded[..actions] {
            state = self.step(&state, action)?;
        }
        Ok(state)
    }

    /// Tiles `observer` sees at the start of `turn` under the session's view
    /// mode.
    pub fn visible_at(&mut self, turn: u32, observer: PlayerId) -> Result<VisibleSet, ReplayError> {
        let state = self.snapshot_at(turn)?;
        Ok(visible_set(
            &self.ctx.rules,
            &state,
            observer,
            self.ctx.config.fog_options(),
        ))
    }

    fn step(
        &mut self,
        state: &Arc<GameState>,
        recorded: &RecordedAction,
    ) -> Result<Arc<GameState>, ReplayError> {
        let result = check_recorded_turn(state, recorded).and_then(|()| {
            advance(&self.ctx.rules, &self.ctx.config, state, &recorded.action)
        });
        match result {
            Ok(next) => Ok(Arc::new(next)),
            Err(source) => {
                tracing::warn!(
                    turn = recorded.turn,
                    seq = recorded.seq,
                    action = recorded.action.name(),
                    error = %source,
                    "Recorded action does not reproduce"
                );
                let point = FailurePoint {
                    turn: recorded.turn,
                    seq: recorded.seq,
                };
                if self.failure.is_none_or(|f| (point.turn, point.seq) < (f.turn, f.seq)) {
                    self.failure = Some(point);
                }
                Err(ReplayError::InvariantViolation {
                    turn: recorded.turn,
                    seq: recorded.seq,
                    action: Box::new(recorded.action.clone()),
                    state: Arc::clone(state),
                    source,
                })
            }
        }
    }
}

/// The log's turn bookkeeping must agree with the simulated state.
fn check_recorded_turn(state: &GameState, recorded: &RecordedAction) -> Result<(), SimError> {
    if state.turn != recorded.turn {
        return Err(SimError::invariant(format!(
            "action recorded for turn {} but the state is at turn {}",
            recorded.turn, state.turn
        )));
    }
    match state.phase.active_player() {
        Some(active) if active != recorded.player => Err(SimError::invariant(format!(
            "action recorded for {} during {active}'s turn",
            recorded.player
        ))),
        _ => Ok(()),
    }
}
