use std::sync::Arc;

use thiserror::Error;
use warroom_protocol::Action;

use crate::rules::UnknownCatalogId;
use crate::state::GameState;

/// Failure applying one action to one state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("illegal action: {0}")]
    IllegalAction(String),
    #[error(transparent)]
    UnknownCatalogId(#[from] UnknownCatalogId),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SimError {
    pub(crate) fn illegal_move(reason: impl Into<String>) -> Self {
        SimError::IllegalMove(reason.into())
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        SimError::IllegalAction(reason.into())
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        SimError::InvariantViolation(reason.into())
    }
}

/// Failure producing a snapshot from a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    UnknownCatalogId(#[from] UnknownCatalogId),
    #[error("initial state is invalid: {reason}")]
    InitialState { reason: String },
    /// A recorded action could not be re-applied. `state` is the state the
    /// action was applied to.
    #[error("turn {turn}, action {seq} ({}): {source}", action.name())]
    InvariantViolation {
        turn: u32,
        seq: u32,
        action: Box<Action>,
        state: Arc<GameState>,
        #[source]
        source: SimError,
    },
    #[error("turn {requested} is out of range (replay has {available} turns)")]
    TurnOutOfRange { requested: u32, available: u32 },
    #[error("turn {turn} has {available} actions, {requested} requested")]
    ActionOutOfRange {
        turn: u32,
        requested: usize,
        available: usize,
    },
    #[error("seek cancelled")]
    Cancelled,
}
