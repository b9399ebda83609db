use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Traversal behaviour of a unit, used to index terrain movement costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MovementClass {
    Infantry,
    Mech,
    Tread,
    Tire,
    Air,
    Sea,
    Lander,
    Pipe,
}

impl MovementClass {
    pub const ALL: [MovementClass; 8] = [
        MovementClass::Infantry,
        MovementClass::Mech,
        MovementClass::Tread,
        MovementClass::Tire,
        MovementClass::Air,
        MovementClass::Sea,
        MovementClass::Lander,
        MovementClass::Pipe,
    ];

    pub fn is_air(self) -> bool {
        matches!(self, MovementClass::Air)
    }

    pub fn is_naval(self) -> bool {
        matches!(self, MovementClass::Sea | MovementClass::Lander)
    }

    /// Foot soldiers and vehicles: the classes that benefit from terrain sight bonuses.
    pub fn is_ground(self) -> bool {
        !self.is_air() && !self.is_naval()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerKind {
    Power,
    SuperPower,
}

/// Where a match is in its turn cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum MatchPhase {
    AwaitingStart,
    TurnActive { player: PlayerId },
    TurnEnding { player: PlayerId },
    MatchOver { outcome: MatchOutcome },
}

impl MatchPhase {
    pub fn active_player(&self) -> Option<PlayerId> {
        match self {
            MatchPhase::TurnActive { player } => Some(*player),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self, MatchPhase::MatchOver { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchOutcome {
    /// The last player (or team) standing.
    Victory { winners: Vec<PlayerId> },
    Draw,
}
