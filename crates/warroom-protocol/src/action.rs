use serde::{Deserialize, Serialize};

use crate::{PlayerId, Position, PowerKind, UnitId, UnitTypeId, Weather};

/// Every recorded match action. Each variant carries exactly what is needed
/// to re-apply it deterministically; rule legality is checked by the simulator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// `path` starts at the unit's current tile and lists every tile entered.
    Move { unit: UnitId, path: Vec<Position> },
    Attack {
        attacker: UnitId,
        defender: UnitId,
        /// Luck roll recorded for the attacker's strike.
        #[serde(default)]
        attacker_luck: i32,
        /// Luck roll recorded for the counter-attack, if one happens.
        #[serde(default)]
        defender_luck: i32,
        /// Health values reported by the source engine after the exchange.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<CombatOutcome>,
    },
    Capture { unit: UnitId },
    Build {
        at: Position,
        unit_type: UnitTypeId,
        /// Id the source engine assigned to the new unit.
        unit: UnitId,
    },
    Supply { unit: UnitId },
    Unload {
        transport: UnitId,
        unit: UnitId,
        to: Position,
    },
    Hide { unit: UnitId },
    Unhide { unit: UnitId },
    Delete { unit: UnitId },
    PowerActivation { player: PlayerId, power: PowerKind },
    WeatherChange { weather: Weather },
    Resign { player: PlayerId },
    EndTurn,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move { .. } => "Move",
            Action::Attack { .. } => "Attack",
            Action::Capture { .. } => "Capture",
            Action::Build { .. } => "Build",
            Action::Supply { .. } => "Supply",
            Action::Unload { .. } => "Unload",
            Action::Hide { .. } => "Hide",
            Action::Unhide { .. } => "Unhide",
            Action::Delete { .. } => "Delete",
            Action::PowerActivation { .. } => "PowerActivation",
            Action::WeatherChange { .. } => "WeatherChange",
            Action::Resign { .. } => "Resign",
            Action::EndTurn => "EndTurn",
        }
    }

    pub fn is_end_turn(&self) -> bool {
        matches!(self, Action::EndTurn)
    }
}

/// Post-combat health (0..=100) as reported by the source engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub attacker_hp: i32,
    pub defender_hp: i32,
}
