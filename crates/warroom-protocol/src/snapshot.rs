use serde::{Deserialize, Serialize};

use crate::{
    BuildingId, CoId, CountryId, MatchPhase, PlayerId, Position, PowerKind, TerrainId, UnitId,
    UnitTypeId, Weather,
};

/// Full, serializable match state. Used both as the initial state carried by
/// archives and as the export form of simulated states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub turn: u32,
    pub day: u32,
    pub phase: MatchPhase,
    #[serde(default)]
    pub weather: Weather,
    pub map: MapSnapshot,
    pub players: Vec<PlayerSnapshot>,
    #[serde(default)]
    pub units: Vec<UnitSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileSnapshot>, // row-major
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub terrain: TerrainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<BuildingSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: BuildingId,
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Remaining capture points; absent means the building's catalog default.
    #[serde(default)]
    pub capture: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub country: CountryId,
    pub co: CoId,
    #[serde(default)]
    pub team: Option<u32>,
    #[serde(default)]
    pub funds: i32,
    #[serde(default)]
    pub power_charge: i32,
    #[serde(default)]
    pub power_uses: u32,
    #[serde(default)]
    pub active_power: Option<PowerKind>,
    #[serde(default)]
    pub eliminated: bool,
}

/// Compact unit state. `fuel`/`ammo` may be omitted by archives, meaning full.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub unit_type: UnitTypeId,
    pub owner: PlayerId,
    #[serde(default)]
    pub pos: Option<Position>,
    pub hp: i32,
    #[serde(default)]
    pub fuel: Option<i32>,
    #[serde(default)]
    pub ammo: Option<i32>,
    #[serde(default)]
    pub moved: bool,
    #[serde(default)]
    pub acted: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub carried_by: Option<UnitId>,
}
