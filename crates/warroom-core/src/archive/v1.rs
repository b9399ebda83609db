//! Legacy payloads: flat action list, row-based terrain, display-scale health
//! and index-assigned player ids.

use serde::Deserialize;
use warroom_protocol::{
    Action, ActionLog, BuildingId, BuildingSnapshot, CoId, CombatOutcome, CountryId,
    MapSnapshot, MatchInfo, MatchPhase, MatchSnapshot, PlayerId, PlayerSnapshot, Position,
    PowerKind, RecordedAction, ReplayDocument, TerrainId, TileSnapshot, UnitId, UnitSnapshot,
    UnitTypeId, Weather,
};

use super::ArchiveError;

fn default_funds() -> i32 {
    1000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Payload {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    fog: bool,
    #[serde(default = "default_funds")]
    funds: i32,
    #[serde(default = "default_true")]
    powers: bool,
    #[serde(default)]
    weather: Option<String>,
    players: Vec<LegacyPlayer>,
    /// Terrain ids, one row per `y`.
    terrain: Vec<Vec<u32>>,
    #[serde(default)]
    buildings: Vec<LegacyBuilding>,
    #[serde(default)]
    units: Vec<LegacyUnit>,
    #[serde(default)]
    actions: Vec<LegacyAction>,
}

#[derive(Debug, Deserialize)]
struct LegacyPlayer {
    name: String,
    co_id: u32,
    country_id: u32,
    #[serde(default)]
    team: Option<u32>,
    #[serde(default)]
    funds: i32,
    #[serde(default)]
    power: i32,
    #[serde(default)]
    eliminated: bool,
}

#[derive(Debug, Deserialize)]
struct LegacyBuilding {
    x: i32,
    y: i32,
    building_id: u32,
    /// Player index; negative or absent means neutral.
    #[serde(default)]
    owner: Option<i64>,
    #[serde(default)]
    capture: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct LegacyUnit {
    id: u32,
    type_id: u32,
    player: u32,
    #[serde(default)]
    x: Option<i32>,
    #[serde(default)]
    y: Option<i32>,
    /// Displayed health, `0.0..=10.0`.
    hp: f64,
    #[serde(default)]
    fuel: Option<i32>,
    #[serde(default)]
    ammo: Option<i32>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    carrier: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LegacyAction {
    turn: u32,
    #[serde(default)]
    day: Option<u32>,
    player: u32,
    action: String,
    #[serde(default)]
    unit_id: Option<u32>,
    #[serde(default)]
    target_id: Option<u32>,
    #[serde(default)]
    type_id: Option<u32>,
    #[serde(default)]
    path: Option<Vec<[i32; 2]>>,
    #[serde(default)]
    x: Option<i32>,
    #[serde(default)]
    y: Option<i32>,
    #[serde(default)]
    luck: i32,
    #[serde(default)]
    counter_luck: i32,
    /// Displayed health of attacker and defender after combat.
    #[serde(default)]
    result: Option<[f64; 2]>,
    #[serde(default)]
    power: Option<String>,
    #[serde(default)]
    weather: Option<String>,
}

/// Displayed legacy health (one decimal) to internal health.
fn legacy_hp(hp: f64) -> i32 {
    (hp * 10.0).round() as i32
}

fn parse_weather(name: &str) -> Result<Weather, String> {
    match name.to_ascii_lowercase().as_str() {
        "clear" | "c" => Ok(Weather::Clear),
        "rain" | "r" => Ok(Weather::Rain),
        "snow" | "s" => Ok(Weather::Snow),
        other => Err(format!("unknown weather {other:?}")),
    }
}

pub(super) fn decode(value: serde_json::Value) -> Result<ReplayDocument, ArchiveError> {
    let payload: Payload = serde_json::from_value(value)
        .map_err(|e| ArchiveError::corrupt(format!("version 1 payload: {e}")))?;

    let players: Vec<PlayerSnapshot> = payload
        .players
        .iter()
        .enumerate()
        .map(|(index, p)| PlayerSnapshot {
            id: PlayerId(index as u32),
            name: p.name.clone(),
            country: CountryId::new(p.country_id),
            co: CoId::new(p.co_id),
            team: p.team,
            funds: p.funds,
            power_charge: p.power,
            power_uses: 0,
            active_power: None,
            eliminated: p.eliminated,
        })
        .collect();

    let map = decode_map(&payload.terrain, &payload.buildings)?;
    let units = payload
        .units
        .iter()
        .map(decode_unit)
        .collect::<Result<Vec<_>, _>>()?;

    let mut actions = Vec::with_capacity(payload.actions.len());
    let mut day = 1;
    let mut seq = 0;
    let mut previous_turn = None;
    for (index, raw) in payload.actions.iter().enumerate() {
        if previous_turn != Some(raw.turn) {
            seq = 0;
            previous_turn = Some(raw.turn);
        }
        day = raw.day.unwrap_or(day);
        let action = decode_action(raw)
            .map_err(|e| ArchiveError::corrupt(format!("action {index}: {e}")))?;
        actions.push(RecordedAction {
            turn: raw.turn,
            day,
            player: PlayerId(raw.player),
            seq,
            action,
        });
        seq += 1;
    }

    let weather = match payload.weather.as_deref() {
        Some(name) => parse_weather(name).map_err(ArchiveError::corrupt)?,
        None => Weather::Clear,
    };

    Ok(ReplayDocument {
        source_version: 1,
        info: MatchInfo {
            id: payload.id,
            name: payload.name,
            fog_of_war: payload.fog,
            funds_per_building: payload.funds,
            co_powers: payload.powers,
        },
        initial: MatchSnapshot {
            turn: 0,
            day: 1,
            phase: MatchPhase::AwaitingStart,
            weather,
            map,
            players,
            units,
        },
        log: ActionLog::new(actions)?,
    })
}

fn decode_map(rows: &[Vec<u32>], buildings: &[LegacyBuilding]) -> Result<MapSnapshot, ArchiveError> {
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    if let Some(y) = rows.iter().position(|row| row.len() != width) {
        return Err(ArchiveError::corrupt(format!(
            "terrain row {y} has {} tiles, expected {width}",
            rows[y].len()
        )));
    }

    let mut tiles: Vec<TileSnapshot> = rows
        .iter()
        .flatten()
        .map(|id| TileSnapshot {
            terrain: TerrainId::new(*id),
            building: None,
        })
        .collect();

    for b in buildings {
        if b.x < 0 || b.y < 0 || b.x as usize >= width || b.y as usize >= height {
            return Err(ArchiveError::corrupt(format!(
                "building at ({}, {}) is outside the map",
                b.x, b.y
            )));
        }
        let tile = &mut tiles[b.y as usize * width + b.x as usize];
        if tile.building.is_some() {
            return Err(ArchiveError::corrupt(format!(
                "two buildings at ({}, {})",
                b.x, b.y
            )));
        }
        let owner = match b.owner {
            Some(index) if index >= 0 => Some(PlayerId(index as u32)),
            _ => None,
        };
        tile.building = Some(BuildingSnapshot {
            id: BuildingId::new(b.building_id),
            owner,
            capture: b.capture,
        });
    }

    Ok(MapSnapshot {
        width: width as u32,
        height: height as u32,
        tiles,
    })
}

fn decode_unit(unit: &LegacyUnit) -> Result<UnitSnapshot, ArchiveError> {
    let pos = match (unit.x, unit.y, unit.carrier) {
        (Some(x), Some(y), None) => Some(Position::new(x, y)),
        (_, _, Some(_)) => None,
        _ => {
            return Err(ArchiveError::corrupt(format!(
                "unit {} has neither a position nor a carrier",
                unit.id
            )))
        }
    };
    Ok(UnitSnapshot {
        id: UnitId(unit.id),
        unit_type: UnitTypeId::new(unit.type_id),
        owner: PlayerId(unit.player),
        pos,
        hp: legacy_hp(unit.hp),
        fuel: unit.fuel,
        ammo: unit.ammo,
        moved: false,
        acted: false,
        hidden: unit.hidden,
        carried_by: unit.carrier.map(UnitId),
    })
}

fn decode_action(raw: &LegacyAction) -> Result<Action, String> {
    let unit = || {
        raw.unit_id
            .map(UnitId)
            .ok_or_else(|| format!("{} without unit_id", raw.action))
    };
    let target = || {
        raw.target_id
            .map(UnitId)
            .ok_or_else(|| format!("{} without target_id", raw.action))
    };
    let at = || match (raw.x, raw.y) {
        (Some(x), Some(y)) => Ok(Position::new(x, y)),
        _ => Err(format!("{} without x/y", raw.action)),
    };
    let path = || {
        raw.path
            .as_ref()
            .map(|steps| {
                steps
                    .iter()
                    .map(|[x, y]| Position::new(*x, *y))
                    .collect::<Vec<_>>()
            })
            .ok_or_else(|| format!("{} without path", raw.action))
    };

    let action = match raw.action.as_str() {
        // Loading is a move that ends on the transport.
        "Move" | "Load" => Action::Move {
            unit: unit()?,
            path: path()?,
        },
        "Fire" => Action::Attack {
            attacker: unit()?,
            defender: target()?,
            attacker_luck: raw.luck,
            defender_luck: raw.counter_luck,
            outcome: raw.result.map(|[attacker, defender]| CombatOutcome {
                attacker_hp: legacy_hp(attacker),
                defender_hp: legacy_hp(defender),
            }),
        },
        "Capt" => Action::Capture { unit: unit()? },
        "Build" => Action::Build {
            at: at()?,
            unit_type: UnitTypeId::new(
                raw.type_id
                    .ok_or_else(|| "Build without type_id".to_string())?,
            ),
            unit: unit()?,
        },
        "Supply" => Action::Supply { unit: unit()? },
        "Unload" => Action::Unload {
            transport: target()?,
            unit: unit()?,
            to: at()?,
        },
        "Hide" => Action::Hide { unit: unit()? },
        "Unhide" => Action::Unhide { unit: unit()? },
        "Delete" => Action::Delete { unit: unit()? },
        "Power" => Action::PowerActivation {
            player: PlayerId(raw.player),
            power: match raw.power.as_deref() {
                Some("super") => PowerKind::SuperPower,
                Some("power") | None => PowerKind::Power,
                Some(other) => return Err(format!("unknown power {other:?}")),
            },
        },
        "Weather" => Action::WeatherChange {
            weather: parse_weather(raw.weather.as_deref().unwrap_or("clear"))?,
        },
        "Resign" => Action::Resign {
            player: PlayerId(raw.player),
        },
        "End" => Action::EndTurn,
        other => return Err(format!("unknown action {other:?}")),
    };
    Ok(action)
}
