use std::collections::{BTreeMap, BTreeSet};

use warroom_protocol::{
    snapshot_hash, CoId, CountryId, MatchInfo, MatchPhase, MatchSnapshot, PlayerId,
    PlayerSnapshot, Position, PowerKind, UnitId, WireError, Weather,
};

use crate::error::SimError;
use crate::fog::VisibleSet;
use crate::map::GameMap;
use crate::rules::{CoPhase, Ruleset};
use crate::unit::{Unit, MAX_HP};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub country: CountryId,
    pub co: CoId,
    pub team: Option<u32>,
    pub funds: i32,
    pub power_charge: i32,
    pub power_uses: u32,
    pub active_power: Option<PowerKind>,
    pub eliminated: bool,
}

impl PlayerState {
    fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            country: snapshot.country,
            co: snapshot.co,
            team: snapshot.team,
            funds: snapshot.funds,
            power_charge: snapshot.power_charge,
            power_uses: snapshot.power_uses,
            active_power: snapshot.active_power,
            eliminated: snapshot.eliminated,
        }
    }

    fn to_snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            country: self.country,
            co: self.co,
            team: self.team,
            funds: self.funds,
            power_charge: self.power_charge,
            power_uses: self.power_uses,
            active_power: self.active_power,
            eliminated: self.eliminated,
        }
    }
}

/// Complete match state at one point of a replay.
#[derive(Clone, Debug)]
pub struct GameState {
    pub turn: u32,
    pub day: u32,
    pub phase: MatchPhase,
    pub weather: Weather,
    pub fog_of_war: bool,
    pub co_powers: bool,
    pub funds_per_building: i32,
    pub map: GameMap,
    pub units: BTreeMap<UnitId, Unit>,
    /// Roster order is turn order.
    pub players: Vec<PlayerState>,
    /// Per-player vision as of the last turn change.
    pub(crate) vision: BTreeMap<PlayerId, VisibleSet>,
}

impl GameState {
    pub fn from_snapshot(
        rules: &Ruleset,
        info: &MatchInfo,
        snapshot: &MatchSnapshot,
    ) -> Result<Self, String> {
        let map = GameMap::from_snapshot(rules, &snapshot.map)?;

        let mut players = Vec::with_capacity(snapshot.players.len());
        for p in &snapshot.players {
            if players.iter().any(|existing: &PlayerState| existing.id == p.id) {
                return Err(format!("duplicate player {}", p.id));
            }
            rules.co(p.co).map_err(|e| e.to_string())?;
            rules.country(p.country).map_err(|e| e.to_string())?;
            players.push(PlayerState::from_snapshot(p));
        }
        if players.is_empty() {
            return Err("match has no players".to_string());
        }

        let mut units = BTreeMap::new();
        for snap in &snapshot.units {
            let utype = rules.unit_type(snap.unit_type).map_err(|e| e.to_string())?;
            let unit = Unit::from_snapshot(snap, utype);
            if units.insert(unit.id, unit).is_some() {
                return Err(format!("duplicate unit {}", snap.id));
            }
        }

        // Cargo lists are derived from the carried-by links.
        let links: Vec<(UnitId, UnitId)> = units
            .values()
            .filter_map(|u: &Unit| u.carried_by.map(|t| (t, u.id)))
            .collect();
        for (transport, cargo) in links {
            let Some(t) = units.get_mut(&transport) else {
                return Err(format!("unit {cargo} is carried by missing unit {transport}"));
            };
            t.cargo.push(cargo);
        }

        let state = Self {
            turn: snapshot.turn,
            day: snapshot.day,
            phase: snapshot.phase.clone(),
            weather: snapshot.weather,
            fog_of_war: info.fog_of_war,
            co_powers: info.co_powers,
            funds_per_building: info.funds_per_building,
            map,
            units,
            players,
            vision: BTreeMap::new(),
        };
        state.check_invariants(rules).map_err(|e| e.to_string())?;
        Ok(state)
    }

    pub fn to_snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            turn: self.turn,
            day: self.day,
            phase: self.phase.clone(),
            weather: self.weather,
            map: self.map.to_snapshot(),
            players: self.players.iter().map(PlayerState::to_snapshot).collect(),
            units: self.units.values().map(Unit::to_snapshot).collect(),
        }
    }

    /// Deterministic digest of the observable state.
    pub fn state_hash(&self) -> Result<u64, WireError> {
        snapshot_hash(&self.to_snapshot())
    }

    /// Structural invariants every reachable state satisfies.
    pub fn check_invariants(&self, rules: &Ruleset) -> Result<(), SimError> {
        let mut occupied = BTreeSet::new();
        for unit in self.units.values() {
            let utype = rules.unit_type(unit.unit_type)?;
            if self.player_index(unit.owner).is_none() {
                return Err(SimError::invariant(format!(
                    "unit {} is owned by unknown player {}",
                    unit.id, unit.owner
                )));
            }
            if unit.hp <= 0 || unit.hp > MAX_HP {
                return Err(SimError::invariant(format!(
                    "unit {} has hp {} outside 1..={MAX_HP}",
                    unit.id, unit.hp
                )));
            }
            if !(0..=utype.max_fuel).contains(&unit.fuel) || !(0..=utype.max_ammo).contains(&unit.ammo)
            {
                return Err(SimError::invariant(format!(
                    "unit {} has fuel {} / ammo {} outside catalog limits",
                    unit.id, unit.fuel, unit.ammo
                )));
            }
            match (unit.pos, unit.carried_by) {
                (Some(pos), None) => {
                    if !self.map.contains(pos) {
                        return Err(SimError::invariant(format!(
                            "unit {} at {pos} is off the map",
                            unit.id
                        )));
                    }
                    if !occupied.insert(pos) {
                        return Err(SimError::invariant(format!(
                            "unit {} shares tile {pos} with another unit",
                            unit.id
                        )));
                    }
                }
                (None, Some(transport)) => {
                    let carrier = self.units.get(&transport).ok_or_else(|| {
                        SimError::invariant(format!(
                            "unit {} is carried by missing unit {transport}",
                            unit.id
                        ))
                    })?;
                    if !carrier.cargo.contains(&unit.id) {
                        return Err(SimError::invariant(format!(
                            "unit {} is not listed in the cargo of {transport}",
                            unit.id
                        )));
                    }
                }
                (Some(_), Some(_)) => {
                    return Err(SimError::invariant(format!(
                        "loaded unit {} still has a position",
                        unit.id
                    )))
                }
                (None, None) => {
                    return Err(SimError::invariant(format!(
                        "unit {} has no position and no transport",
                        unit.id
                    )))
                }
            }
            if unit.cargo.len() > utype.transport.as_ref().map_or(0, |t| t.capacity as usize) {
                return Err(SimError::invariant(format!(
                    "unit {} carries more units than it can hold",
                    unit.id
                )));
            }
        }
        Ok(())
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Result<&PlayerState, SimError> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| SimError::illegal(format!("unknown player {id}")))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut PlayerState, SimError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SimError::illegal(format!("unknown player {id}")))
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit, SimError> {
        self.units
            .get(&id)
            .ok_or_else(|| SimError::illegal(format!("unknown unit {id}")))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, SimError> {
        self.units
            .get_mut(&id)
            .ok_or_else(|| SimError::illegal(format!("unknown unit {id}")))
    }

    pub fn unit_at(&self, pos: Position) -> Option<&Unit> {
        self.units.values().find(|u| u.pos == Some(pos))
    }

    pub fn units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> + '_ {
        self.units.values().filter(move |u| u.owner == player)
    }

    /// Same player, or both on the same team.
    pub fn are_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        if a == b {
            return true;
        }
        let team = |id| self.players.iter().find(|p| p.id == id).and_then(|p| p.team);
        matches!((team(a), team(b)), (Some(x), Some(y)) if x == y)
    }

    /// The player whose turn is in progress.
    pub fn active_player(&self) -> Result<PlayerId, SimError> {
        self.phase
            .active_player()
            .ok_or_else(|| SimError::illegal(format!("no turn in progress ({:?})", self.phase)))
    }

    /// Modifiers of `player`'s CO for its current power state.
    pub fn co_phase<'r>(&self, rules: &'r Ruleset, player: PlayerId) -> Result<&'r CoPhase, SimError> {
        let p = self.player(player)?;
        Ok(rules.co(p.co)?.phase(p.active_power))
    }

    /// A unit the active player may order.
    pub(crate) fn own_unit(&self, id: UnitId) -> Result<&Unit, SimError> {
        let player = self.active_player()?;
        let unit = self.unit(id)?;
        if unit.owner != player {
            return Err(SimError::illegal(format!(
                "unit {id} belongs to {}, not the active player {player}",
                unit.owner
            )));
        }
        Ok(unit)
    }

    /// Remove a unit together with everything it carries. A building the unit
    /// stood on loses any partial capture progress.
    pub fn remove_unit(&mut self, rules: &Ruleset, id: UnitId) -> Result<(), SimError> {
        let Some(unit) = self.units.remove(&id) else {
            return Ok(());
        };
        if let Some(transport) = unit.carried_by.and_then(|t| self.units.get_mut(&t)) {
            transport.cargo.retain(|c| *c != id);
        }
        if let Some(building) = unit
            .pos
            .and_then(|p| self.map.get_mut(p))
            .and_then(|t| t.building.as_mut())
        {
            building.capture = rules.building(building.id)?.capture_points;
        }
        for cargo in unit.cargo {
            self.remove_unit(rules, cargo)?;
        }
        Ok(())
    }

    /// Vision recorded for `player` at the last turn change.
    pub fn vision(&self, player: PlayerId) -> Option<&VisibleSet> {
        self.vision.get(&player)
    }
}
