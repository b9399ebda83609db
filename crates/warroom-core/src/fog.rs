use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};
use warroom_protocol::{PlayerId, Position, Weather};

use crate::map::GameMap;
use crate::rules::{Ruleset, UnknownCatalogId};
use crate::state::GameState;
use crate::unit::Unit;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Only what the observer's side could see during the match.
    #[default]
    Participant,
    Omniscient,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FogOptions {
    pub view: ViewMode,
}

/// Tiles visible to one observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisibleSet {
    width: u32,
    tiles: Vec<bool>,
}

impl VisibleSet {
    pub fn none(map: &GameMap) -> Self {
        Self {
            width: map.width(),
            tiles: vec![false; map.len()],
        }
    }

    pub fn all(map: &GameMap) -> Self {
        Self {
            width: map.width(),
            tiles: vec![true; map.len()],
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 {
            return false;
        }
        let index = (pos.y as usize) * (self.width as usize) + (pos.x as usize);
        self.tiles.get(index).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.tiles.iter().filter(|v| **v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.tiles.iter().any(|v| *v)
    }

    pub fn is_subset(&self, other: &VisibleSet) -> bool {
        self.tiles.len() == other.tiles.len()
            && self.tiles.iter().zip(&other.tiles).all(|(a, b)| !*a || *b)
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(move |(i, _)| Position::new((i % width) as i32, (i / width) as i32))
    }

    fn insert_index(&mut self, index: usize) {
        if let Some(slot) = self.tiles.get_mut(index) {
            *slot = true;
        }
    }
}

/// Reveal every tile reachable from `origin` within `radius`, where entering
/// a tile spends its sight cost. Tiles with a fog sight limit are revealed only
/// within that Manhattan distance of the origin.
pub fn reveal_from(
    rules: &Ruleset,
    map: &GameMap,
    origin: Position,
    radius: i32,
    out: &mut VisibleSet,
) -> Result<(), UnknownCatalogId> {
    let Some(start) = map.index_of(origin) else {
        return Ok(());
    };
    out.insert_index(start);
    if radius <= 0 {
        return Ok(());
    }

    let mut dist = vec![i32::MAX; map.len()];
    dist[start] = 0;
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0, start)));

    while let Some(Reverse((d, index))) = heap.pop() {
        if d > dist[index] {
            continue;
        }
        for neighbor in map.neighbors_indices(index).into_iter().flatten() {
            let Some(tile) = map.tile_at_index(neighbor) else {
                continue;
            };
            let next = d + tile.sight_cost(rules)?;
            if next > radius || next >= dist[neighbor] {
                continue;
            }
            dist[neighbor] = next;
            heap.push(Reverse((next, neighbor)));
        }
    }

    for (index, d) in dist.into_iter().enumerate() {
        if d > radius {
            continue;
        }
        let (Some(pos), Some(tile)) = (map.position_at(index), map.tile_at_index(index)) else {
            continue;
        };
        let limit = if tile.building.is_some() {
            None
        } else {
            rules.terrain(tile.terrain)?.fog_sight_limit
        };
        if limit.is_none_or(|limit| origin.distance(pos) <= limit) {
            out.insert_index(index);
        }
    }
    Ok(())
}

/// Sight radius of a unit, never below 1.
pub fn unit_sight(rules: &Ruleset, state: &GameState, unit: &Unit) -> Result<i32, UnknownCatalogId> {
    let utype = rules.unit_type(unit.unit_type)?;
    let mut radius = utype.vision;
    if let Some(tile) = unit.pos.and_then(|p| state.map.get(p)) {
        if unit.class.is_ground() && tile.building.is_none() {
            radius += rules.terrain(tile.terrain)?.sight_distance_increase;
        }
    }
    if let Some(player) = state.players.iter().find(|p| p.id == unit.owner) {
        radius += rules.co(player.co)?.phase(player.active_power).vision;
    }
    if state.weather == Weather::Rain {
        radius -= 1;
    }
    // Indirect and hidden units each see one tile less.
    if utype.is_indirect() {
        radius -= 1;
    }
    if unit.hidden {
        radius -= 1;
    }
    Ok(radius.max(1))
}

/// Tiles `observer` can see in `state`. Never fails: catalog lookups that
/// cannot be resolved only stop the affected source from revealing.
pub fn visible_set(
    rules: &Ruleset,
    state: &GameState,
    observer: PlayerId,
    options: FogOptions,
) -> VisibleSet {
    if options.view == ViewMode::Omniscient || !state.fog_of_war {
        return VisibleSet::all(&state.map);
    }

    let mut out = VisibleSet::none(&state.map);
    for unit in state.units.values() {
        let Some(pos) = unit.pos else { continue };
        if !state.are_allied(observer, unit.owner) {
            continue;
        }
        let revealed = unit_sight(rules, state, unit)
            .and_then(|radius| reveal_from(rules, &state.map, pos, radius, &mut out));
        if let Err(err) = revealed {
            tracing::warn!(unit = %unit.id, error = %err, "Vision source skipped");
        }
    }

    for (pos, building) in state.map.buildings() {
        let Some(owner) = building.owner else { continue };
        if !state.are_allied(observer, owner) {
            continue;
        }
        let revealed = rules
            .building(building.id)
            .and_then(|def| reveal_from(rules, &state.map, pos, def.sight_distance, &mut out));
        if let Err(err) = revealed {
            tracing::warn!(%pos, error = %err, "Vision source skipped");
        }
    }
    out
}

/// Units `observer` is shown given its visible tiles. Hidden enemies appear
/// only next to one of the observer's side's units; carried units never do.
pub fn visible_units<'a>(
    state: &'a GameState,
    observer: PlayerId,
    visible: &VisibleSet,
    options: FogOptions,
) -> Vec<&'a Unit> {
    let watchers: Vec<Position> = state
        .units
        .values()
        .filter(|u| state.are_allied(observer, u.owner))
        .filter_map(|u| u.pos)
        .collect();

    state
        .units
        .values()
        .filter(|unit| {
            let Some(pos) = unit.pos else {
                return false;
            };
            if options.view == ViewMode::Omniscient || state.are_allied(observer, unit.owner) {
                return true;
            }
            if !visible.contains(pos) {
                return false;
            }
            !unit.hidden || watchers.iter().any(|w| w.is_adjacent(pos))
        })
        .collect()
}

/// Recompute the stored per-player vision of every player.
pub fn refresh_vision(rules: &Ruleset, state: &mut GameState) {
    let options = FogOptions::default();
    let vision: BTreeMap<PlayerId, VisibleSet> = state
        .players
        .iter()
        .map(|p| (p.id, visible_set(rules, state, p.id, options)))
        .collect();
    state.vision = vision;
}
