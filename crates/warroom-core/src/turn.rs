use std::collections::BTreeMap;

use warroom_protocol::{MatchOutcome, MatchPhase, PlayerId, UnitId};

use crate::error::SimError;
use crate::fog::refresh_vision;
use crate::rules::Ruleset;
use crate::state::GameState;
use crate::unit::{display_hp, MAX_HP};

const REPAIR_HP: i32 = 2;

/// Put a match that has not started into its first player's turn.
pub fn begin_match(rules: &Ruleset, state: &mut GameState) -> Result<(), SimError> {
    if state.phase != MatchPhase::AwaitingStart {
        return Ok(());
    }
    let first = state
        .players
        .iter()
        .find(|p| !p.eliminated)
        .map(|p| p.id)
        .ok_or_else(|| SimError::invariant("every player is eliminated"))?;
    state.phase = MatchPhase::TurnActive { player: first };
    refresh_vision(rules, state);
    Ok(())
}

pub(crate) fn end_turn(rules: &Ruleset, state: &mut GameState) -> Result<(), SimError> {
    let player = state.active_player()?;
    state.phase = MatchPhase::TurnEnding { player };
    for unit in state.units.values_mut().filter(|u| u.owner == player) {
        unit.moved = false;
        unit.acted = false;
    }

    let defeated: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|p| !p.eliminated && is_defeated(rules, state, p.id))
        .map(|p| p.id)
        .collect();
    for id in defeated {
        eliminate(rules, state, id)?;
    }

    advance_to_next_player(rules, state, player)
}

pub(crate) fn resign(
    rules: &Ruleset,
    state: &mut GameState,
    player: PlayerId,
) -> Result<(), SimError> {
    state.active_player()?;
    if state.player(player)?.eliminated {
        return Err(SimError::illegal(format!("{player} is already eliminated")));
    }
    eliminate(rules, state, player)?;
    // The turn stays open even when the active player resigns; the recorded
    // EndTurn closes it and rotation skips the eliminated player.
    if let Some(outcome) = match_outcome(state) {
        tracing::debug!(turn = state.turn, ?outcome, "Match over");
        state.phase = MatchPhase::MatchOver { outcome };
    }
    refresh_vision(rules, state);
    Ok(())
}

/// Remove a player's units and release its buildings.
pub(crate) fn eliminate(
    rules: &Ruleset,
    state: &mut GameState,
    player: PlayerId,
) -> Result<(), SimError> {
    state.player_mut(player)?.eliminated = true;
    let units: Vec<UnitId> = state.units_of(player).map(|u| u.id).collect();
    for id in units {
        state.remove_unit(rules, id)?;
    }
    for building in state.map.buildings_mut() {
        if building.owner == Some(player) {
            building.owner = None;
        }
    }
    tracing::debug!(%player, turn = state.turn, "Player eliminated");
    Ok(())
}

/// A player with no units and no headquarters is out of the match.
fn is_defeated(rules: &Ruleset, state: &GameState, player: PlayerId) -> bool {
    if state.units_of(player).next().is_some() {
        return false;
    }
    !state.map.buildings().any(|(_, b)| {
        b.owner == Some(player)
            && rules
                .building(b.id)
                .is_ok_and(|def| def.headquarters)
    })
}

/// `Some` once at most one player or team remains.
fn match_outcome(state: &GameState) -> Option<MatchOutcome> {
    let mut sides: BTreeMap<(u32, u32), Vec<PlayerId>> = BTreeMap::new();
    for p in state.players.iter().filter(|p| !p.eliminated) {
        // Teamless players form their own side.
        let key = match p.team {
            Some(team) => (0, team),
            None => (1, p.id.0),
        };
        sides.entry(key).or_default().push(p.id);
    }
    match sides.len() {
        0 => Some(MatchOutcome::Draw),
        1 => sides
            .into_values()
            .next()
            .map(|winners| MatchOutcome::Victory { winners }),
        _ => None,
    }
}

fn advance_to_next_player(
    rules: &Ruleset,
    state: &mut GameState,
    ending: PlayerId,
) -> Result<(), SimError> {
    if let Some(outcome) = match_outcome(state) {
        tracing::debug!(turn = state.turn, ?outcome, "Match over");
        state.phase = MatchPhase::MatchOver { outcome };
        refresh_vision(rules, state);
        return Ok(());
    }

    let current = state
        .player_index(ending)
        .ok_or_else(|| SimError::invariant(format!("unknown player {ending}")))?;
    let count = state.players.len();
    let next = (1..=count)
        .map(|offset| (current + offset) % count)
        .find(|&i| !state.players[i].eliminated)
        .ok_or_else(|| SimError::invariant("no player left to take a turn"))?;
    if next <= current {
        state.day += 1;
    }
    state.turn += 1;

    let player = state.players[next].id;
    start_turn(rules, state, player)?;
    state.phase = MatchPhase::TurnActive { player };
    refresh_vision(rules, state);
    Ok(())
}

/// Start-of-turn upkeep: power expiry, income, fuel drain, repairs and supply.
fn start_turn(rules: &Ruleset, state: &mut GameState, player: PlayerId) -> Result<(), SimError> {
    let income_buildings = state
        .map
        .buildings()
        .filter(|(_, b)| b.owner == Some(player))
        .filter(|(_, b)| rules.building(b.id).is_ok_and(|def| def.income))
        .count() as i32;
    let funds_per_building = state.funds_per_building;
    let p = state.player_mut(player)?;
    p.active_power = None;
    p.funds += funds_per_building * income_buildings;

    drain_fuel(rules, state, player)?;
    repair_and_resupply(rules, state, player)?;
    supply_from_units(rules, state, player)?;
    Ok(())
}

fn drain_fuel(rules: &Ruleset, state: &mut GameState, player: PlayerId) -> Result<(), SimError> {
    let mut crashed = Vec::new();
    for unit in state.units.values_mut().filter(|u| u.owner == player && u.pos.is_some()) {
        let utype = rules.unit_type(unit.unit_type)?;
        let drain = if unit.hidden {
            utype.hidden_daily_fuel
        } else {
            utype.daily_fuel
        };
        if drain == 0 {
            continue;
        }
        unit.fuel = (unit.fuel - drain).max(0);
        if unit.fuel == 0 && utype.crashes_without_fuel() {
            crashed.push(unit.id);
        }
    }
    for id in crashed {
        tracing::debug!(unit = %id, "Unit ran out of fuel");
        state.remove_unit(rules, id)?;
    }
    Ok(())
}

fn repair_and_resupply(
    rules: &Ruleset,
    state: &mut GameState,
    player: PlayerId,
) -> Result<(), SimError> {
    let candidates: Vec<UnitId> = state
        .units_of(player)
        .filter(|u| {
            u.pos
                .and_then(|p| state.map.get(p))
                .and_then(|t| t.building.as_ref())
                .is_some_and(|b| {
                    b.owner == Some(player)
                        && rules.building(b.id).is_ok_and(|def| def.can_repair(u.class))
                })
        })
        .map(|u| u.id)
        .collect();

    for id in candidates {
        let unit = state.unit(id)?;
        let utype = rules.unit_type(unit.unit_type)?;
        let heal = REPAIR_HP.min(10 - display_hp(unit.hp));
        let price = utype.cost * heal / 10;
        let p = state.player_mut(player)?;
        let healed = heal > 0 && p.funds >= price;
        if healed {
            p.funds -= price;
        }
        let unit = state.unit_mut(id)?;
        if healed {
            unit.hp = (unit.hp + heal * 10).min(MAX_HP);
        }
        unit.resupply(utype);
    }
    Ok(())
}

/// Units able to supply refill every adjacent own unit at turn start.
fn supply_from_units(
    rules: &Ruleset,
    state: &mut GameState,
    player: PlayerId,
) -> Result<(), SimError> {
    let mut suppliers = Vec::new();
    for unit in state.units_of(player) {
        if let Some(pos) = unit.pos {
            if rules.unit_type(unit.unit_type)?.can_supply {
                suppliers.push(pos);
            }
        }
    }
    if suppliers.is_empty() {
        return Ok(());
    }
    for unit in state.units.values_mut().filter(|u| u.owner == player) {
        let Some(pos) = unit.pos else { continue };
        if suppliers.iter().any(|s| s.is_adjacent(pos)) {
            unit.resupply(rules.unit_type(unit.unit_type)?);
        }
    }
    Ok(())
}
