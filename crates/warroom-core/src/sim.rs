use warroom_protocol::{Action, Position, UnitId, UnitTypeId};

use crate::combat::apply_attack;
use crate::config::ReplayConfig;
use crate::error::SimError;
use crate::movement::apply_move;
use crate::power::activate_power;
use crate::rules::Ruleset;
use crate::state::GameState;
use crate::turn::{end_turn, resign};
use crate::unit::Unit;

/// Apply one action to a copy of `state`. The input is never modified, so a
/// failed action leaves the caller with the state it started from.
pub fn advance(
    rules: &Ruleset,
    config: &ReplayConfig,
    state: &GameState,
    action: &Action,
) -> Result<GameState, SimError> {
    let mut next = state.clone();
    apply_action(rules, config, &mut next, action)?;
    Ok(next)
}

fn apply_action(
    rules: &Ruleset,
    config: &ReplayConfig,
    state: &mut GameState,
    action: &Action,
) -> Result<(), SimError> {
    if state.phase.is_over() {
        return Err(SimError::illegal(format!(
            "{} after the match ended",
            action.name()
        )));
    }

    match action {
        Action::Move { unit, path } => apply_move(rules, state, *unit, path),
        Action::Attack {
            attacker,
            defender,
            attacker_luck,
            defender_luck,
            outcome,
        } => apply_attack(
            rules,
            state,
            *attacker,
            *defender,
            *attacker_luck,
            *defender_luck,
            *outcome,
        )
        .map(|_| ()),
        Action::Capture { unit } => capture(rules, state, *unit),
        Action::Build {
            at,
            unit_type,
            unit,
        } => build(rules, state, *at, *unit_type, *unit),
        Action::Supply { unit } => supply(rules, state, *unit),
        Action::Unload {
            transport,
            unit,
            to,
        } => unload(rules, state, *transport, *unit, *to),
        Action::Hide { unit } => set_hidden(rules, state, *unit, true),
        Action::Unhide { unit } => set_hidden(rules, state, *unit, false),
        Action::Delete { unit } => {
            state.own_unit(*unit)?;
            state.remove_unit(rules, *unit)
        }
        Action::PowerActivation { player, power } => {
            activate_power(rules, config.co_powers_enabled, state, *player, *power)
        }
        Action::WeatherChange { weather } => {
            state.active_player()?;
            state.weather = *weather;
            Ok(())
        }
        Action::Resign { player } => resign(rules, state, *player),
        Action::EndTurn => end_turn(rules, state),
    }
}

fn ready_unit(state: &GameState, id: UnitId) -> Result<(&Unit, Position), SimError> {
    let unit = state.own_unit(id)?;
    if unit.acted {
        return Err(SimError::illegal(format!("unit {id} has already acted")));
    }
    let pos = unit
        .pos
        .ok_or_else(|| SimError::illegal(format!("unit {id} is loaded")))?;
    Ok((unit, pos))
}

fn capture(rules: &Ruleset, state: &mut GameState, id: UnitId) -> Result<(), SimError> {
    let (unit, pos) = ready_unit(state, id)?;
    if !rules.unit_type(unit.unit_type)?.can_capture {
        return Err(SimError::illegal(format!("unit {id} cannot capture")));
    }
    let (owner, strength) = (unit.owner, unit.display_hp());

    let building = state
        .map
        .get_mut(pos)
        .and_then(|t| t.building.as_mut())
        .ok_or_else(|| SimError::illegal(format!("no building at {pos}")))?;
    if building.owner == Some(owner) {
        return Err(SimError::illegal(format!("{owner} already owns {pos}")));
    }
    building.capture -= strength;
    if building.capture <= 0 {
        building.owner = Some(owner);
        building.capture = rules.building(building.id)?.capture_points;
        tracing::debug!(%owner, %pos, "Building captured");
    }

    let unit = state.unit_mut(id)?;
    unit.moved = true;
    unit.acted = true;
    Ok(())
}

fn build(
    rules: &Ruleset,
    state: &mut GameState,
    at: Position,
    unit_type: UnitTypeId,
    id: UnitId,
) -> Result<(), SimError> {
    let player = state.active_player()?;
    let utype = rules.unit_type(unit_type)?;
    let tile = state
        .map
        .get(at)
        .ok_or_else(|| SimError::illegal(format!("{at} is off the map")))?;
    let building = tile
        .building
        .as_ref()
        .ok_or_else(|| SimError::illegal(format!("no building at {at}")))?;
    if building.owner != Some(player) {
        return Err(SimError::illegal(format!("{player} does not own {at}")));
    }
    if !rules.building(building.id)?.can_build(utype.movement_class) {
        return Err(SimError::illegal(format!(
            "building at {at} cannot build {}",
            utype.name
        )));
    }
    if let Some(occupant) = state.unit_at(at) {
        return Err(SimError::illegal(format!(
            "{at} is occupied by unit {}",
            occupant.id
        )));
    }
    if state.units.contains_key(&id) {
        return Err(SimError::invariant(format!("unit id {id} is already in use")));
    }

    let p = state.player(player)?;
    let price = utype.cost * rules.co(p.co)?.cost_percent / 100;
    if p.funds < price {
        return Err(SimError::illegal(format!(
            "{player} has {} funds, {} costs {price}",
            p.funds, utype.name
        )));
    }
    state.player_mut(player)?.funds -= price;

    let mut unit = Unit::new(id, utype, player, at);
    unit.moved = true;
    unit.acted = true;
    state.units.insert(id, unit);
    Ok(())
}

fn supply(rules: &Ruleset, state: &mut GameState, id: UnitId) -> Result<(), SimError> {
    let (unit, pos) = ready_unit(state, id)?;
    if !rules.unit_type(unit.unit_type)?.can_supply {
        return Err(SimError::illegal(format!("unit {id} cannot supply")));
    }
    let owner = unit.owner;
    for other in state.units.values_mut() {
        if other.owner == owner && other.pos.is_some_and(|p| p.is_adjacent(pos)) {
            other.resupply(rules.unit_type(other.unit_type)?);
        }
    }
    let unit = state.unit_mut(id)?;
    unit.moved = true;
    unit.acted = true;
    Ok(())
}

fn unload(
    rules: &Ruleset,
    state: &mut GameState,
    transport: UnitId,
    cargo: UnitId,
    to: Position,
) -> Result<(), SimError> {
    let (carrier, from) = ready_unit(state, transport)?;
    if !carrier.cargo.contains(&cargo) {
        return Err(SimError::illegal(format!(
            "unit {cargo} is not carried by unit {transport}"
        )));
    }
    if !from.is_adjacent(to) {
        return Err(SimError::illegal_move(format!(
            "cannot unload from {from} to non-adjacent {to}"
        )));
    }
    let class = state.unit(cargo)?.class;
    let tile = state
        .map
        .get(to)
        .ok_or_else(|| SimError::illegal_move(format!("{to} is off the map")))?;
    if tile.movement_cost(rules, class)?.is_none() {
        return Err(SimError::illegal_move(format!(
            "{to} is impassable for {class:?}"
        )));
    }
    if let Some(occupant) = state.unit_at(to) {
        return Err(SimError::illegal_move(format!(
            "{to} is occupied by unit {}",
            occupant.id
        )));
    }

    let carrier = state.unit_mut(transport)?;
    carrier.cargo.retain(|c| *c != cargo);
    carrier.moved = true;
    carrier.acted = true;
    let unit = state.unit_mut(cargo)?;
    unit.carried_by = None;
    unit.pos = Some(to);
    unit.moved = true;
    unit.acted = true;
    Ok(())
}

fn set_hidden(
    rules: &Ruleset,
    state: &mut GameState,
    id: UnitId,
    hidden: bool,
) -> Result<(), SimError> {
    let (unit, _) = ready_unit(state, id)?;
    if !rules.unit_type(unit.unit_type)?.can_hide {
        return Err(SimError::illegal(format!("unit {id} cannot hide")));
    }
    if unit.hidden == hidden {
        return Err(SimError::illegal(format!(
            "unit {id} is already {}",
            if hidden { "hidden" } else { "visible" }
        )));
    }
    let unit = state.unit_mut(id)?;
    unit.hidden = hidden;
    unit.moved = true;
    unit.acted = true;
    Ok(())
}
