use warroom_protocol::{Position, UnitId};

use crate::error::SimError;
use crate::rules::Ruleset;
use crate::state::GameState;

/// Total cost of walking `path` for `unit`, excluding the starting tile.
/// Validates shape, passability and blocking units; budget checks are left
/// to the caller.
pub fn path_cost(
    rules: &Ruleset,
    state: &GameState,
    unit: UnitId,
    path: &[Position],
) -> Result<i32, SimError> {
    let mover = state.unit(unit)?;
    let Some(start) = mover.pos else {
        return Err(SimError::illegal_move(format!(
            "unit {unit} is loaded and cannot move"
        )));
    };
    let Some(first) = path.first() else {
        return Err(SimError::illegal_move("empty path"));
    };
    if *first != start {
        return Err(SimError::illegal_move(format!(
            "path starts at {first} but unit {unit} is at {start}"
        )));
    }

    let mut cost = 0;
    for (step, window) in path.windows(2).enumerate() {
        let (from, to) = (window[0], window[1]);
        if !from.is_adjacent(to) {
            return Err(SimError::illegal_move(format!(
                "step {from} -> {to} is not orthogonal"
            )));
        }
        let tile = state
            .map
            .get(to)
            .ok_or_else(|| SimError::illegal_move(format!("{to} is off the map")))?;
        let Some(step_cost) = tile.movement_cost(rules, mover.class)? else {
            return Err(SimError::illegal_move(format!(
                "{to} is impassable for {:?}",
                mover.class
            )));
        };
        cost += step_cost;

        let is_last = step + 2 == path.len();
        if !is_last {
            if let Some(blocker) = state.unit_at(to) {
                if !state.are_allied(mover.owner, blocker.owner) {
                    return Err(SimError::illegal_move(format!(
                        "path crosses enemy unit {} at {to}",
                        blocker.id
                    )));
                }
            }
        }
    }
    Ok(cost)
}

/// Move `unit` along `path`, loading it when the path ends on an own
/// transport with room for it.
pub fn apply_move(
    rules: &Ruleset,
    state: &mut GameState,
    unit: UnitId,
    path: &[Position],
) -> Result<(), SimError> {
    let mover = state.own_unit(unit)?;
    if mover.moved || mover.acted {
        return Err(SimError::illegal_move(format!("unit {unit} has already moved")));
    }
    let utype = rules.unit_type(mover.unit_type)?;
    let co = state.co_phase(rules, mover.owner)?;
    let cost = path_cost(rules, state, unit, path)?;

    let budget = utype.movement_points + co.movement;
    if cost > budget {
        return Err(SimError::illegal_move(format!(
            "path costs {cost} but unit {unit} has {budget} movement points"
        )));
    }
    if cost > mover.fuel {
        return Err(SimError::illegal_move(format!(
            "path costs {cost} but unit {unit} has {} fuel",
            mover.fuel
        )));
    }

    let (start, owner, class) = (path[0], mover.owner, mover.class);
    let Some(end) = path.last().copied() else {
        return Err(SimError::illegal_move("empty path"));
    };

    let mut load_into = None;
    if end != start {
        if let Some(occupant) = state.unit_at(end) {
            let carrier = rules.unit_type(occupant.unit_type)?;
            let room = carrier
                .transport
                .as_ref()
                .is_some_and(|t| (occupant.cargo.len() as u32) < t.capacity);
            if occupant.owner != owner || !carrier.can_carry(class) || !room {
                return Err(SimError::illegal_move(format!(
                    "{end} is occupied by unit {}",
                    occupant.id
                )));
            }
            load_into = Some(occupant.id);
        }
    }

    if end != start {
        if let Some(building) = state.map.get_mut(start).and_then(|t| t.building.as_mut()) {
            building.capture = rules.building(building.id)?.capture_points;
        }
    }

    let mover = state.unit_mut(unit)?;
    mover.fuel -= cost;
    // Waiting in place keeps an indirect unit able to fire.
    if end != start {
        mover.moved = true;
    }
    match load_into {
        Some(transport) => {
            mover.pos = None;
            mover.carried_by = Some(transport);
            state.unit_mut(transport)?.cargo.push(unit);
        }
        None => mover.pos = Some(end),
    }
    Ok(())
}
