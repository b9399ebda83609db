use warroom_protocol::{PlayerId, PowerKind};

use crate::error::SimError;
use crate::rules::Ruleset;
use crate::state::GameState;
use crate::unit::MAX_HP;

const BASE_STAR_VALUE: i32 = 9000;
const STAR_VALUE_STEP: i32 = 1800;
const MAX_PRICED_USES: u32 = 10;

/// Funds-equivalent value of one power star after `uses` activations.
pub fn star_value(uses: u32) -> i32 {
    BASE_STAR_VALUE + STAR_VALUE_STEP * uses.min(MAX_PRICED_USES) as i32
}

/// Charge needed to activate `power`, `None` when the CO has no such power.
pub fn power_cost(
    rules: &Ruleset,
    state: &GameState,
    player: PlayerId,
    power: PowerKind,
) -> Result<Option<i32>, SimError> {
    let p = state.player(player)?;
    let stars = rules.co(p.co)?.stars(power);
    Ok((stars > 0).then(|| stars * star_value(p.power_uses)))
}

/// Add charge earned from combat. Nothing accrues while a power is active,
/// and the meter never exceeds the largest power's cost.
pub(crate) fn accrue_charge(
    rules: &Ruleset,
    state: &mut GameState,
    player: PlayerId,
    amount: i32,
) -> Result<(), SimError> {
    let p = state.player(player)?;
    if p.active_power.is_some() || amount <= 0 {
        return Ok(());
    }
    let co = rules.co(p.co)?;
    let cap = co.power_stars.max(co.super_stars) * star_value(p.power_uses);
    let p = state.player_mut(player)?;
    p.power_charge = (p.power_charge + amount).min(cap);
    Ok(())
}

pub(crate) fn activate_power(
    rules: &Ruleset,
    co_powers_enabled: bool,
    state: &mut GameState,
    player: PlayerId,
    power: PowerKind,
) -> Result<(), SimError> {
    let active = state.active_player()?;
    if active != player {
        return Err(SimError::illegal(format!(
            "{player} cannot activate a power during {active}'s turn"
        )));
    }
    if !co_powers_enabled || !state.co_powers {
        return Err(SimError::illegal("CO powers are disabled"));
    }
    let p = state.player(player)?;
    if let Some(current) = p.active_power {
        return Err(SimError::illegal(format!(
            "{player} already has {current:?} active"
        )));
    }
    let Some(cost) = power_cost(rules, state, player, power)? else {
        return Err(SimError::illegal(format!("CO has no {power:?}")));
    };
    if p.power_charge < cost {
        return Err(SimError::illegal(format!(
            "{player} has {} charge, {power:?} needs {cost}",
            p.power_charge
        )));
    }

    let co = rules.co(p.co)?;
    let phase = co.phase(Some(power));
    let p = state.player_mut(player)?;
    p.power_charge -= cost;
    p.power_uses += 1;
    p.active_power = Some(power);

    if phase.heal > 0 {
        let heal = phase.heal * 10;
        for unit in state.units.values_mut().filter(|u| u.owner == player) {
            unit.hp = (unit.hp + heal).min(MAX_HP);
        }
    }
    if let Some(weather) = phase.weather {
        state.weather = weather;
    }
    Ok(())
}
