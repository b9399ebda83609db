use warroom_protocol::{CombatOutcome, UnitId, UnitTypeId};

use crate::error::SimError;
use crate::power::accrue_charge;
use crate::rules::{Ruleset, UnitType};
use crate::state::GameState;
use crate::unit::display_hp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Weapon {
    Primary,
    Secondary,
}

/// One side's hit, computed but not yet applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strike {
    pub weapon: Weapon,
    pub damage: i32,
}

/// Primary weapon while it has ammunition and can hit the target, else the
/// secondary weapon.
pub fn select_weapon(attacker: &UnitType, ammo: i32, target: UnitTypeId) -> Option<(Weapon, i32)> {
    if ammo > 0 {
        if let Some(base) = attacker.damage.primary.get(&target) {
            return Some((Weapon::Primary, *base));
        }
    }
    attacker
        .damage
        .secondary
        .get(&target)
        .map(|base| (Weapon::Secondary, *base))
}

/// `floor((B*ATK + 100*L) * HPa * (200 - DEF - DTR*HPd) / 100000)`, never
/// negative. Health values are displayed health.
pub fn damage_formula(
    base: i32,
    attack: i32,
    luck: i32,
    attacker_hp: i32,
    defence: i32,
    terrain_stars: i32,
    defender_hp: i32,
) -> i32 {
    let offence = i64::from(base) * i64::from(attack) + 100 * i64::from(luck);
    let resistance = 200 - i64::from(defence) - i64::from(terrain_stars) * i64::from(defender_hp);
    let product = offence * i64::from(attacker_hp) * resistance;
    product.div_euclid(100_000).max(0) as i32
}

/// Damage `striker` would deal to `target` with the given luck roll.
pub fn compute_strike(
    rules: &Ruleset,
    state: &GameState,
    striker: UnitId,
    target: UnitId,
    luck: i32,
) -> Result<Option<Strike>, SimError> {
    let s = state.unit(striker)?;
    let t = state.unit(target)?;
    let s_type = rules.unit_type(s.unit_type)?;
    let t_type = rules.unit_type(t.unit_type)?;

    let Some((weapon, base)) = select_weapon(s_type, s.ammo, t.unit_type) else {
        return Ok(None);
    };

    let s_co = state.co_phase(rules, s.owner)?;
    let t_co = state.co_phase(rules, t.owner)?;
    let range_bonus = if s_type.is_indirect() {
        s_co.indirect_attack
    } else {
        s_co.direct_attack
    };
    let attack = 100 + s_co.attack + range_bonus;
    let defence = 100 + t_co.defence;

    let terrain_stars = match t.pos.and_then(|p| state.map.get(p)) {
        Some(_) if t_type.movement_class.is_air() => 0,
        Some(tile) => tile.defence(rules)?,
        None => 0,
    };

    let damage = damage_formula(
        base,
        attack,
        luck,
        display_hp(s.hp),
        defence,
        terrain_stars,
        display_hp(t.hp),
    );
    Ok(Some(Strike {
        weapon,
        damage: damage.min(t.hp),
    }))
}

fn check_luck(rules: &Ruleset, state: &GameState, unit: UnitId, luck: i32) -> Result<(), SimError> {
    let owner = state.unit(unit)?.owner;
    let co = rules.co(state.player(owner)?.co)?;
    if luck < -co.bad_luck_max || luck > co.luck_max {
        return Err(SimError::invariant(format!(
            "luck roll {luck} outside -{}..={} for {}",
            co.bad_luck_max, co.luck_max, co.name
        )));
    }
    Ok(())
}

/// Apply a strike, spending ammunition and crediting CO charge. Returns the
/// target's remaining health.
fn land_strike(
    rules: &Ruleset,
    state: &mut GameState,
    striker: UnitId,
    target: UnitId,
    strike: Strike,
) -> Result<i32, SimError> {
    let striker_owner = state.unit(striker)?.owner;
    let (target_owner, target_type) = {
        let t = state.unit(target)?;
        (t.owner, t.unit_type)
    };
    let value = strike.damage * rules.unit_type(target_type)?.cost / 100;

    if strike.weapon == Weapon::Primary {
        state.unit_mut(striker)?.ammo -= 1;
    }
    let t = state.unit_mut(target)?;
    t.hp -= strike.damage;
    let remaining = t.hp.max(0);

    accrue_charge(rules, state, striker_owner, value / 2)?;
    accrue_charge(rules, state, target_owner, value)?;

    if remaining == 0 {
        state.remove_unit(rules, target)?;
    }
    Ok(remaining)
}

pub(crate) fn apply_attack(
    rules: &Ruleset,
    state: &mut GameState,
    attacker: UnitId,
    defender: UnitId,
    attacker_luck: i32,
    defender_luck: i32,
    recorded: Option<CombatOutcome>,
) -> Result<CombatOutcome, SimError> {
    let att = state.own_unit(attacker)?;
    if att.acted {
        return Err(SimError::illegal(format!("unit {attacker} has already acted")));
    }
    let Some(att_pos) = att.pos else {
        return Err(SimError::illegal(format!("unit {attacker} is loaded")));
    };
    let def = state.unit(defender)?;
    let Some(def_pos) = def.pos else {
        return Err(SimError::illegal(format!("unit {defender} is loaded")));
    };
    if state.are_allied(att.owner, def.owner) {
        return Err(SimError::illegal(format!(
            "unit {attacker} cannot attack allied unit {defender}"
        )));
    }

    let att_type = rules.unit_type(att.unit_type)?;
    let def_type = rules.unit_type(def.unit_type)?;
    let distance = att_pos.distance(def_pos);
    let max_range = if att_type.is_indirect() {
        let bonus = state.co_phase(rules, att.owner)?.indirect_range;
        (att_type.max_range + bonus).max(att_type.min_range)
    } else {
        att_type.max_range
    };
    if distance < att_type.min_range || distance > max_range {
        return Err(SimError::illegal(format!(
            "unit {defender} at distance {distance} is outside range {}..={max_range}",
            att_type.min_range
        )));
    }
    if att_type.is_indirect() && att.moved {
        return Err(SimError::illegal(format!(
            "indirect unit {attacker} cannot fire after moving"
        )));
    }
    let counters = !def_type.is_indirect() && distance == 1;

    check_luck(rules, state, attacker, attacker_luck)?;
    let Some(strike) = compute_strike(rules, state, attacker, defender, attacker_luck)? else {
        return Err(SimError::illegal(format!(
            "unit {attacker} has no weapon against unit {defender}"
        )));
    };
    let mut outcome = CombatOutcome {
        attacker_hp: state.unit(attacker)?.hp,
        defender_hp: land_strike(rules, state, attacker, defender, strike)?,
    };

    if outcome.defender_hp > 0 && counters {
        if let Some(counter) = compute_strike(rules, state, defender, attacker, defender_luck)? {
            check_luck(rules, state, defender, defender_luck)?;
            outcome.attacker_hp = land_strike(rules, state, defender, attacker, counter)?;
        }
    }

    if outcome.attacker_hp > 0 {
        let att = state.unit_mut(attacker)?;
        att.moved = true;
        att.acted = true;
    }

    if let Some(recorded) = recorded {
        if recorded != outcome {
            return Err(SimError::invariant(format!(
                "recorded outcome {}/{} differs from simulated {}/{}",
                recorded.attacker_hp, recorded.defender_hp, outcome.attacker_hp, outcome.defender_hp
            )));
        }
    }
    Ok(outcome)
}
