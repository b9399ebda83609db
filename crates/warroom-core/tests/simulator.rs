//! Rule-level scenarios driven through the public simulator.

mod common;

use common::*;
use warroom_core::{advance, GameState, ReplayConfig, SimError};
use warroom_protocol::{
    Action, CombatOutcome, MatchOutcome, MatchPhase, PlayerId, PowerKind, UnitId,
};

fn config() -> ReplayConfig {
    ReplayConfig::default()
}

/// Row 0: plain, wood, wood, wood, plain. Row 1: plain, wood, wood, plain, plain.
fn woodland() -> Scenario {
    Scenario::new(5, 2)
        .terrain(pos(1, 0), WOOD)
        .terrain(pos(2, 0), WOOD)
        .terrain(pos(3, 0), WOOD)
        .terrain(pos(1, 1), WOOD)
        .terrain(pos(2, 1), WOOD)
        .unit_with(1, TANK, 0, pos(0, 0), |u| u.fuel = Some(5))
}

/// A path whose cost exceeds remaining fuel is rejected even when movement
/// points would allow it.
#[test]
fn tank_cannot_outrun_its_fuel() {
    let rules = rules();
    let state = woodland().state();

    let err = advance(
        &rules,
        &config(),
        &state,
        &mv(1, &[(0, 0), (1, 0), (2, 0), (3, 0)]),
    )
    .unwrap_err();
    assert!(matches!(err, SimError::IllegalMove(_)), "got {err:?}");
    assert_eq!(state.unit(UnitId(1)).unwrap().fuel, 5);
}

/// Spending exactly the remaining fuel is allowed and empties the tank.
#[test]
fn tank_may_spend_its_last_fuel() {
    let rules = rules();
    let state = woodland().state();

    let next = advance(
        &rules,
        &config(),
        &state,
        &mv(1, &[(0, 0), (0, 1), (1, 1), (2, 1)]),
    )
    .expect("five-point path");
    let tank = next.unit(UnitId(1)).unwrap();
    assert_eq!(tank.fuel, 0);
    assert_eq!(tank.pos, Some(pos(2, 1)));
    assert!(tank.moved);
}

#[test]
fn path_through_enemy_is_rejected() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, INFANTRY, 0, pos(0, 0))
        .unit(2, INFANTRY, 1, pos(1, 0))
        .state();

    let err = advance(&rules, &config(), &state, &mv(1, &[(0, 0), (1, 0), (2, 0)])).unwrap_err();
    assert!(matches!(err, SimError::IllegalMove(_)));
}

#[test]
fn unit_cannot_move_twice() {
    let rules = rules();
    let state = Scenario::new(4, 1).unit(1, INFANTRY, 0, pos(0, 0)).state();

    let once = advance(&rules, &config(), &state, &mv(1, &[(0, 0), (1, 0)])).unwrap();
    let err = advance(&rules, &config(), &once, &mv(1, &[(1, 0), (2, 0)])).unwrap_err();
    assert!(matches!(err, SimError::IllegalMove(_)));
}

/// Terrain without a cost entry for the mover's class is never entered.
#[test]
fn tank_cannot_drive_into_the_sea() {
    let rules = rules();
    let state = Scenario::new(3, 1)
        .terrain(pos(1, 0), SEA)
        .unit(1, TANK, 0, pos(0, 0))
        .state();

    let err = advance(&rules, &config(), &state, &mv(1, &[(0, 0), (1, 0)])).unwrap_err();
    assert!(matches!(err, SimError::IllegalMove(_)), "got {err:?}");
    assert_eq!(state.unit(UnitId(1)).unwrap().pos, Some(pos(0, 0)));
}

fn capture_left(state: &GameState, at: (i32, i32)) -> i32 {
    state
        .map
        .get(pos(at.0, at.1))
        .and_then(|t| t.building.as_ref())
        .map(|b| b.capture)
        .unwrap()
}

#[test]
fn capture_progress_resets_when_the_capturer_is_removed() {
    let rules = rules();
    let full = rules.building(CITY).unwrap().capture_points;
    let state = Scenario::new(3, 1)
        .building(pos(1, 0), CITY, None)
        .unit(1, INFANTRY, 0, pos(1, 0))
        .state();

    let capturing = advance(&rules, &config(), &state, &Action::Capture { unit: UnitId(1) })
        .expect("capture");
    assert_eq!(capture_left(&capturing, (1, 0)), full - 10);

    let deleted = advance(&rules, &config(), &capturing, &Action::Delete { unit: UnitId(1) })
        .expect("delete");
    assert_eq!(capture_left(&deleted, (1, 0)), full);
}

fn duel() -> Scenario {
    Scenario::new(3, 1)
        .unit(1, INFANTRY, 0, pos(0, 0))
        .unit(2, INFANTRY, 1, pos(1, 0))
}

/// Infantry trade on plain: 49 damage dealt, 29 countered from six health.
#[test]
fn infantry_exchange_matches_recorded_outcome() {
    let rules = rules();
    let state = duel().state();
    let action = Action::Attack {
        attacker: UnitId(1),
        defender: UnitId(2),
        attacker_luck: 0,
        defender_luck: 0,
        outcome: Some(CombatOutcome {
            attacker_hp: 71,
            defender_hp: 51,
        }),
    };

    let next = advance(&rules, &config(), &state, &action).expect("attack");
    assert_eq!(next.unit(UnitId(1)).unwrap().hp, 71);
    assert_eq!(next.unit(UnitId(2)).unwrap().hp, 51);
    assert!(next.unit(UnitId(1)).unwrap().acted);
    // Both owners earn charge; the damaged side earns more.
    let p0 = next.player(PlayerId(0)).unwrap().power_charge;
    let p1 = next.player(PlayerId(1)).unwrap().power_charge;
    assert!(p0 > 0 && p1 > p0);
}

#[test]
fn diverging_outcome_is_an_invariant_violation() {
    let rules = rules();
    let state = duel().state();
    let action = Action::Attack {
        attacker: UnitId(1),
        defender: UnitId(2),
        attacker_luck: 0,
        defender_luck: 0,
        outcome: Some(CombatOutcome {
            attacker_hp: 100,
            defender_hp: 40,
        }),
    };

    let err = advance(&rules, &config(), &state, &action).unwrap_err();
    assert!(matches!(err, SimError::InvariantViolation(_)));
}

#[test]
fn luck_outside_co_range_is_an_invariant_violation() {
    let rules = rules();
    let state = duel().state();
    let action = Action::Attack {
        attacker: UnitId(1),
        defender: UnitId(2),
        attacker_luck: 10,
        defender_luck: 0,
        outcome: None,
    };

    let err = advance(&rules, &config(), &state, &action).unwrap_err();
    assert!(matches!(err, SimError::InvariantViolation(_)));
}

#[test]
fn indirect_fire_draws_no_counter() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, ARTILLERY, 0, pos(0, 0))
        .unit(2, TANK, 1, pos(2, 0))
        .state();

    let next = advance(&rules, &config(), &state, &attack(1, 2)).expect("artillery fire");
    assert_eq!(next.unit(UnitId(1)).unwrap().hp, 100);
    assert!(next.unit(UnitId(2)).unwrap().hp < 100);
    let artillery = next.unit(UnitId(1)).unwrap();
    assert_eq!(
        artillery.ammo,
        rules.unit_type(ARTILLERY).unwrap().max_ammo - 1
    );
}

/// A move that ends where it started does not count as moving.
#[test]
fn artillery_waiting_in_place_can_still_fire() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, ARTILLERY, 0, pos(0, 0))
        .unit(2, TANK, 1, pos(2, 0))
        .state();

    let waited = advance(&rules, &config(), &state, &mv(1, &[(0, 0)])).expect("wait");
    assert!(!waited.unit(UnitId(1)).unwrap().moved);

    let fired = advance(&rules, &config(), &waited, &attack(1, 2)).expect("fire");
    assert!(fired.unit(UnitId(2)).unwrap().hp < 100);
}

#[test]
fn attacking_an_adjacent_target_from_range_two_weapon_fails() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, ARTILLERY, 0, pos(0, 0))
        .unit(2, TANK, 1, pos(1, 0))
        .state();

    let err = advance(&rules, &config(), &state, &attack(1, 2)).unwrap_err();
    assert!(matches!(err, SimError::IllegalAction(_)));
}

#[test]
fn build_spends_funds_and_spawns_an_exhausted_unit() {
    let rules = rules();
    let cost = rules.unit_type(TANK).unwrap().cost;
    let state = Scenario::new(3, 3)
        .building(pos(1, 1), BASE, Some(0))
        .edit_player(0, |p| p.funds = cost + 500)
        .state();
    let action = Action::Build {
        at: pos(1, 1),
        unit_type: TANK,
        unit: UnitId(9),
    };

    let next = advance(&rules, &config(), &state, &action).expect("build");
    assert_eq!(next.player(PlayerId(0)).unwrap().funds, 500);
    let tank = next.unit(UnitId(9)).unwrap();
    assert_eq!(tank.owner, PlayerId(0));
    assert!(tank.moved && tank.acted);

    let poor = Scenario::new(3, 3)
        .building(pos(1, 1), BASE, Some(0))
        .edit_player(0, |p| p.funds = cost - 1)
        .state();
    let err = advance(&rules, &config(), &poor, &action).unwrap_err();
    assert!(matches!(err, SimError::IllegalAction(_)));
}

#[test]
fn build_reusing_a_unit_id_is_an_invariant_violation() {
    let rules = rules();
    let state = Scenario::new(3, 3)
        .building(pos(1, 1), BASE, Some(0))
        .edit_player(0, |p| p.funds = 50_000)
        .unit(9, INFANTRY, 0, pos(0, 0))
        .state();
    let action = Action::Build {
        at: pos(1, 1),
        unit_type: INFANTRY,
        unit: UnitId(9),
    };

    let err = advance(&rules, &config(), &state, &action).unwrap_err();
    assert!(matches!(err, SimError::InvariantViolation(_)));
}

#[test]
fn infantry_boards_and_leaves_an_apc() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, APC, 0, pos(1, 0))
        .unit(2, INFANTRY, 0, pos(0, 0))
        .state();

    let loaded = advance(&rules, &config(), &state, &mv(2, &[(0, 0), (1, 0)])).expect("load");
    let infantry = loaded.unit(UnitId(2)).unwrap();
    assert_eq!(infantry.pos, None);
    assert_eq!(infantry.carried_by, Some(UnitId(1)));
    assert_eq!(loaded.unit(UnitId(1)).unwrap().cargo, vec![UnitId(2)]);

    let unload = Action::Unload {
        transport: UnitId(1),
        unit: UnitId(2),
        to: pos(2, 0),
    };
    let dropped = advance(&rules, &config(), &loaded, &unload).expect("unload");
    let infantry = dropped.unit(UnitId(2)).unwrap();
    assert_eq!(infantry.pos, Some(pos(2, 0)));
    assert_eq!(infantry.carried_by, None);
    assert!(dropped.unit(UnitId(1)).unwrap().cargo.is_empty());
}

#[test]
fn tank_cannot_board_an_apc() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .unit(1, APC, 0, pos(1, 0))
        .unit(2, TANK, 0, pos(0, 0))
        .state();

    let err = advance(&rules, &config(), &state, &mv(2, &[(0, 0), (1, 0)])).unwrap_err();
    assert!(matches!(err, SimError::IllegalMove(_)));
}

/// Andy's power heals two display health and consumes three stars of charge.
#[test]
fn power_activation_heals_and_spends_charge() {
    let rules = rules();
    let state = Scenario::new(3, 1)
        .edit_player(0, |p| p.power_charge = 27_000)
        .unit_with(1, INFANTRY, 0, pos(0, 0), |u| u.hp = 50)
        .state();
    let action = Action::PowerActivation {
        player: PlayerId(0),
        power: PowerKind::Power,
    };

    let next = advance(&rules, &config(), &state, &action).expect("power");
    let p0 = next.player(PlayerId(0)).unwrap();
    assert_eq!(p0.power_charge, 0);
    assert_eq!(p0.power_uses, 1);
    assert_eq!(p0.active_power, Some(PowerKind::Power));
    assert_eq!(next.unit(UnitId(1)).unwrap().hp, 70);

    let err = advance(&rules, &config(), &next, &action).unwrap_err();
    assert!(matches!(err, SimError::IllegalAction(_)));
}

#[test]
fn power_without_charge_is_illegal() {
    let rules = rules();
    let state = Scenario::new(3, 1)
        .edit_player(0, |p| p.power_charge = 26_999)
        .state();
    let action = Action::PowerActivation {
        player: PlayerId(0),
        power: PowerKind::Power,
    };

    let err = advance(&rules, &config(), &state, &action).unwrap_err();
    assert!(matches!(err, SimError::IllegalAction(_)));
}

#[test]
fn disabled_powers_reject_activation() {
    let rules = rules();
    let state = Scenario::new(3, 1)
        .edit_player(0, |p| p.power_charge = 27_000)
        .state();
    let config = ReplayConfig {
        co_powers_enabled: false,
        ..ReplayConfig::default()
    };
    let action = Action::PowerActivation {
        player: PlayerId(0),
        power: PowerKind::Power,
    };

    assert!(advance(&rules, &config, &state, &action).is_err());
}

/// Eliminated players are skipped; the day advances only on wrap-around.
#[test]
fn end_turn_skips_eliminated_players() {
    let rules = rules();
    let mut eliminated = player(1, None);
    eliminated.eliminated = true;
    let state = Scenario::new(4, 1)
        .players(vec![player(0, None), eliminated, player(2, None)])
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), HQ, Some(2))
        .state();

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    assert_eq!(next.phase, MatchPhase::TurnActive { player: PlayerId(2) });
    assert_eq!(next.turn, 1);
    assert_eq!(next.day, 1);

    let wrapped = advance(&rules, &config(), &next, &Action::EndTurn).expect("end turn");
    assert_eq!(wrapped.phase, MatchPhase::TurnActive { player: PlayerId(0) });
    assert_eq!(wrapped.turn, 2);
    assert_eq!(wrapped.day, 2);
}

/// A player who ends its turn with no units and no headquarters is
/// eliminated and the remaining two keep rotating without it.
#[test]
fn player_left_with_nothing_is_eliminated_at_turn_end() {
    let rules = rules();
    let state = Scenario::new(5, 1)
        .players(vec![player(0, None), player(1, None), player(2, None)])
        .building(pos(0, 0), CITY, Some(0))
        .building(pos(2, 0), HQ, Some(1))
        .building(pos(4, 0), HQ, Some(2))
        .state();
    assert!(!state.player(PlayerId(0)).unwrap().eliminated);

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    assert!(next.player(PlayerId(0)).unwrap().eliminated);
    assert_eq!(next.phase, MatchPhase::TurnActive { player: PlayerId(1) });
    let city = next.map.get(pos(0, 0)).unwrap().building.as_ref().unwrap();
    assert_eq!(city.owner, None);

    let third = advance(&rules, &config(), &next, &Action::EndTurn).expect("end turn");
    assert_eq!(third.phase, MatchPhase::TurnActive { player: PlayerId(2) });

    let wrapped = advance(&rules, &config(), &third, &Action::EndTurn).expect("end turn");
    assert_eq!(wrapped.phase, MatchPhase::TurnActive { player: PlayerId(1) });
    assert_eq!(wrapped.turn, 3);
    assert_eq!(wrapped.day, 2);
}

#[test]
fn last_player_standing_wins() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), CITY, Some(1))
        .state();

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    assert_eq!(
        next.phase,
        MatchPhase::MatchOver {
            outcome: MatchOutcome::Victory {
                winners: vec![PlayerId(0)]
            }
        }
    );
    // The defeated player's city is released.
    let city = next.map.get(pos(3, 0)).unwrap().building.as_ref().unwrap();
    assert_eq!(city.owner, None);

    let err = advance(&rules, &config(), &next, &Action::EndTurn).unwrap_err();
    assert!(matches!(err, SimError::IllegalAction(_)));
}

#[test]
fn surviving_team_wins_together() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .players(vec![
            player(0, Some(1)),
            player(1, Some(2)),
            player(2, Some(1)),
        ])
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), HQ, Some(2))
        .state();

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    assert_eq!(
        next.phase,
        MatchPhase::MatchOver {
            outcome: MatchOutcome::Victory {
                winners: vec![PlayerId(0), PlayerId(2)]
            }
        }
    );
}

#[test]
fn resignation_of_the_opponent_ends_the_match() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), HQ, Some(1))
        .unit(1, INFANTRY, 1, pos(2, 0))
        .state();

    let next = advance(
        &rules,
        &config(),
        &state,
        &Action::Resign {
            player: PlayerId(1),
        },
    )
    .expect("resign");
    assert!(next.phase.is_over());
    assert!(next.units.is_empty());
    assert!(next.player(PlayerId(1)).unwrap().eliminated);
}

/// The resigning player's turn stays open until its recorded EndTurn.
#[test]
fn active_player_resigning_replays_in_a_three_player_match() {
    let scenario = Scenario::new(5, 1)
        .players(vec![player(0, None), player(1, None), player(2, None)])
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(2, 0), HQ, Some(1))
        .building(pos(4, 0), HQ, Some(2))
        .unit(1, INFANTRY, 0, pos(1, 0))
        .turn(
            0,
            vec![
                Action::Resign {
                    player: PlayerId(0),
                },
                Action::EndTurn,
            ],
        )
        .turn(1, vec![Action::EndTurn])
        .turn(2, vec![Action::EndTurn]);
    let mut session = scenario.session();

    let resigned = session.state_at(0, 1).expect("after resign");
    assert_eq!(resigned.phase, MatchPhase::TurnActive { player: PlayerId(0) });
    assert!(resigned.units.is_empty());

    let second = session.snapshot_at(1).expect("turn 1");
    assert_eq!(second.phase, MatchPhase::TurnActive { player: PlayerId(1) });
    assert!(second.player(PlayerId(0)).unwrap().eliminated);
    let hq = second.map.get(pos(0, 0)).unwrap().building.as_ref().unwrap();
    assert_eq!(hq.owner, None);

    let wrapped = session.snapshot_at(3).expect("turn 3");
    assert_eq!(wrapped.phase, MatchPhase::TurnActive { player: PlayerId(1) });
    assert_eq!(wrapped.day, 2);
}

#[test]
fn aircraft_without_fuel_crash_at_turn_start() {
    let rules = rules();
    let state = Scenario::new(4, 1)
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), HQ, Some(1))
        .unit_with(1, FIGHTER, 1, pos(2, 0), |u| u.fuel = Some(3))
        .state();

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    assert_eq!(next.phase, MatchPhase::TurnActive { player: PlayerId(1) });
    assert!(next.unit(UnitId(1)).is_err());
}

#[test]
fn owned_city_repairs_and_charges_the_owner() {
    let rules = rules();
    let cost = rules.unit_type(INFANTRY).unwrap().cost;
    let state = Scenario::new(4, 1)
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(3, 0), CITY, Some(1))
        .unit_with(1, INFANTRY, 1, pos(3, 0), |u| u.hp = 55)
        .edit_player(1, |p| p.funds = 0)
        .state();

    let next = advance(&rules, &config(), &state, &Action::EndTurn).expect("end turn");
    // Income for the city arrives first, then two health is repaired.
    let p1 = next.player(PlayerId(1)).unwrap();
    assert_eq!(p1.funds, 1000 - cost * 2 / 10);
    assert_eq!(next.unit(UnitId(1)).unwrap().hp, 75);
}

#[test]
fn weather_change_persists() {
    let rules = rules();
    let state = Scenario::new(2, 1).state();
    let next = advance(
        &rules,
        &config(),
        &state,
        &Action::WeatherChange {
            weather: warroom_protocol::Weather::Rain,
        },
    )
    .unwrap();
    let next = advance(&rules, &config(), &next, &Action::EndTurn).unwrap();
    assert_eq!(next.weather, warroom_protocol::Weather::Rain);
}
