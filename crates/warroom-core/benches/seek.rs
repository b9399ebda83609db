use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use warroom_core::{load_ruleset, ReplayConfig, ReplaySession, RulesSource};
use warroom_protocol::{
    Action, ActionLog, BuildingId, BuildingSnapshot, CoId, CountryId, MapSnapshot, MatchInfo,
    MatchPhase, MatchSnapshot, PlayerId, PlayerSnapshot, Position, RecordedAction,
    ReplayDocument, TerrainId, TileSnapshot, UnitId, UnitSnapshot, UnitTypeId, Weather,
};

// Infantry fuel allows 99 single-tile moves per unit.
const TURNS: u32 = 180;
const SIDE: u32 = 20;

fn player(id: u32) -> PlayerSnapshot {
    PlayerSnapshot {
        id: PlayerId(id),
        name: format!("p{id}"),
        country: CountryId::new(id + 1),
        co: CoId::new(1),
        team: None,
        funds: 0,
        power_charge: 0,
        power_uses: 0,
        active_power: None,
        eliminated: false,
    }
}

fn infantry(id: u32, owner: u32, pos: Position) -> UnitSnapshot {
    UnitSnapshot {
        id: UnitId(id),
        unit_type: UnitTypeId::new(1),
        owner: PlayerId(owner),
        pos: Some(pos),
        hp: 100,
        fuel: None,
        ammo: None,
        moved: false,
        acted: false,
        hidden: false,
        carried_by: None,
    }
}

/// Two armies of infantry shuffling one tile per turn under fog.
fn marching_match() -> ReplayDocument {
    let mut tiles = vec![
        TileSnapshot {
            terrain: TerrainId::new(1),
            building: None,
        };
        (SIDE * SIDE) as usize
    ];
    for (index, owner) in [(0, 0), ((SIDE * SIDE - 1) as usize, 1)] {
        tiles[index].building = Some(BuildingSnapshot {
            id: BuildingId::new(42),
            owner: Some(PlayerId(owner)),
            capture: None,
        });
    }

    let mut units = Vec::new();
    for row in 0..8 {
        units.push(infantry(row + 1, 0, Position::new(2, row as i32 * 2 + 1)));
        units.push(infantry(row + 101, 1, Position::new(16, row as i32 * 2 + 1)));
    }

    let mut actions = Vec::new();
    for turn in 0..TURNS {
        let owner = turn % 2;
        let forward = (turn / 2) % 2 == 0;
        let (base, x) = if owner == 0 { (1, 2) } else { (101, 16) };
        let (from, to) = if forward { (x, x + 1) } else { (x + 1, x) };
        let mut seq = 0;
        for row in 0..8 {
            let y = row as i32 * 2 + 1;
            actions.push(RecordedAction {
                turn,
                day: turn / 2 + 1,
                player: PlayerId(owner),
                seq,
                action: Action::Move {
                    unit: UnitId(base + row),
                    path: vec![Position::new(from, y), Position::new(to, y)],
                },
            });
            seq += 1;
        }
        actions.push(RecordedAction {
            turn,
            day: turn / 2 + 1,
            player: PlayerId(owner),
            seq,
            action: Action::EndTurn,
        });
    }

    ReplayDocument {
        source_version: 2,
        info: MatchInfo {
            id: 1,
            name: "bench".to_string(),
            fog_of_war: true,
            funds_per_building: 1000,
            co_powers: true,
        },
        initial: MatchSnapshot {
            turn: 0,
            day: 1,
            phase: MatchPhase::AwaitingStart,
            weather: Weather::Clear,
            map: MapSnapshot {
                width: SIDE,
                height: SIDE,
                tiles,
            },
            players: vec![player(0), player(1)],
            units,
        },
        log: ActionLog::new(actions).expect("bench log"),
    }
}

fn bench_seek(c: &mut Criterion) {
    let rules = Arc::new(load_ruleset(RulesSource::Embedded).expect("embedded rules"));
    let document = marching_match();

    c.bench_function("seek_cold_to_end", |b| {
        b.iter_batched(
            || {
                ReplaySession::new(Arc::clone(&rules), ReplayConfig::default(), document.clone())
                    .expect("session")
            },
            |mut session| black_box(session.snapshot_at(TURNS).expect("seek")),
            BatchSize::SmallInput,
        )
    });

    let config = ReplayConfig {
        snapshot_density: 10,
        ..ReplayConfig::default()
    };
    let mut warm = ReplaySession::new(Arc::clone(&rules), config, document.clone()).expect("session");
    warm.snapshot_at(TURNS).expect("warm up");
    c.bench_function("seek_sparse_cache_backwards", |b| {
        let mut turn = TURNS;
        b.iter(|| {
            turn = turn.checked_sub(7).unwrap_or(TURNS);
            black_box(warm.snapshot_at(turn).expect("seek"))
        })
    });
}

criterion_group!(benches, bench_seek);
criterion_main!(benches);
