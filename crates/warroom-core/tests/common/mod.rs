//! Shared builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use warroom_core::{
    load_ruleset, GameState, ReplayConfig, ReplaySession, Ruleset, RulesSource,
};
use warroom_protocol::{
    Action, ActionLog, BuildingId, BuildingSnapshot, CoId, CountryId, MapSnapshot, MatchInfo,
    MatchPhase, MatchSnapshot, PlayerId, PlayerSnapshot, Position, RecordedAction,
    ReplayDocument, TerrainId, TileSnapshot, UnitId, UnitSnapshot, UnitTypeId, Weather,
};

pub const PLAIN: TerrainId = TerrainId::new(1);
pub const MOUNTAIN: TerrainId = TerrainId::new(2);
pub const WOOD: TerrainId = TerrainId::new(3);
pub const SEA: TerrainId = TerrainId::new(28);

pub const CITY: BuildingId = BuildingId::new(34);
pub const BASE: BuildingId = BuildingId::new(35);
pub const HQ: BuildingId = BuildingId::new(42);

pub const INFANTRY: UnitTypeId = UnitTypeId::new(1);
pub const TANK: UnitTypeId = UnitTypeId::new(4);
pub const APC: UnitTypeId = UnitTypeId::new(6);
pub const ARTILLERY: UnitTypeId = UnitTypeId::new(7);
pub const FIGHTER: UnitTypeId = UnitTypeId::new(11);
pub const SUB: UnitTypeId = UnitTypeId::new(19);

pub const ANDY: CoId = CoId::new(1);

pub fn rules() -> Arc<Ruleset> {
    Arc::new(load_ruleset(RulesSource::Embedded).expect("embedded rules"))
}

/// Fluent description of a small match.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub info: MatchInfo,
    pub map: MapSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub units: Vec<UnitSnapshot>,
    pub turns: Vec<(PlayerId, Vec<Action>)>,
    pub weather: Weather,
}

impl Scenario {
    /// A plain map with two Andy players.
    pub fn new(width: u32, height: u32) -> Self {
        let tiles = vec![
            TileSnapshot {
                terrain: PLAIN,
                building: None,
            };
            (width * height) as usize
        ];
        Self {
            info: MatchInfo {
                id: 1,
                name: "test match".to_string(),
                fog_of_war: false,
                funds_per_building: 1000,
                co_powers: true,
            },
            map: MapSnapshot {
                width,
                height,
                tiles,
            },
            players: vec![player(0, None), player(1, None)],
            units: Vec::new(),
            turns: Vec::new(),
            weather: Weather::Clear,
        }
    }

    pub fn fog(mut self, fog: bool) -> Self {
        self.info.fog_of_war = fog;
        self
    }

    pub fn players(mut self, players: Vec<PlayerSnapshot>) -> Self {
        self.players = players;
        self
    }

    pub fn edit_player(mut self, id: u32, edit: impl FnOnce(&mut PlayerSnapshot)) -> Self {
        if let Some(p) = self.players.iter_mut().find(|p| p.id == PlayerId(id)) {
            edit(p);
        }
        self
    }

    pub fn edit_weather(&mut self, weather: Weather) {
        self.weather = weather;
    }

    pub fn terrain(mut self, pos: Position, terrain: TerrainId) -> Self {
        let index = (pos.y as u32 * self.map.width + pos.x as u32) as usize;
        self.map.tiles[index].terrain = terrain;
        self
    }

    pub fn building(mut self, pos: Position, id: BuildingId, owner: Option<u32>) -> Self {
        let index = (pos.y as u32 * self.map.width + pos.x as u32) as usize;
        self.map.tiles[index].building = Some(BuildingSnapshot {
            id,
            owner: owner.map(PlayerId),
            capture: None,
        });
        self
    }

    pub fn unit(self, id: u32, unit_type: UnitTypeId, owner: u32, pos: Position) -> Self {
        self.unit_with(id, unit_type, owner, pos, |_| {})
    }

    pub fn unit_with(
        mut self,
        id: u32,
        unit_type: UnitTypeId,
        owner: u32,
        pos: Position,
        edit: impl FnOnce(&mut UnitSnapshot),
    ) -> Self {
        let mut snapshot = UnitSnapshot {
            id: UnitId(id),
            unit_type,
            owner: PlayerId(owner),
            pos: Some(pos),
            hp: 100,
            fuel: None,
            ammo: None,
            moved: false,
            acted: false,
            hidden: false,
            carried_by: None,
        };
        edit(&mut snapshot);
        self.units.push(snapshot);
        self
    }

    pub fn turn(mut self, player: u32, actions: Vec<Action>) -> Self {
        self.turns.push((PlayerId(player), actions));
        self
    }

    pub fn document(&self) -> ReplayDocument {
        let count = self.players.len().max(1) as u32;
        let mut actions = Vec::new();
        for (turn, (player, recorded)) in self.turns.iter().enumerate() {
            for (seq, action) in recorded.iter().enumerate() {
                actions.push(RecordedAction {
                    turn: turn as u32,
                    day: turn as u32 / count + 1,
                    player: *player,
                    seq: seq as u32,
                    action: action.clone(),
                });
            }
        }
        ReplayDocument {
            source_version: 2,
            info: self.info.clone(),
            initial: MatchSnapshot {
                turn: 0,
                day: 1,
                phase: MatchPhase::AwaitingStart,
                weather: self.weather,
                map: self.map.clone(),
                players: self.players.clone(),
                units: self.units.clone(),
            },
            log: ActionLog::new(actions).expect("valid log"),
        }
    }

    pub fn session_with(&self, rules: Arc<Ruleset>, config: ReplayConfig) -> ReplaySession {
        ReplaySession::new(rules, config, self.document()).expect("session")
    }

    pub fn session(&self) -> ReplaySession {
        self.session_with(rules(), ReplayConfig::default())
    }

    /// The state at the start of the first turn.
    pub fn state(&self) -> GameState {
        let session = self.session();
        (**session.initial_state()).clone()
    }
}

pub fn player(id: u32, team: Option<u32>) -> PlayerSnapshot {
    PlayerSnapshot {
        id: PlayerId(id),
        name: format!("player {id}"),
        country: CountryId::new(id % 5 + 1),
        co: ANDY,
        team,
        funds: 0,
        power_charge: 0,
        power_uses: 0,
        active_power: None,
        eliminated: false,
    }
}

pub fn pos(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

pub fn mv(unit: u32, path: &[(i32, i32)]) -> Action {
    Action::Move {
        unit: UnitId(unit),
        path: path.iter().map(|(x, y)| Position::new(*x, *y)).collect(),
    }
}

pub fn attack(attacker: u32, defender: u32) -> Action {
    Action::Attack {
        attacker: UnitId(attacker),
        defender: UnitId(defender),
        attacker_luck: 0,
        defender_luck: 0,
        outcome: None,
    }
}

/// Eight turns on a 6x4 map: both sides capture a city, then skirmish.
pub fn skirmish() -> Scenario {
    Scenario::new(6, 4)
        .building(pos(0, 0), HQ, Some(0))
        .building(pos(5, 3), HQ, Some(1))
        .building(pos(2, 0), CITY, None)
        .building(pos(3, 3), CITY, None)
        .unit(1, INFANTRY, 0, pos(1, 0))
        .unit(2, INFANTRY, 1, pos(4, 3))
        .turn(
            0,
            vec![
                mv(1, &[(1, 0), (2, 0)]),
                Action::Capture { unit: UnitId(1) },
                Action::EndTurn,
            ],
        )
        .turn(
            1,
            vec![
                mv(2, &[(4, 3), (3, 3)]),
                Action::Capture { unit: UnitId(2) },
                Action::EndTurn,
            ],
        )
        .turn(0, vec![Action::Capture { unit: UnitId(1) }, Action::EndTurn])
        .turn(1, vec![Action::Capture { unit: UnitId(2) }, Action::EndTurn])
        .turn(0, vec![mv(1, &[(2, 0), (2, 1)]), Action::EndTurn])
        .turn(1, vec![mv(2, &[(3, 3), (3, 2)]), Action::EndTurn])
        .turn(
            0,
            vec![mv(1, &[(2, 1), (3, 1)]), attack(1, 2), Action::EndTurn],
        )
        .turn(1, vec![Action::EndTurn])
}
