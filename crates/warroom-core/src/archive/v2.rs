use serde::{Deserialize, Serialize};
use warroom_protocol::{
    Action, ActionLog, MapSnapshot, MatchInfo, MatchPhase, MatchSnapshot, PlayerId,
    PlayerSnapshot, RecordedAction, ReplayDocument, UnitSnapshot, Weather,
    CURRENT_REPLAY_VERSION,
};

use super::ArchiveError;

fn first_day() -> u32 {
    1
}

/// Current payload layout: canonical snapshot types plus per-turn action lists.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Payload {
    version: u32,
    #[serde(rename = "match")]
    info: MatchInfo,
    #[serde(default = "first_day")]
    day: u32,
    #[serde(default)]
    weather: Weather,
    players: Vec<PlayerSnapshot>,
    map: MapSnapshot,
    #[serde(default)]
    units: Vec<UnitSnapshot>,
    #[serde(default)]
    turns: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Turn {
    day: u32,
    player: PlayerId,
    actions: Vec<Action>,
}

pub(super) fn decode(value: serde_json::Value) -> Result<ReplayDocument, ArchiveError> {
    let payload: Payload = serde_json::from_value(value)
        .map_err(|e| ArchiveError::corrupt(format!("version 2 payload: {e}")))?;

    let mut actions = Vec::new();
    for (index, turn) in payload.turns.into_iter().enumerate() {
        for (seq, action) in turn.actions.into_iter().enumerate() {
            actions.push(RecordedAction {
                turn: index as u32,
                day: turn.day,
                player: turn.player,
                seq: seq as u32,
                action,
            });
        }
    }

    Ok(ReplayDocument {
        source_version: 2,
        info: payload.info,
        initial: MatchSnapshot {
            turn: 0,
            day: payload.day,
            phase: MatchPhase::AwaitingStart,
            weather: payload.weather,
            map: payload.map,
            players: payload.players,
            units: payload.units,
        },
        log: ActionLog::new(actions)?,
    })
}

pub(super) fn encode(document: &ReplayDocument) -> Payload {
    let turns = (0..document.turn_count())
        .filter_map(|t| document.log.turn(t))
        .filter_map(|actions| {
            let first = actions.first()?;
            Some(Turn {
                day: first.day,
                player: first.player,
                actions: actions.iter().map(|a| a.action.clone()).collect(),
            })
        })
        .collect();

    let initial = &document.initial;
    Payload {
        version: CURRENT_REPLAY_VERSION,
        info: document.info.clone(),
        day: initial.day,
        weather: initial.weather,
        players: initial.players.clone(),
        map: initial.map.clone(),
        units: initial.units.clone(),
        turns,
    }
}
