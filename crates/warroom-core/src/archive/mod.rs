//! Match archive reading and writing
//!
//! An archive is a zip container holding one JSON payload, `match.json`, or
//! its gzip-compressed form `match.json.gz`. The payload's `version` field
//! selects the decoder.

mod v1;
mod v2;

use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};

use flate2::read::GzDecoder;
use serde::Deserialize;
use thiserror::Error;
use warroom_protocol::{LogError, ReplayDocument, CURRENT_REPLAY_VERSION};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const PAYLOAD_NAME: &str = "match.json";
pub const COMPRESSED_PAYLOAD_NAME: &str = "match.json.gz";

const MAX_HP: i32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveErrorKind {
    /// The bytes are not a readable archive of a supported version.
    Format,
    /// A supported archive whose content is structurally inconsistent.
    Corrupt,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a readable zip container: {0}")]
    Container(#[from] ZipError),
    #[error("archive contains neither {PAYLOAD_NAME} nor {COMPRESSED_PAYLOAD_NAME}")]
    MissingPayload,
    #[error("io error reading archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload has no version tag")]
    MissingVersion,
    #[error("unsupported replay version {0}")]
    UnsupportedVersion(u64),
    #[error("corrupt replay: {0}")]
    Corrupt(String),
}

impl ArchiveError {
    pub fn kind(&self) -> ArchiveErrorKind {
        match self {
            ArchiveError::Corrupt(_) => ArchiveErrorKind::Corrupt,
            _ => ArchiveErrorKind::Format,
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ArchiveError::Corrupt(reason.into())
    }
}

impl From<LogError> for ArchiveError {
    fn from(err: LogError) -> Self {
        ArchiveError::Corrupt(err.to_string())
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u64>,
}

/// Decode an archive into its replay document. Performs structural checks
/// only; rule legality is left to the simulator.
pub fn parse_archive(bytes: &[u8]) -> Result<ReplayDocument, ArchiveError> {
    let payload = read_payload(bytes)?;
    let document = parse_payload(&payload)?;
    tracing::info!(
        match_id = document.info.id,
        version = document.source_version,
        players = document.initial.players.len(),
        actions = document.log.len(),
        "Parsed match archive"
    );
    Ok(document)
}

/// Decode a bare JSON payload, as found inside an archive.
pub fn parse_payload(payload: &[u8]) -> Result<ReplayDocument, ArchiveError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    let probe = VersionProbe::deserialize(&value)?;
    let document = match probe.version {
        Some(1) => v1::decode(value)?,
        Some(2) => v2::decode(value)?,
        Some(other) => return Err(ArchiveError::UnsupportedVersion(other)),
        None => return Err(ArchiveError::MissingVersion),
    };
    validate(&document)?;
    Ok(document)
}

/// Encode `document` as a current-version archive.
pub fn write_archive(document: &ReplayDocument) -> Result<Vec<u8>, ArchiveError> {
    let payload = serde_json::to_vec_pretty(&v2::encode(document))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(PAYLOAD_NAME, options)?;
    writer.write_all(&payload)?;
    let cursor = writer.finish()?;
    tracing::debug!(
        version = CURRENT_REPLAY_VERSION,
        bytes = cursor.get_ref().len(),
        "Wrote match archive"
    );
    Ok(cursor.into_inner())
}

fn read_payload(bytes: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut payload = Vec::new();

    match archive.by_name(PAYLOAD_NAME) {
        Ok(mut file) => {
            file.read_to_end(&mut payload)?;
            return Ok(payload);
        }
        Err(ZipError::FileNotFound) => {}
        Err(err) => return Err(err.into()),
    }

    // Bound to a local so the borrowed zip entry is dropped before `archive`.
    #[allow(clippy::let_and_return)]
    let result = match archive.by_name(COMPRESSED_PAYLOAD_NAME) {
        Ok(file) => {
            GzDecoder::new(file).read_to_end(&mut payload)?;
            Ok(payload)
        }
        Err(ZipError::FileNotFound) => Err(ArchiveError::MissingPayload),
        Err(err) => Err(err.into()),
    };
    result
}

/// Structural consistency shared by every version.
fn validate(document: &ReplayDocument) -> Result<(), ArchiveError> {
    let initial = &document.initial;
    let map = &initial.map;

    let expected = (map.width as usize) * (map.height as usize);
    if map.tiles.len() != expected {
        return Err(ArchiveError::corrupt(format!(
            "map is {}x{} but lists {} tiles",
            map.width,
            map.height,
            map.tiles.len()
        )));
    }

    let mut players = BTreeSet::new();
    for player in &initial.players {
        if !players.insert(player.id) {
            return Err(ArchiveError::corrupt(format!("duplicate player {}", player.id)));
        }
    }
    if players.is_empty() {
        return Err(ArchiveError::corrupt("no players"));
    }

    for tile in &map.tiles {
        if let Some(owner) = tile.building.as_ref().and_then(|b| b.owner) {
            if !players.contains(&owner) {
                return Err(ArchiveError::corrupt(format!(
                    "building owned by unknown player {owner}"
                )));
            }
        }
    }

    let mut unit_ids = BTreeSet::new();
    let mut occupied = BTreeSet::new();
    for unit in &initial.units {
        if !unit_ids.insert(unit.id) {
            return Err(ArchiveError::corrupt(format!("duplicate unit id {}", unit.id)));
        }
        if !players.contains(&unit.owner) {
            return Err(ArchiveError::corrupt(format!(
                "unit {} owned by unknown player {}",
                unit.id, unit.owner
            )));
        }
        if !(1..=MAX_HP).contains(&unit.hp) {
            return Err(ArchiveError::corrupt(format!(
                "unit {} has hp {} outside 1..={MAX_HP}",
                unit.id, unit.hp
            )));
        }
        if let Some(pos) = unit.pos {
            if pos.x < 0 || pos.y < 0 || pos.x >= map.width as i32 || pos.y >= map.height as i32 {
                return Err(ArchiveError::corrupt(format!(
                    "unit {} at {pos} is outside the map",
                    unit.id
                )));
            }
            if !occupied.insert(pos) {
                return Err(ArchiveError::corrupt(format!(
                    "unit {} shares tile {pos}",
                    unit.id
                )));
            }
        }
    }

    for recorded in document.log.actions() {
        if !players.contains(&recorded.player) {
            return Err(ArchiveError::corrupt(format!(
                "turn {} action {} by unknown player {}",
                recorded.turn, recorded.seq, recorded.player
            )));
        }
    }
    Ok(())
}
