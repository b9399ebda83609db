//! Replay configuration

use serde::{Deserialize, Serialize};

use crate::fog::{FogOptions, ViewMode};

/// Viewer settings consumed by a replay session. The host owns persistence;
/// this type only describes the values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Restrict fog to what the observer knew during the match
    pub only_show_known_info: bool,
    /// Allow recorded power activations
    pub co_powers_enabled: bool,
    /// Cache every Nth turn-start snapshot
    pub snapshot_density: u32,
    /// Maximum cached snapshots before eviction
    pub snapshot_capacity: usize,
    /// Display-only: auto-skip end-of-turn screens
    pub skip_end_turn: bool,
    /// Display-only: animate unit movement
    pub movement_animations: bool,
    /// Display-only: render weather effects
    pub show_weather: bool,
    /// Display-only: draw movement arrows
    pub show_movement_arrows: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            only_show_known_info: true,
            co_powers_enabled: true,
            snapshot_density: 1,
            snapshot_capacity: 256,
            skip_end_turn: false,
            movement_animations: true,
            show_weather: true,
            show_movement_arrows: true,
        }
    }
}

impl ReplayConfig {
    pub fn view_mode(&self) -> ViewMode {
        if self.only_show_known_info {
            ViewMode::Participant
        } else {
            ViewMode::Omniscient
        }
    }

    pub fn fog_options(&self) -> FogOptions {
        FogOptions {
            view: self.view_mode(),
        }
    }
}
