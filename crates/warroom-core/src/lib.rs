//! Deterministic replay of recorded matches.
//!
//! Archives decode into a [`ReplayDocument`](warroom_protocol::ReplayDocument);
//! a [`ReplaySession`] re-applies its actions against the loaded [`Ruleset`]
//! to produce turn-start snapshots, optionally on a background [`SeekWorker`].

pub mod archive;
mod cache;
mod combat;
mod config;
mod error;
mod fog;
mod map;
mod movement;
mod power;
mod rules;
mod seek;
mod session;
mod sim;
mod state;
mod turn;
mod unit;

pub use crate::archive::{parse_archive, parse_payload, write_archive, ArchiveError, ArchiveErrorKind};
pub use crate::cache::*;
pub use crate::combat::{compute_strike, damage_formula, select_weapon, Strike, Weapon};
pub use crate::config::*;
pub use crate::error::*;
pub use crate::fog::*;
pub use crate::map::*;
pub use crate::movement::*;
pub use crate::power::{power_cost, star_value};
pub use crate::rules::*;
pub use crate::seek::*;
pub use crate::session::*;
pub use crate::sim::*;
pub use crate::state::*;
pub use crate::turn::begin_match;
pub use crate::unit::*;
