//! Value types shared by the Warroom replay core and its callers.

mod action;
mod grid;
mod ids;
mod replay;
mod snapshot;
mod types;
mod wire;

pub use crate::action::*;
pub use crate::grid::*;
pub use crate::ids::*;
pub use crate::replay::*;
pub use crate::snapshot::*;
pub use crate::types::*;
pub use crate::wire::*;
