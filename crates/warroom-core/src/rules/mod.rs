mod catalog;
mod loader;
mod types;

pub use catalog::*;
pub use loader::*;
pub use types::*;
