//! Schema module - Card, configuration and checkpoint types for deck discovery.

mod card;
mod checkpoint;
mod discovery;
mod evolution;
mod generator;

pub use card::*;
pub use checkpoint::*;
pub use discovery::*;
pub use evolution::*;
pub use generator::*;
