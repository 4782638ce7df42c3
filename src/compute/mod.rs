//! Compute module - deck generation, enumeration and search.

mod cancel;
mod deck_space;
mod generator;
mod iterators;
mod uniqueness;

pub mod evolution;

pub use cancel::*;
pub use deck_space::*;
pub use generator::*;
pub use iterators::*;
pub use uniqueness::*;
