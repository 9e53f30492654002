//! Shallow change detection.
//!
//! Stores only notify subscribers when an update produces a state that is
//! not shallow-equal to the previous one. Equality is one level deep and
//! reference-based for anything shared.

mod identity;
mod shallow;

pub use identity::Identity;
pub use shallow::{shallow_equal, ShallowEq};
