//! Observable state containers.
//!
//! A [`Store`] owns the current [`Snapshot`], merges partial updates into
//! new snapshots, suppresses updates that change nothing, and notifies
//! subscribers of every effective change.

mod handle;
mod options;
mod shared;
mod snapshot;
mod store;
mod update;

pub use handle::{Getter, Setter};
pub use options::StoreOptions;
pub use snapshot::{Parts, Snapshot};
pub use store::Store;
pub use update::{Merge, Update};
