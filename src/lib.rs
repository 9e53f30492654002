//! # Snapstore
//!
//! A minimal observable state container for Rust.
//!
//! A store is built from a configuration function that receives a
//! [`Setter`] and a [`Getter`] and returns the initial state together with
//! any action closures built on top of them. Afterwards the store offers:
//!
//! - `get_store` / `get_state` - the latest immutable [`Snapshot`]
//! - `set` / `update` - partial updates merged one level deep
//! - `subscribe` - `(next, prev)` notifications for every effective change
//!
//! ## Change detection
//!
//! An update that leaves the state shallow-equal to the previous one (see
//! [`ShallowEq`]) commits nothing and notifies nobody. Shallow equality is
//! one level deep: nested values shared behind `Arc` only count as
//! unchanged when they are the same allocation.
//!
//! ## Building blocks
//!
//! - [`Publisher`] - the subscribe/notify primitive stores are built on
//! - [`shallow_equal`] - the change detector, usable on its own
//! - [`Value`] - dictionary-shaped dynamic state

pub mod equality;
pub mod error;
pub mod publisher;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use equality::{shallow_equal, Identity, ShallowEq};
pub use error::{BoxError, Result, StoreError};
pub use publisher::{Publisher, Subscriber, SubscriptionGuard, SubscriptionId, Unsubscribe};
pub use store::{Getter, Merge, Parts, Setter, Snapshot, Store, StoreOptions, Update};
pub use value::{Object, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(Object::from([("counts".to_string(), Value::from(2))]));
        assert!(store
            .set(Object::from([("counts".to_string(), Value::from(4))]))
            .unwrap());
        assert_eq!(store.get_state()["counts"].as_number(), Some(4.0));
    }
}
