//! Subscribe/notify primitive, independent of any state shape.
//!
//! Stores use a [`Publisher`] to fan changes out to their subscribers, but
//! it works for any payload type.

mod publisher;

pub use publisher::{Publisher, Subscriber, SubscriptionGuard, SubscriptionId, Unsubscribe};
