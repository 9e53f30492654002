use super::shared::Shared;
use super::snapshot::Snapshot;
use super::update::{Merge, Update};
use crate::equality::ShallowEq;
use crate::error::{BoxError, Result, StoreError};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::warn;

fn upgrade<S, A>(shared: &Weak<Shared<S, A>>) -> Result<Arc<Shared<S, A>>> {
    shared.upgrade().ok_or_else(|| {
        warn!("store handle used after its store was dropped");
        StoreError::Dropped
    })
}

/// Write handle given to a store's configuration function.
///
/// Action closures capture it to update the store later. It holds only a
/// weak link, so actions stored inside the store's own snapshot do not keep
/// the store alive. Using it before construction has finished returns
/// [`StoreError::Uninitialized`]; using it after every [`Store`](crate::Store)
/// clone is gone returns [`StoreError::Dropped`].
pub struct Setter<S, A = ()> {
    shared: Weak<Shared<S, A>>,
}

impl<S, A> Setter<S, A> {
    pub(crate) fn new(shared: Weak<Shared<S, A>>) -> Self {
        Self { shared }
    }
}

impl<S, A> Setter<S, A>
where
    S: Merge + ShallowEq + 'static,
    A: 'static,
{
    /// Apply a partial update. Returns whether the state changed.
    pub fn apply(&self, update: Update<'_, S>) -> Result<bool> {
        upgrade(&self.shared)?.apply(update)
    }

    /// Merge a literal patch.
    pub fn set(&self, patch: S::Patch) -> Result<bool> {
        self.apply(Update::Literal(patch))
    }

    /// Merge a patch computed from the current state.
    pub fn update<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&S) -> S::Patch,
    {
        self.apply(Update::computed(f))
    }

    /// Merge a patch computed by a fallible function. On error the state is
    /// left untouched and the error is returned as [`StoreError::Update`].
    pub fn try_update<F, E>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&S) -> std::result::Result<S::Patch, E>,
        E: Into<BoxError>,
    {
        self.apply(Update::try_computed(f))
    }
}

impl<S, A> Clone for Setter<S, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<S, A> fmt::Debug for Setter<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("live", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Read handle given to a store's configuration function.
pub struct Getter<S, A = ()> {
    shared: Weak<Shared<S, A>>,
}

impl<S, A> Getter<S, A> {
    pub(crate) fn new(shared: Weak<Shared<S, A>>) -> Self {
        Self { shared }
    }
}

impl<S: 'static, A: 'static> Getter<S, A> {
    /// The latest committed snapshot.
    pub fn get(&self) -> Result<Arc<Snapshot<S, A>>> {
        upgrade(&self.shared)?.current()
    }

    /// The state of the latest committed snapshot.
    pub fn state(&self) -> Result<Arc<S>> {
        self.get().map(|snapshot| Arc::clone(snapshot.state_arc()))
    }
}

impl<S, A> Clone for Getter<S, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<S, A> fmt::Debug for Getter<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getter")
            .field("live", &(self.shared.strong_count() > 0))
            .finish()
    }
}
