use super::snapshot::{Parts, Snapshot};
use super::update::{Merge, Update};
use crate::equality::ShallowEq;
use crate::error::{Result, StoreError};
use crate::publisher::Publisher;
use parking_lot::{ReentrantMutex, RwLock};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, trace};

/// State owned by one store instance and reached by all of its handles.
pub(crate) struct Shared<S, A> {
    pub(crate) label: Cow<'static, str>,
    /// `None` only while the configuration function is running.
    slot: RwLock<Option<Arc<Snapshot<S, A>>>>,
    pub(crate) publisher: Publisher<Snapshot<S, A>>,
    /// Serializes updates through the end of their notification pass.
    /// Reentrant so subscribers may update the same store.
    updating: ReentrantMutex<()>,
}

impl<S: 'static, A: 'static> Shared<S, A> {
    pub(crate) fn new(label: Cow<'static, str>) -> Self {
        Self {
            label,
            slot: RwLock::new(None),
            publisher: Publisher::new(),
            updating: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn initialize(&self, parts: Parts<S, A>) {
        *self.slot.write() = Some(Arc::new(Snapshot::initial(parts)));
    }

    pub(crate) fn current(&self) -> Result<Arc<Snapshot<S, A>>> {
        self.slot.read().clone().ok_or(StoreError::Uninitialized)
    }
}

impl<S, A> Shared<S, A>
where
    S: Merge + ShallowEq + 'static,
    A: 'static,
{
    /// Resolve, merge, compare, commit, then notify.
    ///
    /// Returns `Ok(false)` when the merged state is shallow-equal to the
    /// current one; nothing is committed and nobody is notified.
    pub(crate) fn apply(&self, update: Update<'_, S>) -> Result<bool> {
        let _serial = self.updating.lock();

        let base = self.current()?;
        let patch = update
            .resolve(base.state())
            .map_err(StoreError::Update)?;
        drop(base);

        // Merge onto the latest snapshot: the update function may have
        // committed an update of its own.
        let prev = self.current()?;
        let state = prev.state().merge(patch);
        if state.shallow_eq(prev.state()) {
            trace!(store = %self.label, version = prev.version(), "update left state unchanged");
            return Ok(false);
        }

        let next = Arc::new(prev.succeed(state));
        *self.slot.write() = Some(Arc::clone(&next));
        debug!(
            store = %self.label,
            version = next.version(),
            subscribers = self.publisher.len(),
            "state committed"
        );

        self.publisher.notify(&next, &prev);
        Ok(true)
    }
}
