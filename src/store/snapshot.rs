use std::fmt;
use std::sync::Arc;

/// Initial value returned by a store's configuration function.
pub struct Parts<S, A = ()> {
    pub state: S,
    pub actions: A,
}

impl<S> Parts<S> {
    /// A flat store value with no actions.
    pub fn new(state: S) -> Self {
        Self { state, actions: () }
    }
}

impl<S, A> Parts<S, A> {
    pub fn with_actions(state: S, actions: A) -> Self {
        Self { state, actions }
    }
}

/// Immutable value of a store at one point in time.
///
/// `actions` is shared by every snapshot a store produces; only `state` is
/// replaced by updates. `version` counts committed updates since
/// construction.
pub struct Snapshot<S, A = ()> {
    state: Arc<S>,
    actions: Arc<A>,
    version: u64,
}

impl<S, A> Snapshot<S, A> {
    pub(crate) fn initial(parts: Parts<S, A>) -> Self {
        Self {
            state: Arc::new(parts.state),
            actions: Arc::new(parts.actions),
            version: 0,
        }
    }

    /// Next snapshot with a replaced state and the same actions.
    pub(crate) fn succeed(&self, state: S) -> Self {
        Self {
            state: Arc::new(state),
            actions: Arc::clone(&self.actions),
            version: self.version + 1,
        }
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Shared handle to the state, for keeping it past this snapshot.
    #[inline]
    pub fn state_arc(&self) -> &Arc<S> {
        &self.state
    }

    #[inline]
    pub fn actions(&self) -> &A {
        &self.actions
    }

    #[inline]
    pub fn actions_arc(&self) -> &Arc<A> {
        &self.actions
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<S, A> Clone for Snapshot<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            actions: Arc::clone(&self.actions),
            version: self.version,
        }
    }
}

impl<S: fmt::Debug, A> fmt::Debug for Snapshot<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
