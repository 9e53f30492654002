use super::handle::{Getter, Setter};
use super::options::StoreOptions;
use super::shared::Shared;
use super::snapshot::{Parts, Snapshot};
use super::update::{Merge, Update};
use crate::equality::ShallowEq;
use crate::error::{BoxError, Result, StoreError};
use crate::publisher::{Subscriber, Unsubscribe};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An observable state container.
///
/// A store holds an immutable [`Snapshot`] made of a `state` and an
/// `actions` value. Updates merge a partial patch into the state, and only
/// when the result is not shallow-equal to the previous state is a new
/// snapshot committed and every subscriber notified with `(next, prev)`.
/// The `actions` value is shared by every snapshot.
///
/// Clones share the same underlying store.
///
/// # Examples
///
/// ```
/// use snapstore::{shallow_state, Parts, Setter, Store};
///
/// shallow_state! {
///     #[derive(Debug, Clone)]
///     pub struct Counter => CounterPatch {
///         pub counts: i64,
///     }
/// }
///
/// pub struct CounterActions {
///     pub add: Box<dyn Fn(i64) -> snapstore::Result<bool> + Send + Sync>,
/// }
///
/// let store = Store::create(|set: Setter<Counter, CounterActions>, _get| {
///     Parts::with_actions(
///         Counter { counts: 2 },
///         CounterActions {
///             add: Box::new(move |by: i64| {
///                 set.update(|prev| CounterPatch::default().counts(prev.counts + by))
///             }),
///         },
///     )
/// });
///
/// (store.get_store().actions().add)(6).unwrap();
/// (store.get_store().actions().add)(6).unwrap();
/// assert_eq!(store.get_state().counts, 14);
/// ```
pub struct Store<S, A = ()> {
    shared: Arc<Shared<S, A>>,
}

impl<S> Store<S>
where
    S: Merge + ShallowEq + 'static,
{
    /// Create a flat store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self::create(|_, _| Parts::new(initial))
    }

    /// Create a flat store whose initial state may capture the setter.
    pub fn create_flat<F>(configure: F) -> Self
    where
        F: FnOnce(Setter<S>) -> S,
    {
        Self::create(|set, _| Parts::new(configure(set)))
    }
}

impl<S, A> Store<S, A>
where
    S: Merge + ShallowEq + 'static,
    A: 'static,
{
    /// Create a store from a configuration function.
    ///
    /// `configure` runs exactly once, before this returns. The handles it
    /// receives work once construction has finished, so actions built from
    /// them may be called on any snapshot.
    pub fn create<F>(configure: F) -> Self
    where
        F: FnOnce(Setter<S, A>, Getter<S, A>) -> Parts<S, A>,
    {
        Self::create_with(StoreOptions::default(), configure)
    }

    pub fn create_with<F>(options: StoreOptions, configure: F) -> Self
    where
        F: FnOnce(Setter<S, A>, Getter<S, A>) -> Parts<S, A>,
    {
        match Self::build(options, |set, get| Ok::<_, Infallible>(configure(set, get))) {
            Ok(store) => store,
            Err(never) => match never {},
        }
    }

    /// Create a store from a fallible configuration function.
    ///
    /// If `configure` fails no store is produced and the handles it was
    /// given stop working.
    pub fn try_create<F, E>(configure: F) -> Result<Self>
    where
        F: FnOnce(Setter<S, A>, Getter<S, A>) -> std::result::Result<Parts<S, A>, E>,
        E: Into<BoxError>,
    {
        Self::try_create_with(StoreOptions::default(), configure)
    }

    pub fn try_create_with<F, E>(options: StoreOptions, configure: F) -> Result<Self>
    where
        F: FnOnce(Setter<S, A>, Getter<S, A>) -> std::result::Result<Parts<S, A>, E>,
        E: Into<BoxError>,
    {
        Self::build(options, |set, get| {
            configure(set, get).map_err(|err| StoreError::Configure(err.into()))
        })
    }

    fn build<F, E>(options: StoreOptions, configure: F) -> std::result::Result<Self, E>
    where
        F: FnOnce(Setter<S, A>, Getter<S, A>) -> std::result::Result<Parts<S, A>, E>,
    {
        let shared = Arc::new(Shared::new(options.into_label()));
        let weak = Arc::downgrade(&shared);

        let parts = configure(Setter::new(weak.clone()), Getter::new(weak))?;
        shared.initialize(parts);
        debug!(store = %shared.label, "store created");

        Ok(Self { shared })
    }

    /// The latest committed snapshot.
    pub fn get_store(&self) -> Arc<Snapshot<S, A>> {
        match self.shared.current() {
            Ok(snapshot) => snapshot,
            Err(_) => unreachable!(
                "store `{}` has no snapshot after construction",
                self.shared.label
            ),
        }
    }

    /// The state of the latest committed snapshot.
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(self.get_store().state_arc())
    }

    /// Read the current snapshot without keeping it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Snapshot<S, A>) -> R,
    {
        f(&self.get_store())
    }

    /// Apply a partial update. Returns whether the state changed.
    pub fn apply(&self, update: Update<'_, S>) -> Result<bool> {
        self.shared.apply(update)
    }

    /// Merge a literal patch into the state.
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

    /// Merge a patch computed by a fallible function.
    pub fn try_update<F, E>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&S) -> std::result::Result<S::Patch, E>,
        E: Into<BoxError>,
    {
        self.apply(Update::try_computed(f))
    }

    /// Subscribe to state changes.
    ///
    /// The callback receives `(next, prev)` after every effective update;
    /// reading the store from inside it already observes `next`.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&Snapshot<S, A>, &Snapshot<S, A>) + Send + Sync + 'static,
    {
        self.shared.publisher.subscribe(callback)
    }

    /// Subscribe a shared callback; the same `Arc` is only registered once.
    pub fn subscribe_shared(&self, callback: Subscriber<Snapshot<S, A>>) -> Unsubscribe {
        self.shared.publisher.subscribe_shared(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.publisher.len()
    }

    /// A write handle for this store.
    pub fn setter(&self) -> Setter<S, A> {
        Setter::new(Arc::downgrade(&self.shared))
    }

    /// A read handle for this store.
    pub fn getter(&self) -> Getter<S, A> {
        Getter::new(Arc::downgrade(&self.shared))
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, A> fmt::Debug for Store<S, A>
where
    S: 'static,
    A: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.shared.current().ok().map(|snapshot| snapshot.version());
        f.debug_struct("Store")
            .field("label", &self.shared.label)
            .field("version", &version)
            .field("subscribers", &self.shared.publisher.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::shallow_state! {
        #[derive(Debug, Clone, PartialEq)]
        struct AppState => AppPatch {
            count: usize,
            name: String,
        }
    }

    fn app_store() -> Store<AppState> {
        Store::new(AppState {
            count: 0,
            name: "test".to_string(),
        })
    }

    fn counted(store: &Store<AppState>) -> (Arc<AtomicUsize>, Unsubscribe) {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();
        let handle = store.subscribe(move |_next, _prev| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (call_count, handle)
    }

    #[test]
    fn store_get_set() {
        let store = app_store();
        assert_eq!(store.get_state().count, 0);

        let changed = store
            .set(AppPatch::default().count(42).name("updated".to_string()))
            .unwrap();

        assert!(changed);
        assert_eq!(store.get_state().count, 42);
        assert_eq!(store.get_state().name, "updated");
        assert_eq!(store.get_store().version(), 1);
    }

    #[test]
    fn store_update() {
        let store = app_store();

        store
            .update(|state| AppPatch::default().count(state.count + 10))
            .unwrap();

        assert_eq!(store.get_state().count, 10);
        assert_eq!(store.get_state().name, "test");
    }

    #[test]
    fn store_subscribe() {
        let store = app_store();
        let (call_count, _handle) = counted(&store);

        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.update(|s| AppPatch::default().count(s.count + 1)).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.update(|s| AppPatch::default().count(s.count + 1)).unwrap();
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn no_op_update_is_silent() {
        let store = app_store();
        let (call_count, _handle) = counted(&store);
        let before = store.get_store();

        assert!(!store.set(AppPatch::default().count(0)).unwrap());
        assert!(!store.set(AppPatch::default()).unwrap());

        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&before, &store.get_store()));
        assert_eq!(store.get_store().version(), 0);
    }

    #[test]
    fn subscriber_receives_next_and_prev() {
        let store = app_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store.subscribe(move |next, prev| {
            seen_clone
                .lock()
                .push((next.state().count, prev.state().count, next.version()));
        });

        store.set(AppPatch::default().count(4)).unwrap();
        assert_eq!(*seen.lock(), vec![(4, 0, 1)]);
    }

    #[test]
    fn subscriber_reads_committed_state() {
        let store = app_store();
        let observed = Arc::new(AtomicUsize::new(usize::MAX));

        let reader = store.getter();
        let observed_clone = observed.clone();
        store.subscribe(move |_, _| {
            let count = reader.state().map(|state| state.count).unwrap_or(usize::MAX);
            observed_clone.store(count, Ordering::SeqCst);
        });

        store.set(AppPatch::default().count(7)).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn failing_update_leaves_state_untouched() {
        let store = app_store();
        let (call_count, _handle) = counted(&store);

        let err = store
            .try_update(|_| Err::<AppPatch, _>("boom"))
            .unwrap_err();

        assert!(matches!(err, StoreError::Update(_)));
        assert_eq!(err.to_string(), "state update failed: boom");
        assert_eq!(store.get_state().count, 0);
        assert_eq!(store.get_store().version(), 0);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = app_store();
        let (call_count, handle) = counted(&store);

        store.set(AppPatch::default().count(1)).unwrap();
        assert!(handle.unsubscribe());
        store.set(AppPatch::default().count(2)).unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_can_update_same_store() {
        let store = app_store();
        let setter = store.setter();
        store.subscribe(move |next, _| {
            if next.state().count == 1 {
                setter.set(AppPatch::default().name("clamped".to_string())).unwrap();
            }
        });

        store.set(AppPatch::default().count(1)).unwrap();

        assert_eq!(store.get_state().name, "clamped");
        assert_eq!(store.get_store().version(), 2);
    }

    #[test]
    fn clones_share_state() {
        let store = app_store();
        let other = store.clone();
        other.set(AppPatch::default().count(3)).unwrap();
        assert_eq!(store.get_state().count, 3);
    }

    #[test]
    fn labelled_store() {
        let store = Store::create_with(StoreOptions::new().with_label("app"), |_, _| {
            Parts::new(AppState {
                count: 0,
                name: String::new(),
            })
        });
        assert_eq!(store.label(), "app");
        assert!(format!("{store:?}").contains("app"));
        assert_eq!(app_store().label(), "store");
    }
}
