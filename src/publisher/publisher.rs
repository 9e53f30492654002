use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Callback invoked with `(next, prev)` on every published change.
pub type Subscriber<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

/// Unique identifier for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscription<T> {
    id: SubscriptionId,
    callback: Subscriber<T>,
    /// Cleared on removal so an in-flight notify pass skips it.
    active: AtomicBool,
}

struct Registry<T> {
    subscriptions: Mutex<Vec<Arc<Subscription<T>>>>,
    next_id: AtomicU64,
}

/// Type-erased removal, so unsubscribe handles do not carry the payload type.
trait Deregister: Send + Sync {
    fn deregister(&self, id: SubscriptionId) -> bool;
    fn contains(&self, id: SubscriptionId) -> bool;
}

impl<T> Deregister for Registry<T> {
    fn deregister(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.lock();
        match subs.iter().position(|sub| sub.id == id) {
            Some(index) => {
                let sub = subs.remove(index);
                sub.active.store(false, Ordering::Release);
                trace!(subscription = %id, remaining = subs.len(), "subscriber removed");
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.lock().iter().any(|sub| sub.id == id)
    }
}

/// Generic subscribe/notify primitive.
///
/// Subscribers may subscribe or unsubscribe (themselves or others) while a
/// notification is being delivered. Each pass works on the registrations
/// that were active when it started: a subscriber removed mid-pass is
/// skipped if not yet reached, one added mid-pass waits for the next pass,
/// and nobody is invoked twice.
///
/// # Examples
///
/// ```
/// use snapstore::Publisher;
/// use std::sync::{Arc, atomic::{AtomicI32, Ordering}};
///
/// let publisher = Publisher::<i32>::new();
/// let seen = Arc::new(AtomicI32::new(0));
/// let seen_clone = seen.clone();
///
/// let unsubscribe = publisher.subscribe(move |next, _prev| {
///     seen_clone.store(*next, Ordering::SeqCst);
/// });
///
/// publisher.notify(&4, &2);
/// assert_eq!(seen.load(Ordering::SeqCst), 4);
///
/// assert!(unsubscribe.unsubscribe());
/// publisher.notify(&5, &4);
/// assert_eq!(seen.load(Ordering::SeqCst), 4);
/// ```
pub struct Publisher<T> {
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Publisher<T> {
    /// Create a publisher with no subscribers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscriptions: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a callback.
    ///
    /// Every call creates a new registration, even for equivalent closures.
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.insert(Arc::new(callback))
    }

    /// Register a shared callback with set semantics.
    ///
    /// Registering the same `Arc` again does not add a second registration;
    /// the returned handle removes the existing one.
    pub fn subscribe_shared(&self, callback: Subscriber<T>) -> Unsubscribe {
        let existing = self
            .registry
            .subscriptions
            .lock()
            .iter()
            .find(|sub| Arc::ptr_eq(&sub.callback, &callback))
            .map(|sub| sub.id);

        match existing {
            Some(id) => {
                trace!(subscription = %id, "subscriber already registered");
                self.handle(id)
            }
            None => self.insert(callback),
        }
    }

    /// Deliver `(next, prev)` to every active subscriber.
    ///
    /// No lock is held while callbacks run. A panicking subscriber aborts
    /// the rest of the pass and the panic reaches the caller.
    pub fn notify(&self, next: &T, prev: &T) {
        let pass: Vec<Arc<Subscription<T>>> = self.registry.subscriptions.lock().clone();
        trace!(subscribers = pass.len(), "notifying");

        for sub in pass {
            if sub.active.load(Ordering::Acquire) {
                (sub.callback)(next, prev);
            }
        }
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.registry.subscriptions.lock().len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.registry.subscriptions.lock().is_empty()
    }

    fn insert(&self, callback: Subscriber<T>) -> Unsubscribe {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subs = self.registry.subscriptions.lock();
        subs.push(Arc::new(Subscription {
            id,
            callback,
            active: AtomicBool::new(true),
        }));
        trace!(subscription = %id, total = subs.len(), "subscriber added");
        drop(subs);

        self.handle(id)
    }

    fn handle(&self, id: SubscriptionId) -> Unsubscribe {
        let registry: Arc<dyn Deregister> = self.registry.clone();
        Unsubscribe {
            id,
            registry: Arc::downgrade(&registry),
        }
    }
}

impl<T: 'static> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.registry.subscriptions.lock().len())
            .finish()
    }
}

/// Handle that removes one registration.
///
/// The handle does not keep the publisher alive. Calling
/// [`unsubscribe`](Self::unsubscribe) more than once is harmless.
#[derive(Clone)]
pub struct Unsubscribe {
    id: SubscriptionId,
    registry: Weak<dyn Deregister>,
}

impl Unsubscribe {
    /// Remove the registration.
    ///
    /// Returns true only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.deregister(self.id))
    }

    /// Returns true while the registration is still active.
    pub fn is_subscribed(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }

    /// The registration this handle removes.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Convert into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: self }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

/// RAII guard for a registration.
#[derive(Debug)]
pub struct SubscriptionGuard {
    handle: Unsubscribe,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.handle.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct TestState {
        counts: i32,
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&TestState, &TestState) + Send + Sync) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        (calls, move |_: &TestState, _: &TestState| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn notifies_subscriber_with_next_and_prev() {
        let publisher = Publisher::<TestState>::new();
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let seen_clone = seen.clone();

        publisher.subscribe(move |next, prev| {
            seen_clone.lock().push((next.clone(), prev.clone()));
        });
        publisher.notify(&TestState { counts: 4 }, &TestState { counts: 2 });

        assert_eq!(
            *seen.lock(),
            vec![(TestState { counts: 4 }, TestState { counts: 2 })]
        );
    }

    #[test]
    fn notifies_multiple_subscribers() {
        let publisher = Publisher::<TestState>::new();
        let counters: Vec<_> = (0..7)
            .map(|_| {
                let (calls, sub) = counter();
                publisher.subscribe(sub);
                calls
            })
            .collect();

        publisher.notify(&TestState { counts: 4 }, &TestState { counts: 2 });

        for calls in counters {
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let publisher = Publisher::<TestState>::new();
        let (calls, sub) = counter();
        let unsubscribe = publisher.subscribe(sub);

        publisher.notify(&TestState { counts: 4 }, &TestState { counts: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(unsubscribe.is_subscribed());
        assert!(unsubscribe.unsubscribe());
        assert!(!unsubscribe.unsubscribe());
        assert!(!unsubscribe.is_subscribed());

        publisher.notify(&TestState { counts: 5 }, &TestState { counts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(publisher.is_empty());
    }

    #[test]
    fn shared_callback_registers_once() {
        let publisher = Publisher::<TestState>::new();
        let (calls, sub) = counter();
        let shared: Subscriber<TestState> = Arc::new(sub);

        let first = publisher.subscribe_shared(shared.clone());
        let second = publisher.subscribe_shared(shared);
        assert_eq!(first.id(), second.id());
        assert_eq!(publisher.len(), 1);

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn plain_subscribe_allows_multiple_registrations() {
        let publisher = Publisher::<TestState>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let calls = calls.clone();
            publisher.subscribe(move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn guard_unsubscribes_on_drop() {
        let publisher = Publisher::<TestState>::new();
        let (calls, sub) = counter();
        let guard = publisher.subscribe(sub).into_guard();

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });
        drop(guard);
        publisher.notify(&TestState { counts: 2 }, &TestState { counts: 1 });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribing_a_later_subscriber_mid_pass_skips_it() {
        let publisher = Publisher::<TestState>::new();
        let victim_handle: Arc<PlMutex<Option<Unsubscribe>>> = Arc::new(PlMutex::new(None));

        let handle_clone = victim_handle.clone();
        publisher.subscribe(move |_, _| {
            if let Some(handle) = handle_clone.lock().as_ref() {
                handle.unsubscribe();
            }
        });

        let (victim_calls, victim) = counter();
        *victim_handle.lock() = Some(publisher.subscribe(victim));

        let (bystander_calls, bystander) = counter();
        publisher.subscribe(bystander);

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });

        assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bystander_calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.len(), 2);
    }

    #[test]
    fn subscribing_mid_pass_waits_for_next_pass() {
        let publisher = Publisher::<TestState>::new();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let added = Arc::new(AtomicBool::new(false));

        let publisher_clone = publisher.clone();
        let late_calls_clone = late_calls.clone();
        publisher.subscribe(move |_, _| {
            if !added.swap(true, Ordering::SeqCst) {
                let late_calls = late_calls_clone.clone();
                publisher_clone.subscribe(move |_, _| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        publisher.notify(&TestState { counts: 2 }, &TestState { counts: 1 });
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn self_unsubscribe_during_notify() {
        let publisher = Publisher::<TestState>::new();
        let own_handle: Arc<PlMutex<Option<Unsubscribe>>> = Arc::new(PlMutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let handle_clone = own_handle.clone();
        let calls_clone = calls.clone();
        let handle = publisher.subscribe(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = handle_clone.lock().as_ref() {
                handle.unsubscribe();
            }
        });
        *own_handle.lock() = Some(handle);

        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });
        publisher.notify(&TestState { counts: 2 }, &TestState { counts: 1 });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(publisher.is_empty());
    }

    #[test]
    fn late_subscriber_gets_no_history() {
        let publisher = Publisher::<TestState>::new();
        publisher.notify(&TestState { counts: 1 }, &TestState { counts: 0 });

        let (calls, sub) = counter();
        publisher.subscribe(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handle_outliving_publisher_is_harmless() {
        let publisher = Publisher::<TestState>::new();
        let (_, sub) = counter();
        let unsubscribe = publisher.subscribe(sub);
        drop(publisher);

        assert!(!unsubscribe.unsubscribe());
        assert!(!unsubscribe.is_subscribed());
    }
}
