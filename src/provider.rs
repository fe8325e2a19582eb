//! The provider: state holder, listener registry and commit loop.

use std::collections::BTreeMap;

use flume::{Receiver, Sender};
use portable_atomic_util::Arc;
use spin::Mutex;

use crate::{State, StoreConfig, Update};

/// A committed state value. Shared, never mutated in place.
pub type Snapshot<T> = Arc<T>;

type ListenerFn<T> = dyn Fn(&Snapshot<T>, &Snapshot<T>) + Send + Sync + 'static;
type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

struct Listener<T>(Box<ListenerFn<T>>);

struct Registry<T> {
    next_id: u64,
    // Ids only grow, so key order is registration order.
    entries: BTreeMap<ListenerId, Arc<Listener<T>>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }

    fn insert(&mut self, listener: Box<ListenerFn<T>>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Arc::new(Listener(listener)));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.entries.contains_key(&id)
    }

    fn snapshot(&self) -> Vec<(ListenerId, Arc<Listener<T>>)> {
        self.entries
            .iter()
            .map(|(id, listener)| (*id, listener.clone()))
            .collect()
    }
}

enum Lifecycle<T> {
    Active {
        state: Snapshot<T>,
        registry: Registry<T>,
    },
    Destroyed {
        last: Snapshot<T>,
    },
}

struct Job<T: State> {
    update: Update<T>,
    callback: Option<Callback>,
}

struct ProviderInner<T: State> {
    label: &'static str,
    config: StoreConfig,
    lifecycle: Mutex<Lifecycle<T>>,
    queue_tx: Sender<Job<T>>,
    queue_rx: Receiver<Job<T>>,
    flushing: Mutex<bool>,
}

/// Marks the commit loop as running; cleared on drop.
///
/// When dropped while unwinding out of a panicking listener or updater, the
/// writes still queued behind the failed one are discarded so they cannot
/// surface in a later, unrelated commit.
struct FlushGuard<'a, T: State> {
    flag: &'a Mutex<bool>,
    queue: &'a Receiver<Job<T>>,
    label: &'static str,
}

impl<'a, T: State> FlushGuard<'a, T> {
    fn acquire(inner: &'a ProviderInner<T>) -> Option<Self> {
        let mut flushing = inner.flushing.lock();
        if *flushing {
            return None;
        }
        *flushing = true;
        Some(Self {
            flag: &inner.flushing,
            queue: &inner.queue_rx,
            label: inner.label,
        })
    }
}

impl<T: State> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let dropped = self.queue.drain().count();
            if dropped > 0 {
                tracing::warn!(
                    store = self.label,
                    dropped_updates = dropped,
                    "queued updates discarded after a panic"
                );
            }
        }
        *self.flag.lock() = false;
    }
}

/// The single source of truth for one mounted scope.
///
/// A provider owns the current [`Snapshot`] and the registry of listeners.
/// Every write goes through [`set_state`](Self::set_state), which:
/// 1. Resolves the [`Update`] against the previous snapshot
/// 2. Commits the next snapshot
/// 3. Calls every registered listener with `(prev, next)` in registration order
/// 4. Runs the completion callback, if any
///
/// Writes are applied strictly in call order. A write issued from inside a
/// listener or callback is queued and committed once the current write has
/// finished notifying.
///
/// A panic in a listener or updater propagates to the writer. The commit in
/// progress stays applied and writes queued behind it are discarded.
///
/// `Provider` is a cheap handle; clones refer to the same instance.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use scoped_store::{Context, Store, Update};
///
/// let store = Store::new(BTreeMap::from([("counter", 10)]));
/// let scope = store.provide(&Context::root());
/// let provider = scope.provider();
///
/// let _subscription = provider.subscribe(|prev, next| {
///     assert_eq!(prev["counter"] + 1, next["counter"]);
/// });
///
/// provider.set_state(Update::merge(BTreeMap::from([("counter", 11)])));
/// assert_eq!(provider.get_state()["counter"], 11);
/// ```
pub struct Provider<T: State> {
    inner: Arc<ProviderInner<T>>,
}

impl<T: State> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: State> core::fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Provider")
            .field("store", &self.inner.label)
            .field("active", &self.is_active())
            .field("listeners", &self.subscribe_count())
            .finish()
    }
}

impl<T: State> Provider<T> {
    pub(crate) fn mount(initial: T, config: StoreConfig) -> Self {
        let (queue_tx, queue_rx) = flume::unbounded();
        let label = config.label_or::<T>();
        tracing::debug!(store = label, "provider mounted");

        Self {
            inner: Arc::new(ProviderInner {
                label,
                config,
                lifecycle: Mutex::new(Lifecycle::Active {
                    state: Arc::new(initial),
                    registry: Registry::new(),
                }),
                queue_tx,
                queue_rx,
                flushing: Mutex::new(false),
            }),
        }
    }

    /// The current snapshot. After teardown, the last committed one.
    pub fn get_state(&self) -> Snapshot<T> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Active { state, .. } => state.clone(),
            Lifecycle::Destroyed { last } => last.clone(),
        }
    }

    /// Submit a write. A no-op once the provider has been torn down.
    pub fn set_state(&self, update: impl Into<Update<T>>) {
        self.enqueue(update.into(), None);
    }

    /// Submit a write and run `callback` after every listener has seen it.
    pub fn set_state_with<F>(&self, update: impl Into<Update<T>>, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(update.into(), Some(Box::new(callback)));
    }

    /// Register a listener called with `(prev, next)` after every commit.
    ///
    /// The returned [`Subscription`] removes exactly this listener when
    /// unsubscribed or dropped. Subscribing to a torn-down provider returns an
    /// inert subscription.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<T>
    where
        F: Fn(&Snapshot<T>, &Snapshot<T>) + Send + Sync + 'static,
    {
        let mut lifecycle = self.inner.lifecycle.lock();
        match &mut *lifecycle {
            Lifecycle::Active { registry, .. } => {
                let id = registry.insert(Box::new(listener));
                tracing::trace!(store = self.inner.label, listener = id.0, "subscribed");
                Subscription {
                    provider: self.clone(),
                    id: Some(id),
                }
            }
            Lifecycle::Destroyed { .. } => {
                tracing::debug!(store = self.inner.label, "subscribe after teardown ignored");
                Subscription {
                    provider: self.clone(),
                    id: None,
                }
            }
        }
    }

    /// Number of registered listeners.
    pub fn subscribe_count(&self) -> usize {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Active { registry, .. } => registry.entries.len(),
            Lifecycle::Destroyed { .. } => 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(&*self.inner.lifecycle.lock(), Lifecycle::Active { .. })
    }

    /// Whether two handles refer to the same provider instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Clear the registry and stop accepting writes.
    ///
    /// Called when the owning [`Scope`](crate::Scope) is dropped. Idempotent.
    pub fn teardown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock();
        let (last, listeners) = match &*lifecycle {
            Lifecycle::Active { state, registry } => (state.clone(), registry.entries.len()),
            Lifecycle::Destroyed { .. } => return,
        };
        *lifecycle = Lifecycle::Destroyed { last };
        drop(lifecycle);

        let dropped = self.inner.queue_rx.drain().count();
        tracing::debug!(
            store = self.inner.label,
            listeners,
            dropped_updates = dropped,
            "provider torn down"
        );
    }

    fn unsubscribe(&self, id: ListenerId) {
        if let Lifecycle::Active { registry, .. } = &mut *self.inner.lifecycle.lock() {
            if registry.remove(id) {
                tracing::trace!(store = self.inner.label, listener = id.0, "unsubscribed");
            }
        }
    }

    fn is_subscribed(&self, id: ListenerId) -> bool {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Active { registry, .. } => registry.contains(id),
            Lifecycle::Destroyed { .. } => false,
        }
    }

    fn current(&self) -> Option<Snapshot<T>> {
        match &*self.inner.lifecycle.lock() {
            Lifecycle::Active { state, .. } => Some(state.clone()),
            Lifecycle::Destroyed { .. } => None,
        }
    }

    fn enqueue(&self, update: Update<T>, callback: Option<Callback>) {
        if !self.is_active() {
            tracing::debug!(store = self.inner.label, "update after teardown ignored");
            return;
        }

        // The receiver lives as long as the sender, so this cannot fail.
        self.inner.queue_tx.send(Job { update, callback }).ok();
        self.flush();
    }

    /// Drain the queue unless an outer call on the stack is already doing so.
    fn flush(&self) {
        loop {
            let Some(guard) = FlushGuard::acquire(&self.inner) else {
                return;
            };

            while let Ok(job) = self.inner.queue_rx.try_recv() {
                self.step(job);
            }

            drop(guard);

            // Another thread may have queued after the drain but before release.
            if self.inner.queue_rx.is_empty() {
                return;
            }
        }
    }

    fn step(&self, job: Job<T>) {
        let Some(prev) = self.current() else {
            tracing::debug!(store = self.inner.label, "queued update dropped after teardown");
            return;
        };

        let next = match job.update.resolve(&prev) {
            Some(next) => Arc::new(next),
            None if self.inner.config.notify_on_noop => prev.clone(),
            None => {
                tracing::trace!(store = self.inner.label, "updater declined, listeners skipped");
                if let Some(callback) = job.callback {
                    callback();
                }
                return;
            }
        };

        let listeners = {
            let mut lifecycle = self.inner.lifecycle.lock();
            match &mut *lifecycle {
                Lifecycle::Active { state, registry } => {
                    *state = next.clone();
                    registry.snapshot()
                }
                Lifecycle::Destroyed { .. } => return,
            }
        };

        tracing::trace!(
            store = self.inner.label,
            listeners = listeners.len(),
            "state committed"
        );

        for (id, listener) in listeners {
            // Skip listeners detached by an earlier listener in this pass.
            if self.is_subscribed(id) {
                (listener.0)(&prev, &next);
            }
        }

        if let Some(callback) = job.callback {
            callback();
        }
    }
}

/// Handle returned by [`Provider::subscribe`].
///
/// Dropping it removes the listener.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription<T: State> {
    provider: Provider<T>,
    id: Option<ListenerId>,
}

impl<T: State> Subscription<T> {
    /// Remove the listener. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            self.provider.unsubscribe(id);
        }
    }

    /// Whether the listener is still registered with a live provider.
    pub fn is_active(&self) -> bool {
        self.id.is_some_and(|id| self.provider.is_subscribed(id))
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }
}

impl<T: State> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
