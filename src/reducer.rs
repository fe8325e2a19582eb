//! Reducer layer: actions mapped through a pure function before the update path.

use core::ops::Deref;

use portable_atomic_util::Arc;

use crate::{Change, Context, Result, State, Store, StoreConfig, Update, Updater};

/// A tagged action understood by a reducer.
///
/// [`kind`](Self::kind) is the discriminator, used in log events.
///
/// # Example
///
/// ```rust
/// use scoped_store::Action;
///
/// enum CounterAction {
///     Increment,
///     Decrement,
/// }
///
/// impl Action for CounterAction {
///     fn kind(&self) -> &str {
///         match self {
///             CounterAction::Increment => "increment",
///             CounterAction::Decrement => "decrement",
///         }
///     }
/// }
/// ```
pub trait Action: Send + 'static {
    fn kind(&self) -> &str;
}

struct Reducer<T, A>(Box<dyn Fn(&T, A) -> T + Send + Sync + 'static>);

/// A [`Store`] whose writes go through a reducer.
///
/// Dereferences to the underlying [`Store`], so every read accessor is
/// available unchanged; [`use_dispatch`](Self::use_dispatch) adds the
/// action-based write path.
///
/// The reducer decides what unknown actions do. Returning the state unchanged
/// is the conventional policy; the store never raises on its behalf.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use scoped_store::{Action, Context, ReducerStore};
///
/// struct Add(i64);
///
/// impl Action for Add {
///     fn kind(&self) -> &str {
///         "add"
///     }
/// }
///
/// let store = ReducerStore::new(
///     |state: &BTreeMap<&'static str, i64>, Add(amount)| {
///         let mut next = state.clone();
///         *next.entry("counter").or_default() += amount;
///         next
///     },
///     BTreeMap::from([("counter", 100)]),
/// );
/// let scope = store.provide(&Context::root());
///
/// let dispatch = store.use_dispatch(scope.context()).unwrap();
/// dispatch.dispatch(Add(5));
///
/// assert_eq!(scope.provider().get_state()["counter"], 105);
/// ```
pub struct ReducerStore<T: State, A: Action> {
    store: Store<T>,
    reducer: Arc<Reducer<T, A>>,
}

impl<T: State, A: Action> Clone for ReducerStore<T, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            reducer: self.reducer.clone(),
        }
    }
}

impl<T: State, A: Action> Deref for ReducerStore<T, A> {
    type Target = Store<T>;

    fn deref(&self) -> &Store<T> {
        &self.store
    }
}

impl<T: State, A: Action> ReducerStore<T, A> {
    pub fn new<R>(reducer: R, initial: T) -> Self
    where
        R: Fn(&T, A) -> T + Send + Sync + 'static,
    {
        Self::from_store(reducer, Store::new(initial))
    }

    pub fn lazy<R, F>(reducer: R, factory: F) -> Self
    where
        R: Fn(&T, A) -> T + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_store(reducer, Store::lazy(factory))
    }

    fn from_store<R>(reducer: R, store: Store<T>) -> Self
    where
        R: Fn(&T, A) -> T + Send + Sync + 'static,
    {
        Self {
            store,
            reducer: Arc::new(Reducer(Box::new(reducer))),
        }
    }

    pub fn with_config(self, config: StoreConfig) -> Self {
        Self {
            store: self.store.with_config(config),
            reducer: self.reducer,
        }
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// A dispatch handle for the nearest provider.
    pub fn use_dispatch(&self, cx: &Context) -> Result<Dispatcher<T, A>> {
        Ok(Dispatcher {
            updater: self.store.use_update(cx)?,
            reducer: self.reducer.clone(),
        })
    }
}

/// Dispatch handle returned by [`ReducerStore::use_dispatch`].
///
/// Like [`Updater`], handles over the same provider compare equal.
pub struct Dispatcher<T: State, A: Action> {
    updater: Updater<T>,
    reducer: Arc<Reducer<T, A>>,
}

impl<T: State, A: Action> Clone for Dispatcher<T, A> {
    fn clone(&self) -> Self {
        Self {
            updater: self.updater.clone(),
            reducer: self.reducer.clone(),
        }
    }
}

impl<T: State, A: Action> PartialEq for Dispatcher<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.updater == other.updater && Arc::ptr_eq(&self.reducer, &other.reducer)
    }
}

impl<T: State, A: Action> Eq for Dispatcher<T, A> {}

impl<T: State, A: Action> Dispatcher<T, A> {
    /// Reduce `action` against the state current at commit time.
    pub fn dispatch(&self, action: A) {
        self.updater.update(self.reduce(action));
    }

    /// Like [`dispatch`](Self::dispatch), running `callback` once listeners
    /// have been notified.
    pub fn dispatch_with<F>(&self, action: A, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.updater.update_with(self.reduce(action), callback);
    }

    pub fn updater(&self) -> &Updater<T> {
        &self.updater
    }

    fn reduce(&self, action: A) -> Update<T> {
        tracing::trace!(
            store = self.updater.provider().label(),
            action = action.kind(),
            "dispatch"
        );
        let reducer = self.reducer.clone();
        Update::with(move |prev: &T| Some(Change::Replace((reducer.0)(prev, action))))
    }
}
