//! Update descriptors submitted to a provider.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// State that can absorb a partial value, one level deep.
///
/// Keys present in the patch overwrite the matching keys of the state; nested
/// values are replaced, never merged recursively.
pub trait Merge: Clone {
    /// Partial form of the state.
    type Patch: Send + 'static;

    fn merge(&mut self, patch: Self::Patch);
}

impl<K: Ord + Clone + Send + 'static, V: Clone + Send + 'static> Merge for BTreeMap<K, V> {
    type Patch = BTreeMap<K, V>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

impl<K, V, S> Merge for HashMap<K, V, S>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    S: BuildHasher + Clone + Send + 'static,
{
    type Patch = HashMap<K, V, S>;

    fn merge(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }
}

/// State a provider can hold: mergeable and shareable across threads.
pub trait State: Merge + Send + Sync + 'static {}

impl<T: Merge + Send + Sync + 'static> State for T {}

/// A literal next value: partial or whole.
pub enum Change<T: Merge> {
    /// Shallow-merge the patch into the current state.
    Merge(T::Patch),
    /// Replace the state wholesale.
    Replace(T),
}

impl<T: Merge> Change<T> {
    pub(crate) fn apply(self, prev: &T) -> T {
        match self {
            Change::Merge(patch) => {
                let mut next = prev.clone();
                next.merge(patch);
                next
            }
            Change::Replace(next) => next,
        }
    }
}

type Updater<T> = Box<dyn FnOnce(&T) -> Option<Change<T>> + Send + 'static>;

/// Description of a write against a provider.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use scoped_store::{Change, Update};
///
/// type State = BTreeMap<&'static str, i64>;
///
/// // Literal partial value
/// let literal: Update<State> = Update::merge(BTreeMap::from([("counter", 11)]));
///
/// // Functional update computed from the previous snapshot
/// let functional: Update<State> = Update::with(|prev: &State| {
///     let counter = prev.get("counter").copied().unwrap_or_default();
///     Some(Change::Merge(BTreeMap::from([("counter", counter + 10)])))
/// });
///
/// // An updater that declines to change anything
/// let declined: Update<State> = Update::with(|_| None);
/// ```
pub enum Update<T: Merge> {
    /// A literal partial or full value.
    Value(Change<T>),
    /// A function of the previous snapshot. `None` means no change.
    Updater(Updater<T>),
}

impl<T: Merge> Update<T> {
    pub fn merge(patch: T::Patch) -> Self {
        Update::Value(Change::Merge(patch))
    }

    pub fn replace(state: T) -> Self {
        Update::Value(Change::Replace(state))
    }

    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> Option<Change<T>> + Send + 'static,
    {
        Update::Updater(Box::new(f))
    }

    /// Resolve against the previous snapshot. `None` when an updater declined.
    pub(crate) fn resolve(self, prev: &T) -> Option<T> {
        match self {
            Update::Value(change) => Some(change.apply(prev)),
            Update::Updater(f) => f(prev).map(|change| change.apply(prev)),
        }
    }
}

impl<T: Merge> From<Change<T>> for Update<T> {
    fn from(change: Change<T>) -> Self {
        Update::Value(change)
    }
}
