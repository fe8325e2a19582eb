//! Change feed: provider commits delivered over a channel.

use flume::Receiver;

use crate::{Provider, Snapshot, State, Subscription};

/// One commit as seen by a listener.
pub struct StateChange<T> {
    pub prev: Snapshot<T>,
    pub next: Snapshot<T>,
}

impl<T> Clone for StateChange<T> {
    fn clone(&self) -> Self {
        Self {
            prev: self.prev.clone(),
            next: self.next.clone(),
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for StateChange<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateChange")
            .field("prev", &*self.prev)
            .field("next", &*self.next)
            .finish()
    }
}

/// A listener that queues every commit instead of reacting inline.
///
/// Useful for code outside the component tree (loggers, sync tasks) that
/// wants to consume changes at its own pace. The channel closes when the
/// watch is detached or the provider is torn down, so the feed ends cleanly.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use scoped_store::{Context, Store, Update};
///
/// let store = Store::new(BTreeMap::from([("counter", 0)]));
/// let scope = store.provide(&Context::root());
/// let watch = scope.provider().watch();
///
/// scope.provider().set_state(Update::merge(BTreeMap::from([("counter", 1)])));
///
/// let change = watch.try_next().unwrap();
/// assert_eq!(change.prev["counter"], 0);
/// assert_eq!(change.next["counter"], 1);
/// ```
#[must_use = "dropping a Watch detaches it from its provider"]
pub struct Watch<T: State> {
    receiver: Receiver<StateChange<T>>,
    subscription: Subscription<T>,
}

impl<T: State> Provider<T> {
    /// Queue every subsequent commit into a [`Watch`].
    pub fn watch(&self) -> Watch<T> {
        let (sender, receiver) = flume::unbounded();
        let subscription = self.subscribe(move |prev, next| {
            sender
                .send(StateChange {
                    prev: prev.clone(),
                    next: next.clone(),
                })
                .ok();
        });

        Watch {
            receiver,
            subscription,
        }
    }
}

impl<T: State> Watch<T> {
    /// The oldest queued change, if any.
    pub fn try_next(&self) -> Option<StateChange<T>> {
        self.receiver.try_recv().ok()
    }

    /// Block until a change arrives. `None` once the feed has closed.
    pub fn next_blocking(&self) -> Option<StateChange<T>> {
        self.receiver.recv().ok()
    }

    /// Number of queued changes.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Take every queued change.
    pub fn drain(&self) -> Vec<StateChange<T>> {
        self.receiver.drain().collect()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop receiving changes. Already queued changes stay readable.
    pub fn detach(&mut self) {
        self.subscription.unsubscribe();
    }

    /// The feed as an async stream, ending when the watch detaches or the
    /// provider is torn down.
    #[cfg(feature = "futures")]
    pub fn changes(&self) -> impl futures::Stream<Item = StateChange<T>> + '_ {
        futures::stream::unfold(&self.receiver, |receiver| async move {
            receiver
                .recv_async()
                .await
                .ok()
                .map(|change| (change, receiver))
        })
    }
}
