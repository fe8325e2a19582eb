//! Per-consumer glue between a provider and a rendering unit.

use portable_atomic_util::Arc;
use spin::Mutex;

use crate::{Provider, Renderer, ShallowEq, Snapshot, State, Subscription};

/// A consumer attached to a provider.
///
/// Every bridge follows the same protocol: it registers exactly one listener
/// when created and removes it when dropped (or [`detach`](Self::detach)ed).
/// The listener updates the value the bridge holds and decides whether the
/// owning component must redraw:
///
/// - [`Store::use_state`](crate::Store::use_state): on every commit.
/// - [`Store::use_selector`](crate::Store::use_selector): only when the derived
///   value is not [`ShallowEq`] to the one held.
/// - [`Store::consumer`](crate::Store::consumer): on every commit, delivering
///   the output of a render-prop.
///
/// The component reads the held value with [`get`](Self::get) while rendering.
#[must_use = "dropping a Bridge detaches it from its provider"]
pub struct Bridge<T: State, V> {
    value: Arc<Mutex<V>>,
    subscription: Subscription<T>,
}

impl<T: State, V> core::fmt::Debug for Bridge<T, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bridge")
            .field("store", &self.subscription.provider().label())
            .field("attached", &self.subscription.is_active())
            .finish()
    }
}

impl<T: State, V: Clone + Send + 'static> Bridge<T, V> {
    /// Attach with `initial` held. `decide` receives the next snapshot and the
    /// held value, updates it in place and reports whether to redraw.
    fn attach<D, R>(provider: &Provider<T>, initial: V, decide: D, renderer: R) -> Self
    where
        D: Fn(&Snapshot<T>, &mut V) -> bool + Send + Sync + 'static,
        R: Renderer<V> + 'static,
    {
        let value = Arc::new(Mutex::new(initial));
        let held = value.clone();

        let subscription = provider.subscribe(move |_prev, next| {
            let redraw = {
                let mut held = held.lock();
                decide(next, &mut *held).then(|| held.clone())
            };

            // Outside the lock: the renderer may read the bridge back.
            if let Some(value) = redraw {
                renderer.render(&value);
            }
        });

        Self {
            value,
            subscription,
        }
    }

    pub(crate) fn consumer<C, R>(provider: &Provider<T>, children: C, renderer: R) -> Self
    where
        C: Fn(&T) -> V + Send + Sync + 'static,
        R: Renderer<V> + 'static,
    {
        let initial = children(&*provider.get_state());
        Self::attach(
            provider,
            initial,
            move |next, held| {
                *held = children(&**next);
                true
            },
            renderer,
        )
    }

    /// The value held by the bridge: the latest snapshot, derived value or
    /// render-prop output.
    pub fn get(&self) -> V {
        self.value.lock().clone()
    }

    /// Run `f` against the held value.
    ///
    /// `f` sees a copy taken before it runs, so it may write to the store.
    pub fn with<F, O>(&self, f: F) -> O
    where
        F: FnOnce(&V) -> O,
    {
        let value = self.get();
        f(&value)
    }

    /// Whether the bridge still has a listener registered.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    /// Remove the listener now. The held value stays readable.
    pub fn detach(&mut self) {
        self.subscription.unsubscribe();
    }

    pub fn provider(&self) -> &Provider<T> {
        self.subscription.provider()
    }
}

impl<T: State> Bridge<T, Snapshot<T>> {
    pub(crate) fn whole<R>(provider: &Provider<T>, renderer: R) -> Self
    where
        R: Renderer<Snapshot<T>> + 'static,
    {
        Self::attach(
            provider,
            provider.get_state(),
            |next, held| {
                *held = next.clone();
                true
            },
            renderer,
        )
    }
}

impl<T: State, S: ShallowEq + Clone + Send + 'static> Bridge<T, S> {
    pub(crate) fn selector<F, R>(provider: &Provider<T>, selector: F, renderer: R) -> Self
    where
        F: Fn(&T) -> S + Send + Sync + 'static,
        R: Renderer<S> + 'static,
    {
        let initial = selector(&*provider.get_state());
        Self::attach(
            provider,
            initial,
            move |next, held| {
                let derived = selector(&**next);
                if held.shallow_eq(&derived) {
                    return false;
                }
                *held = derived;
                true
            },
            renderer,
        )
    }
}
