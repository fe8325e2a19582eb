//! Store factory and the hook-style accessors built on it.

use portable_atomic_util::Arc;

use crate::bridge::Bridge;
use crate::{
    Context, Provider, Renderer, Result, Scope, ShallowEq, Snapshot, State, StoreConfig,
    StoreError, Update,
};

enum Init<T> {
    Value(T),
    Lazy(Box<dyn Fn() -> T + Send + Sync + 'static>),
}

/// A store definition: the initial value plus an identity.
///
/// Each `Store` value is an independent channel. Mounting it with
/// [`provide`](Self::provide) creates a fresh [`Provider`]; every accessor
/// resolves the nearest provider *of this store* in the given [`Context`] and
/// fails with [`StoreError::MissingProvider`] when there is none.
///
/// Clones share identity, so a clone can be handed to any component that needs
/// to reach the same providers.
///
/// # Example
///
/// ```rust
/// use scoped_store::{record, Context, Store, Update};
///
/// record! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Form / FormPatch {
///         pub counter: i64,
///         pub value: String,
///     }
/// }
///
/// let store = Store::lazy(|| Form { counter: 10, value: "a".into() });
/// let scope = store.provide(&Context::root());
///
/// let counter = store
///     .use_selector(scope.context(), |form: &Form| form.counter, |_: &i64| {})
///     .unwrap();
/// let update = store.use_update(scope.context()).unwrap();
///
/// update.update(Update::merge(FormPatch { value: Some("b".into()), ..Default::default() }));
///
/// assert_eq!(counter.get(), 10);
/// assert_eq!(store.use_snapshot(scope.context()).unwrap().value, "b");
/// ```
pub struct Store<T: State> {
    init: Arc<Init<T>>,
    config: StoreConfig,
}

impl<T: State> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            init: self.init.clone(),
            config: self.config,
        }
    }
}

impl<T: State> core::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.config.label_or::<T>())
            .finish()
    }
}

impl<T: State> Store<T> {
    /// A store whose providers start from a clone of `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            init: Arc::new(Init::Value(initial)),
            config: StoreConfig::default(),
        }
    }

    /// A store whose providers call `factory` once each, at mount.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            init: Arc::new(Init::Lazy(Box::new(factory))),
            config: StoreConfig::default(),
        }
    }

    /// Replace the configuration. Providers mounted afterwards use it.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether two handles denote the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.init, &other.init)
    }

    pub(crate) fn initial_value(&self) -> T {
        match &*self.init {
            Init::Value(value) => value.clone(),
            Init::Lazy(factory) => factory(),
        }
    }

    /// Mount a new provider under `parent`.
    pub fn provide(&self, parent: &Context) -> Scope<T> {
        Scope::mount(self, parent)
    }

    /// The nearest provider of this store.
    pub fn use_provider(&self, cx: &Context) -> Result<Provider<T>> {
        cx.lookup(self).ok_or_else(|| {
            let store = self.config.label_or::<T>();
            tracing::error!(store, "store accessed outside of its provider");
            StoreError::MissingProvider { store }
        })
    }

    /// Alias of [`use_provider`](Self::use_provider).
    pub fn use_store(&self, cx: &Context) -> Result<Provider<T>> {
        self.use_provider(cx)
    }

    /// Read the current snapshot without subscribing.
    pub fn use_snapshot(&self, cx: &Context) -> Result<Snapshot<T>> {
        Ok(self.use_provider(cx)?.get_state())
    }

    /// Subscribe to the whole state. `renderer` fires on every commit.
    pub fn use_state<R>(&self, cx: &Context, renderer: R) -> Result<Bridge<T, Snapshot<T>>>
    where
        R: Renderer<Snapshot<T>> + 'static,
    {
        Ok(Bridge::whole(&self.use_provider(cx)?, renderer))
    }

    /// Subscribe to a derived value. `renderer` fires only when the selector's
    /// output is no longer [`ShallowEq`] to the value last held.
    pub fn use_selector<S, F, R>(&self, cx: &Context, selector: F, renderer: R) -> Result<Bridge<T, S>>
    where
        S: ShallowEq + Clone + Send + 'static,
        F: Fn(&T) -> S + Send + Sync + 'static,
        R: Renderer<S> + 'static,
    {
        Ok(Bridge::selector(&self.use_provider(cx)?, selector, renderer))
    }

    /// Render-prop consumer: `children` maps every snapshot to output handed
    /// to `renderer`.
    pub fn consumer<O, C, R>(&self, cx: &Context, children: C, renderer: R) -> Result<Bridge<T, O>>
    where
        O: Clone + Send + 'static,
        C: Fn(&T) -> O + Send + Sync + 'static,
        R: Renderer<O> + 'static,
    {
        Ok(Bridge::consumer(&self.use_provider(cx)?, children, renderer))
    }

    /// A write handle for the nearest provider.
    pub fn use_update(&self, cx: &Context) -> Result<Updater<T>> {
        Ok(Updater {
            provider: self.use_provider(cx)?,
        })
    }
}

/// Write handle returned by [`Store::use_update`].
///
/// Handles obtained from the same provider compare equal, so hosts can use
/// them as memoization keys.
pub struct Updater<T: State> {
    provider: Provider<T>,
}

impl<T: State> Clone for Updater<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl<T: State> PartialEq for Updater<T> {
    fn eq(&self, other: &Self) -> bool {
        self.provider.ptr_eq(&other.provider)
    }
}

impl<T: State> Eq for Updater<T> {}

impl<T: State> core::fmt::Debug for Updater<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Updater").field(&self.provider).finish()
    }
}

impl<T: State> Updater<T> {
    pub fn update(&self, update: impl Into<Update<T>>) {
        self.provider.set_state(update);
    }

    pub fn update_with<F>(&self, update: impl Into<Update<T>>, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.provider.set_state_with(update, callback);
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }
}
