//! Scopes: binding a provider instance to a subtree.

use core::any::Any;

use portable_atomic_util::Arc;

use crate::{Provider, State, Store};

struct Entry<T: State> {
    store: Store<T>,
    provider: Provider<T>,
}

struct Node {
    entry: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// The chain of providers visible from a point in the component tree.
///
/// A `Context` is what a host passes down to its children: it is immutable and
/// cheap to clone. [`Store::provide`] extends it with a new provider, and every
/// read or write API resolves the nearest enclosing provider of *that* store.
/// Two stores never see each other's providers, even when their state types
/// match.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}

impl Context {
    /// An empty context with no providers.
    pub fn root() -> Self {
        Self::default()
    }

    /// Number of providers mounted along this chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_deref();
        }
        depth
    }

    fn with<T: State>(&self, store: Store<T>, provider: Provider<T>) -> Self {
        Self {
            head: Some(Arc::new(Node {
                entry: Box::new(Entry { store, provider }),
                parent: self.head.clone(),
            })),
        }
    }

    pub(crate) fn lookup<T: State>(&self, store: &Store<T>) -> Option<Provider<T>> {
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            if let Some(entry) = current.entry.downcast_ref::<Entry<T>>() {
                if entry.store.ptr_eq(store) {
                    return Some(entry.provider.clone());
                }
            }
            node = current.parent.as_deref();
        }
        None
    }
}

/// A mounted provider, bound to the lifetime of this guard.
///
/// Created by [`Store::provide`]. Descendants read the provider through
/// [`context`](Self::context); dropping the scope tears the provider down,
/// clearing its listener registry and turning later writes into no-ops.
#[must_use = "dropping a Scope tears its provider down"]
pub struct Scope<T: State> {
    provider: Provider<T>,
    context: Context,
}

impl<T: State> Scope<T> {
    pub(crate) fn mount(store: &Store<T>, parent: &Context) -> Self {
        let provider = Provider::mount(store.initial_value(), *store.config());
        let context = parent.with(store.clone(), provider.clone());
        Self { provider, context }
    }

    /// The context to hand to the subtree under this scope.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn provider(&self) -> &Provider<T> {
        &self.provider
    }
}

impl<T: State> Drop for Scope<T> {
    fn drop(&mut self) {
        self.provider.teardown();
    }
}
