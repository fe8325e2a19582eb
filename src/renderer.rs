//! Render trigger abstraction connecting bridges to the host UI runtime.

#[cfg(any(test, feature = "testing"))]
use portable_atomic_util::Arc;
#[cfg(any(test, feature = "testing"))]
use spin::Mutex;

/// The host's local re-render trigger.
///
/// A [`Bridge`](crate::Bridge) calls [`render`](Self::render) each time its
/// owning component must redraw, passing the value the component will read.
/// Hosts typically schedule a redraw here rather than drawing synchronously.
///
/// Closures taking `&V` implement this trait.
///
/// # Example
///
/// ```rust
/// use scoped_store::Renderer;
///
/// struct LogRenderer;
///
/// impl Renderer<u32> for LogRenderer {
///     fn render(&self, value: &u32) {
///         println!("redraw with {value}");
///     }
/// }
///
/// let closure_renderer = |value: &u32| println!("{value}");
/// closure_renderer.render(&1);
/// ```
pub trait Renderer<V>: Send + Sync {
    fn render(&self, value: &V);
}

impl<V, F> Renderer<V> for F
where
    F: Fn(&V) + Send + Sync,
{
    fn render(&self, value: &V) {
        self(value)
    }
}

#[cfg(any(test, feature = "testing"))]
/// Test renderer that captures every value it is asked to render.
///
/// Only available with the `testing` feature.
///
/// Clones share the same capture storage, so one clone can be handed to a
/// bridge and the other kept for assertions.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use scoped_store::{Context, Snapshot, Store, TestRenderer, Update};
///
/// let store = Store::new(BTreeMap::from([("counter", 0)]));
/// let scope = store.provide(&Context::root());
///
/// let renderer: TestRenderer<Snapshot<BTreeMap<&str, i32>>> = TestRenderer::new();
/// let _bridge = store.use_state(scope.context(), renderer.clone()).unwrap();
///
/// scope.provider().set_state(Update::merge(BTreeMap::from([("counter", 1)])));
///
/// assert_eq!(renderer.count(), 1);
/// renderer.with_renders(|renders| {
///     assert_eq!(renders[0]["counter"], 1);
/// });
/// ```
pub struct TestRenderer<V> {
    renders: Arc<Mutex<Vec<V>>>,
}

#[cfg(any(test, feature = "testing"))]
impl<V> Clone for TestRenderer<V> {
    fn clone(&self) -> Self {
        Self {
            renders: self.renders.clone(),
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<V: Clone + Send> Renderer<V> for TestRenderer<V> {
    fn render(&self, value: &V) {
        self.renders.lock().push(value.clone());
    }
}

#[cfg(any(test, feature = "testing"))]
impl<V> Default for TestRenderer<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "testing"))]
impl<V> TestRenderer<V> {
    pub fn new() -> Self {
        Self {
            renders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the number of renders that have occurred.
    pub fn count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Access the captured values with a closure.
    ///
    /// The closure runs on a copy, so it may trigger further renders.
    pub fn with_renders<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Vec<V>) -> R,
        V: Clone,
    {
        let renders = self.renders.lock().clone();
        f(&renders)
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        self.renders.lock().clear();
    }
}
