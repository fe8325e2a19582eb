//! Scoped state containers for component-tree UIs.
//!
//! A [`Store`] describes a piece of state. Mounting it with [`Store::provide`]
//! creates a [`Provider`] bound to a [`Scope`]; components under that scope
//! read and write it through hook-style accessors:
//!
//! - [`Store::use_state`]: whole-state read, redraws on every commit
//! - [`Store::use_selector`]: derived read, redraws only when the derived value
//!   stops being [`ShallowEq`] to the previous one
//! - [`Store::consumer`]: render-prop read
//! - [`Store::use_update`] and [`ReducerStore::use_dispatch`]: writes
//!
//! Every write resolves an [`Update`] against the previous snapshot, commits
//! the result, then notifies listeners with `(prev, next)` before running its
//! completion callback. The host UI runtime is reached only through
//! [`Context`] (scoping), the RAII guards ([`Scope`], [`Bridge`]) for attach
//! and detach, and [`Renderer`] for redraw requests.
//!
//! ## Example
//!
//! ```rust
//! use scoped_store::{record, Context, Snapshot, Store, TestRenderer, Update};
//!
//! record! {
//!     #[derive(Clone, Debug, PartialEq)]
//!     pub struct Form / FormPatch {
//!         pub counter: i64,
//!         pub value: String,
//!     }
//! }
//!
//! let store = Store::lazy(|| Form { counter: 10, value: "a".into() });
//! let scope = store.provide(&Context::root());
//! let cx = scope.context();
//!
//! let whole: TestRenderer<Snapshot<Form>> = TestRenderer::new();
//! let _state = store.use_state(cx, whole.clone()).unwrap();
//!
//! let counter: TestRenderer<i64> = TestRenderer::new();
//! let _counter = store.use_selector(cx, |form: &Form| form.counter, counter.clone()).unwrap();
//!
//! store
//!     .use_update(cx)
//!     .unwrap()
//!     .update(Update::merge(FormPatch { value: Some("b".into()), ..Default::default() }));
//!
//! // The whole-state consumer redraws, the counter selector does not.
//! assert_eq!(whole.count(), 1);
//! assert_eq!(counter.count(), 0);
//! ```

mod bridge;
mod config;
mod equality;
mod error;
mod provider;
mod reducer;
mod renderer;
mod scope;
mod store;
mod update;
mod watch;

pub use bridge::Bridge;
pub use config::StoreConfig;
pub use equality::{shallow_equal, Identical, ShallowEq};
pub use error::{Result, StoreError};
pub use provider::{ListenerId, Provider, Snapshot, Subscription};
pub use reducer::{Action, Dispatcher, ReducerStore};
pub use renderer::Renderer;
pub use scope::{Context, Scope};
pub use store::{Store, Updater};
pub use update::{Change, Merge, State, Update};
pub use watch::{StateChange, Watch};

// Test utilities (only available with 'testing' feature or during tests)
#[cfg(any(test, feature = "testing"))]
pub use renderer::TestRenderer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
