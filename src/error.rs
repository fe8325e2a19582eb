//! Error type raised by the store read and write APIs.

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, StoreError>;

/// Errors surfaced by the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A read, write or selector API was called with no enclosing
    /// [`Scope`](crate::Scope) for the store.
    #[error("no provider in scope for store `{store}`; mount it with `Store::provide` first")]
    MissingProvider {
        /// Label of the store, or the name of its state type.
        store: &'static str,
    },
}
