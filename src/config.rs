//! Per-store configuration.

/// Configuration shared by every provider mounted from the same
/// [`Store`](crate::Store).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name attached to log events and to [`StoreError::MissingProvider`](crate::StoreError).
    /// Falls back to the state type name.
    pub label: Option<&'static str>,

    /// Whether an updater that returns `None` still notifies listeners.
    ///
    /// When `true` the unchanged snapshot is committed and listeners receive
    /// `(prev, prev)`; selector bridges suppress the re-render on their own.
    pub notify_on_noop: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label: None,
            notify_on_noop: true,
        }
    }
}

impl StoreConfig {
    pub fn labelled(label: &'static str) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }

    pub(crate) fn label_or<T>(&self) -> &'static str {
        self.label.unwrap_or_else(core::any::type_name::<T>)
    }
}
