//! Navigation seam used by the forced-logout redirect.

use std::sync::{Arc, Mutex};

use crate::lock;

/// Moves the app to another route.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

/// Records every navigation in order. Clones share one history.
#[derive(Debug, Clone, Default)]
pub struct HistoryNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The route most recently navigated to.
    pub fn current(&self) -> Option<String> {
        lock(&self.history).last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "navigate");
        lock(&self.history).push(path.to_string());
    }
}
