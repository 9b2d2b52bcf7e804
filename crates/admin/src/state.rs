//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::db::{RepositoryError, Store};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Store,
}

impl AppState {
    /// Create a new application state, seeding the dataset from
    /// `config.seed_file` or the embedded seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn new(config: AdminConfig) -> Result<Self, RepositoryError> {
        let store = Store::load(config.seed_file.as_deref())?;
        Ok(Self::with_parts(config, store))
    }

    /// Assemble state from an already-loaded store.
    #[must_use]
    pub fn with_parts(config: AdminConfig, store: Store) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }
}
