//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::content::ContentStore;
use crate::db::{RepositoryError, Store};
use crate::search::{SearchIndex, build_index_async};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the seeded dataset, search index, content pages and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Store,
    search: SearchIndex,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Seeds the dataset from `config.seed_file` (or the embedded seed) and
    /// loads the markdown pages from `config.content_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn new(config: StorefrontConfig) -> Result<Self, RepositoryError> {
        let store = Store::load(config.seed_file.as_deref())?;
        let content = ContentStore::load(&config.content_dir);
        Ok(Self::with_parts(config, store, content))
    }

    /// Assemble state from already-loaded parts.
    #[must_use]
    pub fn with_parts(config: StorefrontConfig, store: Store, content: ContentStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                search: SearchIndex::new(),
                content,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the in-memory store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Get a reference to the search index.
    #[must_use]
    pub fn search(&self) -> &SearchIndex {
        &self.inner.search
    }

    /// Get a reference to the content store.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Build the search index in the background.
    ///
    /// Search returns empty results until the index is ready.
    pub fn start_search_indexing(&self) {
        build_index_async(
            self.inner.search.clone(),
            self.inner.store.clone(),
            self.inner.content.clone(),
        );
    }
}
