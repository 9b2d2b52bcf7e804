//! In-memory data store for the storefront.
//!
//! The storefront serves a [`Dataset`] seeded at startup, either from the
//! YAML document embedded in `harbor-core` or from `STOREFRONT_SEED_FILE`.
//! Nothing is persisted: placed orders and registered accounts live until
//! the process exits.
//!
//! Handlers take short read or write sections through [`Store::read`] and
//! [`Store::write`]; the repositories in this module wrap the multi-step
//! operations.

pub mod orders;
pub mod users;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use harbor_core::{Dataset, DatasetError};

pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The seed file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The seed document is malformed or inconsistent.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Shared handle to the seeded dataset.
#[derive(Clone)]
pub struct Store {
    dataset: Arc<RwLock<Dataset>>,
}

impl Store {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(dataset)),
        }
    }

    /// Load the dataset from `seed_file`, or the embedded seed when `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Io` if the file cannot be read and
    /// `RepositoryError::Dataset` if it fails to parse or validate.
    pub fn load(seed_file: Option<&Path>) -> Result<Self, RepositoryError> {
        let dataset = match seed_file {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| RepositoryError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Dataset::from_yaml(&source)?
            }
            None => Dataset::seed()?,
        };

        tracing::info!(
            source = seed_file.map_or_else(|| "embedded".to_string(), |p| p.display().to_string()),
            products = dataset.products.len(),
            orders = dataset.orders.len(),
            "Dataset loaded"
        );
        Ok(Self::new(dataset))
    }

    /// Shared read access.
    pub async fn read(&self) -> RwLockReadGuard<'_, Dataset> {
        self.dataset.read().await
    }

    /// Exclusive write access.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Dataset> {
        self.dataset.write().await
    }
}
