//! In-memory data store for the admin console.
//!
//! The console edits its own copy of the seeded [`Dataset`], loaded from
//! the embedded YAML document or from `ADMIN_SEED_FILE`. Edits last until
//! the process exits and are not shared with a separately running
//! storefront.
//!
//! # Repositories
//!
//! - [`ProductRepository`] - create, edit, delete, publish and restock
//! - [`OrderRepository`] - status changes along the order lifecycle
//! - [`CustomerRepository`] - customer search with order totals
//! - [`CouponRepository`] - create, edit, deactivate and delete
//! - [`settings`] - store settings

pub mod coupons;
pub mod customers;
pub mod orders;
pub mod products;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use harbor_core::{Dataset, DatasetError, TransitionError};

pub use coupons::CouponRepository;
pub use customers::{CustomerRepository, CustomerSummary};
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
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

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Order status change outside the lifecycle.
    #[error(transparent)]
    Transition(#[from] TransitionError),
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
            coupons = dataset.coupons.len(),
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
