//! Seed dataset checks and export.
//!
//! # Usage
//!
//! ```bash
//! # Validate the embedded seed
//! harbor-cli seed check
//!
//! # Validate an alternative dataset
//! harbor-cli seed check --file ./my-store.yaml
//!
//! # Write the dataset as JSON
//! harbor-cli seed export --out dataset.json
//! ```

use std::path::Path;

use harbor_core::{Dataset, DatasetError};
use tracing::{error, info};

use super::{CommandError, load_dataset};

/// Record counts of a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub categories: usize,
    pub products: usize,
    pub variants: usize,
    pub users: usize,
    pub orders: usize,
    pub coupons: usize,
}

impl Summary {
    #[must_use]
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            categories: dataset.categories.len(),
            products: dataset.products.len(),
            variants: dataset.products.iter().map(|p| p.variants.len()).sum(),
            users: dataset.users.len(),
            orders: dataset.orders.len(),
            coupons: dataset.coupons.len(),
        }
    }
}

/// Validate a dataset and log what it contains. Each failed integrity check
/// is logged on its own line.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read, parsed or validated.
pub async fn check(file: Option<&Path>) -> Result<Summary, CommandError> {
    let source = file.map_or_else(|| "embedded seed".to_string(), |p| p.display().to_string());
    info!(source = %source, "Checking dataset");

    let dataset = match load_dataset(file).await {
        Ok(dataset) => dataset,
        Err(CommandError::Dataset(DatasetError::Integrity(problems))) => {
            error!("Integrity check failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(DatasetError::Integrity(problems).into());
        }
        Err(e) => return Err(e),
    };

    let summary = Summary::of(&dataset);
    info!(
        categories = summary.categories,
        products = summary.products,
        variants = summary.variants,
        users = summary.users,
        orders = summary.orders,
        coupons = summary.coupons,
        "Dataset is valid"
    );
    Ok(summary)
}

/// Write a dataset as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the dataset cannot be loaded or `out` cannot be
/// written.
pub async fn export(file: Option<&Path>, out: &Path) -> Result<Summary, CommandError> {
    let dataset = load_dataset(file).await?;
    let json = serde_json::to_string_pretty(&dataset)?;
    tokio::fs::write(out, json)
        .await
        .map_err(|source| CommandError::Write {
            path: out.to_path_buf(),
            source,
        })?;

    let summary = Summary::of(&dataset);
    info!(
        out = %out.display(),
        products = summary.products,
        orders = summary.orders,
        "Dataset exported"
    );
    Ok(summary)
}
