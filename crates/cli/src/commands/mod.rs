//! Command implementations.

pub mod quote;
pub mod seed;

use std::path::{Path, PathBuf};

use harbor_core::{Dataset, DatasetError};
use thiserror::Error;

/// Errors shared by the dataset commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Could not encode dataset: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Quote(#[from] quote::QuoteError),
}

/// Load `file`, or the embedded seed when no file is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse or
/// validate.
pub async fn load_dataset(file: Option<&Path>) -> Result<Dataset, CommandError> {
    match file {
        Some(path) => {
            let source =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CommandError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
            Ok(Dataset::from_yaml(&source)?)
        }
        None => Ok(Dataset::seed()?),
    }
}
