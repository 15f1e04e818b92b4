//! Error types for tree synchronization.

use std::io;
use std::path::PathBuf;

use aura_core::ValidationError;
use aura_store::StoreError;
use thiserror::Error;

/// Failure of a single file transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("transfer of {key} failed: {source}")]
    Store { key: String, source: StoreError },
}

/// Failure of a whole tree operation.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to walk {}: {source}", path.display())]
    Walk { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to list {prefix}: {source}")]
    List { prefix: String, source: StoreError },

    #[error("{failed} of {total} transfers failed, first error: {first}")]
    Transfer {
        failed: usize,
        total: usize,
        #[source]
        first: Box<TransferError>,
    },
}
