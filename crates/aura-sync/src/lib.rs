//! aura-sync — synchronizes a local directory tree with the object store.
//!
//! `upload_tree` maps every regular file below a root to
//! `<namespace>/<id>/<relative-path>` and uploads it; `download_tree` does
//! the reverse for every key under a prefix. Both run transfers concurrently,
//! capped at `max_in_flight`, and wait for every transfer before reporting.
//! A failed transfer fails the whole operation but nothing is rolled back;
//! re-running the operation overwrites and repairs.

pub mod error;
pub mod sync;
pub mod walk;

pub use error::{SyncError, TransferError};
pub use sync::{SyncReport, TreeSync};
