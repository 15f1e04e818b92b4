//! aura-store — object store client for Aura.
//!
//! A thin typed wrapper over an [`object_store::ObjectStore`] backend. The
//! client is cheap to clone and is handed explicitly to every component that
//! needs storage; there is no process-wide instance.
//!
//! # Backends
//!
//! | `[store].backend` | Backend |
//! |---|---|
//! | `memory` | `object_store::memory::InMemory` (tests, demos) |
//! | `local` | `object_store::local::LocalFileSystem` rooted at `[store].root` |
//! | `s3` | `object_store::aws::AmazonS3`, credentials from `AWS_*` env vars |

pub mod client;
pub mod error;

pub use client::ObjectStoreClient;
pub use error::{StoreError, StoreResult};
