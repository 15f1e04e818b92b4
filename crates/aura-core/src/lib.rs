//! aura-core — shared types for the Aura deployment pipeline.
//!
//! Everything that has to agree between the uploader, the build pipeline
//! and the static host lives here: deployment ids, the storage key layout
//! (`<namespace>/<id>/<relative-path>`), repository URL validation and the
//! `aura.toml` configuration.

pub mod config;
pub mod error;
pub mod id;
pub mod key;
pub mod repo;

pub use config::AuraConfig;
pub use error::ValidationError;
pub use id::DeploymentId;
pub use key::{KeyPrefix, Namespace, RelativePath, StorageKey};
pub use repo::RepoUrl;
