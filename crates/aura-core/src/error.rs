//! Validation errors shared by every Aura crate.

use thiserror::Error;

/// Input rejected before it can reach storage or mutate any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid repository url: {0}")]
    RepoUrl(String),

    #[error("repository host not allowed: {0}")]
    RepoHost(String),

    #[error("invalid deployment id: {0:?}")]
    DeploymentId(String),

    #[error("invalid host: {0:?}")]
    Host(String),

    #[error("unknown namespace: {0:?}")]
    Namespace(String),

    #[error("unsafe segment {segment:?} in path {path:?}")]
    UnsafePath { path: String, segment: String },

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    #[error("path {path} is not inside {root}")]
    OutsideRoot { path: String, root: String },
}
