use aura_state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("build queue is full, rejected {0}")]
    QueueFull(String),

    #[error("build queue is closed, rejected {0}")]
    QueueClosed(String),

    #[error(transparent)]
    State(#[from] StateError),
}
