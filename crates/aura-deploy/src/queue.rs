//! Build queue — hands accepted deployments to the worker pool.

use std::sync::Arc;

use aura_core::{DeploymentId, RepoUrl};
use aura_state::{DeploymentStatus, LifecycleTracker};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::error::DeployError;

/// One deployment waiting to be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub id: DeploymentId,
    pub repo: RepoUrl,
}

/// Producer side of the queue.
#[derive(Clone)]
pub struct BuildQueue {
    tx: mpsc::Sender<BuildJob>,
    tracker: LifecycleTracker,
}

/// Consumer side, shared by every worker loop.
#[derive(Clone)]
pub struct BuildReceiver {
    rx: Arc<Mutex<mpsc::Receiver<BuildJob>>>,
}

impl BuildQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    pub fn channel(capacity: usize, tracker: LifecycleTracker) -> (Self, BuildReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self { tx, tracker },
            BuildReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Queue `job` and move its deployment to `building`.
    ///
    /// A job that cannot be queued leaves its deployment `failed`.
    pub fn enqueue(&self, job: BuildJob) -> Result<(), DeployError> {
        let id = job.id.clone();
        self.tracker.transition(&id, DeploymentStatus::Building)?;

        let err = match self.tx.try_send(job) {
            Ok(()) => {
                debug!(%id, "build queued");
                return Ok(());
            }
            Err(mpsc::error::TrySendError::Full(_)) => DeployError::QueueFull(id.to_string()),
            Err(mpsc::error::TrySendError::Closed(_)) => DeployError::QueueClosed(id.to_string()),
        };
        warn!(%id, error = %err, "could not queue build");
        self.tracker.transition(&id, DeploymentStatus::Failed)?;
        Err(err)
    }
}

impl BuildReceiver {
    /// Next job, or `None` once every producer is gone and the queue drained.
    pub async fn recv(&self) -> Option<BuildJob> {
        self.rx.lock().await.recv().await
    }
}
