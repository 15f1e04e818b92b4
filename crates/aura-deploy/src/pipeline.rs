//! Pipeline — runs queued builds and publishes their output.

use std::sync::Arc;

use aura_core::Namespace;
use aura_state::{DeploymentStatus, LifecycleTracker, StateResult};
use aura_sync::{SyncReport, TreeSync};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::queue::{BuildJob, BuildReceiver};
use crate::worker::BuildWorker;

/// Drives a deployment from `building` to a terminal state.
#[derive(Clone)]
pub struct Pipeline {
    tracker: LifecycleTracker,
    sync: TreeSync,
    worker: Arc<dyn BuildWorker>,
}

impl Pipeline {
    pub fn new(tracker: LifecycleTracker, sync: TreeSync, worker: Arc<dyn BuildWorker>) -> Self {
        Self {
            tracker,
            sync,
            worker,
        }
    }

    /// Build `job`, upload its output under `dist`, and record the outcome.
    ///
    /// Build and transfer errors end in `failed` and are only logged; the
    /// returned error is reserved for the tracker itself.
    pub async fn run_job(&self, job: &BuildJob) -> StateResult<DeploymentStatus> {
        let id = &job.id;
        let outcome: anyhow::Result<SyncReport> = async {
            let output = self.worker.build(job).await?;
            Ok(self.sync.upload_tree(&output, Namespace::Dist, id).await?)
        }
        .await;

        let to = match outcome {
            Ok(report) => {
                info!(%id, files = report.files, bytes = report.bytes, "build output published");
                DeploymentStatus::Deployed
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(%id, error = %reason, "deployment failed");
                DeploymentStatus::Failed
            }
        };
        self.tracker.transition(id, to)?;
        Ok(to)
    }

    /// Run `workers` concurrent job loops until the queue closes or
    /// `shutdown` flips to `true`.
    pub async fn run_workers(
        &self,
        jobs: BuildReceiver,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) {
        let mut set = JoinSet::new();
        for worker in 0..workers.max(1) {
            let pipeline = self.clone();
            let jobs = jobs.clone();
            let shutdown = shutdown.clone();
            set.spawn(async move { pipeline.worker_loop(worker, jobs, shutdown).await });
        }
        info!(workers = workers.max(1), "build workers started");

        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "build worker panicked");
            }
        }
        info!("build workers stopped");
    }

    async fn worker_loop(
        &self,
        worker: usize,
        jobs: BuildReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let job = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                job = jobs.recv() => job,
            };
            let Some(job) = job else {
                debug!(worker, "build queue closed");
                break;
            };

            debug!(worker, id = %job.id, "picked up build");
            let pipeline = self.clone();
            let running = job.clone();
            match tokio::spawn(async move { pipeline.run_job(&running).await }).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!(worker, id = %job.id, error = %e, "could not record build outcome");
                }
                Err(e) => {
                    error!(worker, id = %job.id, error = %e, "build task panicked");
                    if let Err(e) = self.tracker.transition(&job.id, DeploymentStatus::Failed) {
                        error!(worker, id = %job.id, error = %e, "could not fail panicked build");
                    }
                }
            }
        }
    }
}
