//! Lifecycle tracker — the authoritative status of every deployment.

use std::time::{SystemTime, UNIX_EPOCH};

use aura_core::DeploymentId;
use aura_core::config::HostingConfig;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::store::StateStore;
use crate::types::{Deployment, DeploymentStatus, LifecycleEvent};

const EVENT_CAPACITY: usize = 256;

/// Records the deployment state machine and publishes its transitions.
#[derive(Clone)]
pub struct LifecycleTracker {
    store: StateStore,
    hosting: HostingConfig,
    events: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleTracker {
    pub fn new(store: StateStore, hosting: HostingConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            hosting,
            events,
        }
    }

    /// Record a newly accepted deployment in `uploading`.
    pub fn create(&self, id: &DeploymentId, repo_url: &str) -> StateResult<Deployment> {
        let now = unix_now();
        let deployment = Deployment {
            id: id.clone(),
            repo_url: repo_url.to_string(),
            status: DeploymentStatus::Uploading,
            deployed_url: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&deployment)?;
        info!(%id, repo_url, "deployment created");
        self.publish(id, None, DeploymentStatus::Uploading, now);
        Ok(deployment)
    }

    /// Move a deployment to `to`.
    ///
    /// Concurrent calls for the same id are serialized by the store; a call
    /// whose edge is no longer valid by the time it runs gets
    /// [`StateError::Conflict`].
    pub fn transition(&self, id: &DeploymentId, to: DeploymentStatus) -> StateResult<Deployment> {
        let now = unix_now();
        let deployed_url = (to == DeploymentStatus::Deployed).then(|| self.hosting.deployed_url(id));
        match self.store.set_status(id, to, deployed_url, now) {
            Ok((from, deployment)) => {
                info!(%id, %from, %to, "deployment transitioned");
                self.publish(id, Some(from), to, now);
                Ok(deployment)
            }
            Err(e @ StateError::Conflict { .. }) => {
                warn!(%id, %to, error = %e, "transition rejected");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Fail every deployment still in `uploading` or `building`.
    ///
    /// Meant for startup: jobs queued or running when the process stopped
    /// are gone, so their records would otherwise never reach a terminal
    /// state. Returns the ids that were failed.
    pub fn fail_unfinished(&self) -> StateResult<Vec<DeploymentId>> {
        let mut failed = Vec::new();
        for deployment in self.list()? {
            if deployment.status.is_terminal() {
                continue;
            }
            match self.transition(&deployment.id, DeploymentStatus::Failed) {
                Ok(_) => {
                    warn!(id = %deployment.id, from = %deployment.status, "unfinished deployment failed");
                    failed.push(deployment.id);
                }
                // Reached a terminal state since the listing.
                Err(StateError::Conflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(failed)
    }

    /// Current status; `NotFound` for ids that were never created.
    pub fn get_status(&self, id: &DeploymentId) -> StateResult<DeploymentStatus> {
        self.get(id)?
            .map(|d| d.status)
            .ok_or_else(|| StateError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &DeploymentId) -> StateResult<Option<Deployment>> {
        self.store.get(id)
    }

    pub fn list(&self) -> StateResult<Vec<Deployment>> {
        self.store.list()
    }

    /// Receive every committed creation and transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn publish(&self, id: &DeploymentId, from: Option<DeploymentStatus>, to: DeploymentStatus, at: u64) {
        let event = LifecycleEvent {
            id: id.clone(),
            from,
            to,
            at,
        };
        // No subscribers is fine.
        if self.events.send(event).is_err() {
            debug!(%id, "no lifecycle subscribers");
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use DeploymentStatus::*;

    fn tracker() -> LifecycleTracker {
        LifecycleTracker::new(StateStore::open_in_memory().unwrap(), HostingConfig::default())
    }

    fn id(s: &str) -> DeploymentId {
        DeploymentId::parse(s).unwrap()
    }

    #[test]
    fn happy_path_sets_deployed_url() {
        let tracker = tracker();
        let created = tracker.create(&id("abc123"), "https://github.com/o/r").unwrap();
        assert_eq!(created.status, Uploading);
        assert!(created.deployed_url.is_none());

        let building = tracker.transition(&id("abc123"), Building).unwrap();
        assert!(building.deployed_url.is_none());

        let deployed = tracker.transition(&id("abc123"), Deployed).unwrap();
        assert_eq!(
            deployed.deployed_url.as_deref(),
            Some("http://abc123.localhost:3001/index.html")
        );
        assert_eq!(tracker.get_status(&id("abc123")).unwrap(), Deployed);
    }

    #[test]
    fn unknown_id_is_not_found_not_failed() {
        let tracker = tracker();
        assert!(matches!(
            tracker.get_status(&id("never")),
            Err(StateError::NotFound(_))
        ));
        assert!(matches!(
            tracker.transition(&id("never"), Building),
            Err(StateError::NotFound(_))
        ));
    }

    #[test]
    fn terminal_states_are_final() {
        let tracker = tracker();
        tracker.create(&id("t"), "https://github.com/o/r").unwrap();
        tracker.transition(&id("t"), Building).unwrap();
        tracker.transition(&id("t"), Failed).unwrap();

        for to in [Uploading, Building, Deployed, Failed] {
            assert!(matches!(
                tracker.transition(&id("t"), to),
                Err(StateError::Conflict { from: Failed, .. })
            ));
        }
        let deployment = tracker.get(&id("t")).unwrap().unwrap();
        assert_eq!(deployment.status, Failed);
        assert!(deployment.deployed_url.is_none());
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let tracker = tracker();
        tracker.create(&id("dup"), "https://github.com/o/r").unwrap();
        tracker.transition(&id("dup"), Building).unwrap();
        assert!(matches!(
            tracker.create(&id("dup"), "https://github.com/o/other"),
            Err(StateError::AlreadyExists(_))
        ));
        assert_eq!(tracker.get_status(&id("dup")).unwrap(), Building);
    }

    #[test]
    fn racing_terminal_transitions_pick_exactly_one() {
        let tracker = Arc::new(tracker());
        tracker.create(&id("race"), "https://github.com/o/r").unwrap();
        tracker.transition(&id("race"), Building).unwrap();

        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let tracker = tracker.clone();
                    let to = if i % 2 == 0 { Deployed } else { Failed };
                    s.spawn(move || tracker.transition(&id("race"), to).map(|d| d.status))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(outcomes
            .iter()
            .filter(|o| o.is_err())
            .all(|o| matches!(o, Err(StateError::Conflict { .. }))));
        assert_eq!(tracker.get_status(&id("race")).unwrap(), *winners[0]);
    }

    #[test]
    fn reopened_store_fails_unfinished_deployments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aura.redb");
        {
            let tracker = LifecycleTracker::new(StateStore::open(&path).unwrap(), HostingConfig::default());
            for name in ["queued", "running", "shipped", "broken"] {
                tracker.create(&id(name), "https://github.com/o/r").unwrap();
            }
            tracker.transition(&id("running"), Building).unwrap();
            tracker.transition(&id("shipped"), Building).unwrap();
            tracker.transition(&id("shipped"), Deployed).unwrap();
            tracker.transition(&id("broken"), Failed).unwrap();
        }

        let tracker = LifecycleTracker::new(StateStore::open(&path).unwrap(), HostingConfig::default());
        let failed = tracker.fail_unfinished().unwrap();
        assert_eq!(failed, vec![id("queued"), id("running")]);

        assert_eq!(tracker.get_status(&id("queued")).unwrap(), Failed);
        assert_eq!(tracker.get_status(&id("running")).unwrap(), Failed);
        assert_eq!(tracker.get_status(&id("shipped")).unwrap(), Deployed);
        assert_eq!(tracker.get_status(&id("broken")).unwrap(), Failed);
        assert!(tracker.get(&id("shipped")).unwrap().unwrap().deployed_url.is_some());

        assert!(tracker.fail_unfinished().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribers_observe_monotonic_sequence() {
        let tracker = tracker();
        let mut events = tracker.subscribe();

        tracker.create(&id("ev"), "https://github.com/o/r").unwrap();
        tracker.transition(&id("ev"), Building).unwrap();
        let _ = tracker.transition(&id("ev"), Uploading);
        tracker.transition(&id("ev"), Deployed).unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push((event.from, event.to));
        }
        assert_eq!(
            seen,
            vec![
                (None, Uploading),
                (Some(Uploading), Building),
                (Some(Building), Deployed),
            ]
        );
    }
}
