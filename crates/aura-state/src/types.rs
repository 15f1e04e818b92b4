//! Domain types for the lifecycle state store.

use std::fmt;

use aura_core::DeploymentId;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Uploading,
    Building,
    Deployed,
    Failed,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Uploading => "uploading",
            DeploymentStatus::Building => "building",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Deployed | DeploymentStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (*self, next),
            (Uploading, Building) | (Uploading, Failed) | (Building, Deployed) | (Building, Failed)
        )
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment as recorded by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub repo_url: String,
    pub status: DeploymentStatus,
    /// Public URL, set only once the deployment reaches `deployed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_url: Option<String>,
    /// Unix timestamp (seconds) when the deployment was accepted.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last status change.
    pub updated_at: u64,
}

/// A committed status change, published by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    pub id: DeploymentId,
    /// `None` when the deployment was just created.
    pub from: Option<DeploymentStatus>,
    pub to: DeploymentStatus,
    pub at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeploymentStatus::*;

    const ALL: [DeploymentStatus; 4] = [Uploading, Building, Deployed, Failed];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [Deployed, Failed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} allowed");
            }
        }
    }

    #[test]
    fn no_backwards_or_self_edges() {
        assert!(!Building.can_transition_to(Uploading));
        for s in ALL {
            assert!(!s.can_transition_to(s));
        }
        assert!(!Uploading.can_transition_to(Deployed));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Deployed).unwrap(), "\"deployed\"");
        assert_eq!(serde_json::from_str::<DeploymentStatus>("\"building\"").unwrap(), Building);
    }
}
