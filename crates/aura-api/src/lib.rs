//! aura-api — deploy-request endpoint.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/deploy` | Accept `{ "repoUrl": ... }`, answer `{ "id": ... }` |
//! | GET | `/status?id=<id>` | Current lifecycle status |
//! | GET | `/deployments` | List all deployments |
//! | GET | `/deployments/{id}` | Full deployment record |

pub mod handlers;

use aura_core::config::RepoConfig;
use aura_deploy::BuildQueue;
use aura_state::LifecycleTracker;
use axum::Router;
use axum::routing::{get, post};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub tracker: LifecycleTracker,
    pub queue: BuildQueue,
    pub repo: RepoConfig,
}

/// Build the deploy API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/deploy", post(handlers::deploy))
        .route("/status", get(handlers::status))
        .route("/deployments", get(handlers::list_deployments))
        .route("/deployments/{id}", get(handlers::get_deployment))
        .with_state(state)
}
