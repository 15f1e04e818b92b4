//! Deploy API handlers.
//!
//! Errors are answered as `{ "error": ... }` with 400 for bad input, 404 for
//! unknown deployments and 5xx for everything else.

use aura_core::{DeploymentId, RepoUrl};
use aura_deploy::{BuildJob, DeployError};
use aura_state::StateError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::ApiState;

/// Attempts at finding an unused id before giving up.
const MAX_MINT_ATTEMPTS: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub repo_url: String,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn state_error_response(e: &StateError) -> Response {
    match e {
        StateError::NotFound(_) => error_response("deployment not found", StatusCode::NOT_FOUND),
        other => error_response(&other.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// POST /deploy
pub async fn deploy(
    State(state): State<ApiState>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(&rejection.body_text(), StatusCode::BAD_REQUEST),
    };

    // Validate before minting: a rejected request leaves no trace.
    let repo = match RepoUrl::parse(&req.repo_url, &state.repo.allowed_hosts) {
        Ok(repo) => repo,
        Err(e) => {
            warn!(repo_url = %req.repo_url, error = %e, "deploy request rejected");
            return error_response(&e.to_string(), StatusCode::BAD_REQUEST);
        }
    };

    let id = match mint_and_create(&state, &repo) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.queue.enqueue(BuildJob {
        id: id.clone(),
        repo,
    }) {
        Ok(()) => {
            info!(%id, "deploy accepted");
            Json(DeployResponse { id: id.to_string() }).into_response()
        }
        Err(e @ (DeployError::QueueFull(_) | DeployError::QueueClosed(_))) => {
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(DeployError::State(e)) => state_error_response(&e),
    }
}

fn mint_and_create(state: &ApiState, repo: &RepoUrl) -> Result<DeploymentId, Response> {
    for _ in 0..MAX_MINT_ATTEMPTS {
        let id = DeploymentId::mint(state.repo.id_length).map_err(|e| {
            error!(error = %e, "id generation failed");
            error_response("id generation failed", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
        match state.tracker.create(&id, repo.as_str()) {
            Ok(_) => return Ok(id),
            Err(StateError::AlreadyExists(_)) => continue,
            Err(e) => return Err(state_error_response(&e)),
        }
    }
    error!(attempts = MAX_MINT_ATTEMPTS, "no unused deployment id found");
    Err(error_response(
        "could not allocate a deployment id",
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

/// GET /status?id=<id>
pub async fn status(State(state): State<ApiState>, Query(query): Query<StatusQuery>) -> Response {
    let Some(raw) = query.id else {
        return error_response("missing id", StatusCode::BAD_REQUEST);
    };
    let id = match DeploymentId::parse(&raw) {
        Ok(id) => id,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST),
    };
    match state.tracker.get_status(&id) {
        Ok(status) => Json(json!({ "status": status })).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// GET /deployments
pub async fn list_deployments(State(state): State<ApiState>) -> Response {
    match state.tracker.list() {
        Ok(deployments) => Json(deployments).into_response(),
        Err(e) => state_error_response(&e),
    }
}

/// GET /deployments/{id}
pub async fn get_deployment(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let id = match DeploymentId::parse(&id) {
        Ok(id) => id,
        Err(e) => return error_response(&e.to_string(), StatusCode::BAD_REQUEST),
    };
    match state.tracker.get(&id) {
        Ok(Some(deployment)) => Json(deployment).into_response(),
        Ok(None) => error_response("deployment not found", StatusCode::NOT_FOUND),
        Err(e) => state_error_response(&e),
    }
}
