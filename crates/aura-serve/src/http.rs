//! Hosting router.
//!
//! Every `GET` path is answered by the resolver; the tenant comes from the
//! `Host` header (or the URI authority when no header is present).

use axum::{Json, Router};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tracing::{debug, error};

use crate::resolver::{Resolution, ResolveError, StaticResolver};

/// Build the hosting router.
pub fn hosting_router(resolver: StaticResolver) -> Router {
    Router::new()
        .route("/", get(serve_asset))
        .route("/{*path}", get(serve_asset))
        .with_state(resolver)
}

/// GET /{*path}
async fn serve_asset(
    State(resolver): State<StaticResolver>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();

    match resolver.resolve(host, uri.path()).await {
        Ok(Resolution::Found(asset)) => {
            debug!(key = %asset.key, size = asset.body.len(), "serving asset");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, asset.content_type)],
                asset.body,
            )
                .into_response()
        }
        Ok(Resolution::NotFound { .. }) => error_response("not found", StatusCode::NOT_FOUND),
        Err(ResolveError::Validation(e)) => {
            debug!(host, path = uri.path(), error = %e, "rejected request");
            error_response(&e.to_string(), StatusCode::BAD_REQUEST)
        }
        Err(e @ ResolveError::Store { .. }) => {
            error!(host, path = uri.path(), error = %e, "asset read failed");
            error_response("internal error", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}
