//! Static resolver — maps an inbound host and path to a stored asset.
//!
//! The tenant id is the leading DNS label of the host. It arrives from the
//! network, so it goes through the same validation as any other deployment
//! id before it is used to build a key.

use aura_core::key::check_segment;
use aura_core::{DeploymentId, Namespace, RelativePath, StorageKey, ValidationError};
use aura_store::{ObjectStoreClient, StoreError};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::debug;

/// Content types by file suffix; anything else is served as JavaScript.
const CONTENT_TYPES: &[(&str, &str)] = &[(".html", "text/html"), (".css", "text/css")];
const DEFAULT_CONTENT_TYPE: &str = "application/javascript";

/// A stored object ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub key: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Asset),
    /// Nothing stored at the computed key. `key` is `None` when the path
    /// named no file at all (e.g. `/`).
    NotFound { key: Option<String> },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read {key}: {source}")]
    Store { key: String, source: StoreError },
}

/// Serves deployed assets straight from the object store.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    client: ObjectStoreClient,
}

impl StaticResolver {
    pub fn new(client: ObjectStoreClient) -> Self {
        Self { client }
    }

    /// Resolve `host` + `path` to an asset with exactly one store read.
    pub async fn resolve(&self, host: &str, path: &str) -> Result<Resolution, ResolveError> {
        let id = tenant_from_host(host)?;
        let Some(rel) = normalize_path(path)? else {
            debug!(%id, path, "no file named by request path");
            return Ok(Resolution::NotFound { key: None });
        };
        let key = StorageKey::new(Namespace::Dist, &id, &rel);

        match self.client.get(key.as_str()).await {
            Ok(body) => Ok(Resolution::Found(Asset {
                key: key.to_string(),
                content_type: content_type_for(rel.as_str()),
                body,
            })),
            Err(e) if e.is_not_found() => {
                debug!(%key, "asset not found");
                Ok(Resolution::NotFound {
                    key: Some(key.to_string()),
                })
            }
            Err(source) => Err(ResolveError::Store {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Extract and validate the tenant id from a `Host` value.
///
/// The port is dropped and the label lowercased (DNS is case-insensitive).
pub fn tenant_from_host(host: &str) -> Result<DeploymentId, ValidationError> {
    let invalid = || ValidationError::Host(host.to_string());

    let host = host.trim();
    let name = match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        Some(_) => return Err(invalid()),
        None => host,
    };
    let label = name.split('.').next().unwrap_or_default().to_ascii_lowercase();
    DeploymentId::parse(&label).map_err(|_| invalid())
}

/// Normalize a request path into the relative path of a file.
///
/// Empty segments collapse and each remaining segment is percent-decoded.
/// A decoded segment must be valid UTF-8 and pass the same checks as a
/// stored key segment, so encoded dots, separators and NULs are refused.
/// Returns `None` when no segment remains.
pub fn normalize_path(path: &str) -> Result<Option<RelativePath>, ValidationError> {
    let unsafe_path = |segment: &str| ValidationError::UnsafePath {
        path: path.to_string(),
        segment: segment.to_string(),
    };

    if !path.starts_with('/') {
        return Err(unsafe_path(path));
    }

    let mut segments = Vec::new();
    for raw in path.split('/').filter(|s| !s.is_empty()) {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| unsafe_path(raw))?;
        check_segment(path, &decoded)?;
        segments.push(decoded);
    }

    if segments.is_empty() {
        return Ok(None);
    }
    RelativePath::parse(&segments.join("/")).map(Some)
}

/// Content type for a path, from the fixed suffix table.
pub fn content_type_for(path: &str) -> &'static str {
    CONTENT_TYPES
        .iter()
        .find(|(suffix, _)| path.ends_with(suffix))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
