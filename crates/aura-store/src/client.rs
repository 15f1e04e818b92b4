//! ObjectStoreClient — typed put/get/list over an object store backend.

use std::sync::Arc;

use aura_core::config::{StoreBackend, StoreConfig};
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Shared handle to the blob store holding deployment artifacts.
///
/// Cloning is cheap (the backend is behind an `Arc`) and clones talk to the
/// same store. Keys are plain `/`-separated strings; prefix listing matches
/// whole segments only.
#[derive(Clone)]
pub struct ObjectStoreClient {
    inner: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreClient")
            .field("backend", &self.inner.to_string())
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl ObjectStoreClient {
    /// Wrap an already configured backend.
    pub fn new(inner: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            inner,
            bucket: bucket.into(),
        }
    }

    /// Ephemeral in-memory store (for tests and demos).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    /// Build the backend selected by `[store]`.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let inner: Arc<dyn ObjectStore> = match config.backend {
            StoreBackend::Memory => Arc::new(InMemory::new()),
            StoreBackend::Local => {
                let root = config.root.as_ref().ok_or_else(|| {
                    StoreError::Config("local backend requires [store].root".to_string())
                })?;
                std::fs::create_dir_all(root)
                    .map_err(|e| StoreError::Config(format!("create {}: {e}", root.display())))?;
                let fs = LocalFileSystem::new_with_prefix(root)
                    .map_err(|e| StoreError::Config(e.to_string()))?;
                Arc::new(fs)
            }
            StoreBackend::S3 => {
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(&config.bucket)
                    .with_allow_http(config.allow_http);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                let s3 = builder
                    .build()
                    .map_err(|e| StoreError::Config(e.to_string()))?;
                Arc::new(s3)
            }
        };
        info!(backend = ?config.backend, bucket = %config.bucket, "object store client ready");
        Ok(Self::new(inner, config.bucket.clone()))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store `bytes` at `key`, overwriting any previous object.
    pub async fn put(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        let path = object_path(key)?;
        let size = bytes.len();
        self.inner
            .put(&path, PutPayload::from(bytes))
            .await
            .map_err(|e| classify(key, e))?;
        debug!(%key, size, "object stored");
        Ok(())
    }

    /// Fetch the object at `key`. A missing key is [`StoreError::NotFound`].
    pub async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let path = object_path(key)?;
        let result = self.inner.get(&path).await.map_err(|e| classify(key, e))?;
        result.bytes().await.map_err(|e| classify(key, e))
    }

    /// Lazily list every key below `prefix`.
    ///
    /// The stream is finite and cannot be restarted; call again for a fresh
    /// view. An empty prefix lists the whole store.
    pub fn list_by_prefix(&self, prefix: &str) -> BoxStream<'_, StoreResult<String>> {
        let path = match Path::parse(prefix) {
            Ok(path) => path,
            Err(e) => {
                let err = StoreError::InvalidKey {
                    key: prefix.to_string(),
                    reason: e.to_string(),
                };
                return stream::once(async move { Err(err) }).boxed();
            }
        };
        let prefix = prefix.to_string();
        let prefix_path = (!prefix.trim_matches('/').is_empty()).then_some(path);
        self.inner
            .list(prefix_path.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .map_err(move |e| classify(&prefix, e))
            .boxed()
    }

    /// Collect [`list_by_prefix`](Self::list_by_prefix) into a vector.
    pub async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.list_by_prefix(prefix).try_collect().await
    }
}

fn object_path(key: &str) -> StoreResult<Path> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason: "key must be a non-empty relative path".to_string(),
        });
    }
    Path::parse(key).map_err(|e| StoreError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn classify(key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound(key.to_string()),
        other => StoreError::Backend(other),
    }
}
