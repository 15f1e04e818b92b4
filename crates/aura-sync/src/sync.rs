//! TreeSync — uploads and downloads deployment trees.

use std::future::Future;
use std::path::{Path, PathBuf};

use aura_core::{DeploymentId, KeyPrefix, Namespace, RelativePath, StorageKey, ValidationError};
use aura_store::ObjectStoreClient;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{SyncError, TransferError};
use crate::walk::collect_files;

/// Totals for a completed tree operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub files: usize,
    pub bytes: u64,
}

/// Moves directory trees to and from the object store.
///
/// Holds no per-operation state, so one `TreeSync` can serve concurrent
/// operations for different deployments.
#[derive(Debug, Clone)]
pub struct TreeSync {
    client: ObjectStoreClient,
    max_in_flight: usize,
}

impl TreeSync {
    /// Create a synchronizer allowing at most `max_in_flight` concurrent
    /// transfers per operation (at least one).
    pub fn new(client: ObjectStoreClient, max_in_flight: usize) -> Self {
        Self {
            client,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn client(&self) -> &ObjectStoreClient {
        &self.client
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Upload every regular file below `local_root` to
    /// `<namespace>/<id>/<relative-path>`.
    ///
    /// Every path is mapped before the first transfer starts, so an
    /// unmappable file name fails the operation without touching the store.
    pub async fn upload_tree(
        &self,
        local_root: &Path,
        namespace: Namespace,
        id: &DeploymentId,
    ) -> Result<SyncReport, SyncError> {
        let prefix = KeyPrefix::new(namespace, id.clone());
        let files = collect_files(local_root).await?;

        let mut plan = Vec::with_capacity(files.len());
        for file in files {
            let rel = RelativePath::from_local(local_root, &file)?;
            plan.push((file, prefix.key(&rel)));
        }

        info!(
            root = %local_root.display(),
            %prefix,
            files = plan.len(),
            "uploading tree"
        );

        let transfers = plan
            .into_iter()
            .map(|(path, key)| upload_file(&self.client, path, key));
        let report = run_transfers(transfers, self.max_in_flight).await?;

        info!(%prefix, files = report.files, bytes = report.bytes, "tree uploaded");
        Ok(report)
    }

    /// Download every object under `prefix` into `local_root`.
    ///
    /// Keys are validated before anything is written; a key whose remainder
    /// is not a safe relative path fails the whole operation up front.
    pub async fn download_tree(
        &self,
        prefix: &KeyPrefix,
        local_root: &Path,
    ) -> Result<SyncReport, SyncError> {
        let prefix_str = prefix.to_string();
        let keys = self
            .client
            .list_keys(&prefix_str)
            .await
            .map_err(|source| SyncError::List {
                prefix: prefix_str.clone(),
                source,
            })?;

        let mut plan = Vec::with_capacity(keys.len());
        for key in keys {
            let rest = prefix.strip(&key).ok_or_else(|| ValidationError::OutsideRoot {
                path: key.clone(),
                root: prefix_str.clone(),
            })?;
            let dest = RelativePath::parse(rest)?.to_local(local_root);
            plan.push((key, dest));
        }

        if plan.is_empty() {
            debug!(prefix = %prefix_str, "nothing to download");
            return Ok(SyncReport::default());
        }

        info!(
            prefix = %prefix_str,
            root = %local_root.display(),
            files = plan.len(),
            "downloading tree"
        );

        let transfers = plan
            .into_iter()
            .map(|(key, dest)| download_object(&self.client, key, dest));
        let report = run_transfers(transfers, self.max_in_flight).await?;

        info!(prefix = %prefix_str, files = report.files, bytes = report.bytes, "tree downloaded");
        Ok(report)
    }
}

async fn upload_file(
    client: &ObjectStoreClient,
    path: PathBuf,
    key: StorageKey,
) -> Result<u64, TransferError> {
    let data = fs::read(&path)
        .await
        .map_err(|source| TransferError::Read { path, source })?;
    let size = data.len() as u64;
    client
        .put(key.as_str(), Bytes::from(data))
        .await
        .map_err(|source| TransferError::Store {
            key: key.to_string(),
            source,
        })?;
    debug!(%key, size, "uploaded");
    Ok(size)
}

async fn download_object(
    client: &ObjectStoreClient,
    key: String,
    dest: PathBuf,
) -> Result<u64, TransferError> {
    let data = client
        .get(&key)
        .await
        .map_err(|source| TransferError::Store {
            key: key.clone(),
            source,
        })?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| TransferError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    fs::write(&dest, &data)
        .await
        .map_err(|source| TransferError::Write {
            path: dest.clone(),
            source,
        })?;
    debug!(%key, dest = %dest.display(), size = data.len(), "downloaded");
    Ok(data.len() as u64)
}

/// Drive `transfers` with at most `limit` in flight and wait for all of them.
///
/// The first failure does not cancel the rest; the error reports how many
/// failed and carries the first one.
async fn run_transfers<I, F>(transfers: I, limit: usize) -> Result<SyncReport, SyncError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<u64, TransferError>>,
{
    let results: Vec<_> = stream::iter(transfers)
        .buffer_unordered(limit)
        .collect()
        .await;

    let total = results.len();
    let mut report = SyncReport::default();
    let mut failed = 0;
    let mut first = None;
    for result in results {
        match result {
            Ok(size) => {
                report.files += 1;
                report.bytes += size;
            }
            Err(e) => {
                warn!(error = %e, "transfer failed");
                failed += 1;
                first.get_or_insert(e);
            }
        }
    }

    match first {
        Some(first) => Err(SyncError::Transfer {
            failed,
            total,
            first: Box::new(first),
        }),
        None => Ok(report),
    }
}
