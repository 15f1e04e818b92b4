//! One-shot `upload` / `download` commands.

use std::path::Path;

use anyhow::Context;
use aura_core::config::StoreBackend;
use aura_core::{AuraConfig, DeploymentId, KeyPrefix, Namespace};
use aura_store::ObjectStoreClient;
use aura_sync::TreeSync;
use tracing::{info, warn};

fn tree_sync(config: &AuraConfig) -> anyhow::Result<TreeSync> {
    if config.store.backend == StoreBackend::Memory {
        warn!("memory backend selected; transferred objects vanish when the process exits");
    }
    let client = ObjectStoreClient::from_config(&config.store).context("opening object store")?;
    Ok(TreeSync::new(client, config.sync.max_in_flight))
}

pub async fn upload(
    config: &AuraConfig,
    dir: &Path,
    id: &str,
    namespace: Namespace,
) -> anyhow::Result<()> {
    let id = DeploymentId::parse(id)?;
    let report = tree_sync(config)?
        .upload_tree(dir, namespace, &id)
        .await
        .with_context(|| format!("uploading {}", dir.display()))?;
    info!(%id, %namespace, files = report.files, bytes = report.bytes, "upload complete");
    Ok(())
}

pub async fn download(
    config: &AuraConfig,
    id: &str,
    dest: &Path,
    namespace: Namespace,
) -> anyhow::Result<()> {
    let prefix = KeyPrefix::new(namespace, DeploymentId::parse(id)?);
    let report = tree_sync(config)?
        .download_tree(&prefix, dest)
        .await
        .with_context(|| format!("downloading {prefix}"))?;
    info!(%prefix, files = report.files, bytes = report.bytes, "download complete");
    Ok(())
}
