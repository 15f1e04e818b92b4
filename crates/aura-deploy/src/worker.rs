//! Build workers — produce a deployment's build output directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, bail};
use aura_core::Namespace;
use aura_core::config::BuildConfig;
use aura_sync::TreeSync;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::queue::BuildJob;

pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<PathBuf>> + Send + 'a>>;

/// Builds a repository and returns the directory holding its output.
pub trait BuildWorker: Send + Sync {
    fn build<'a>(&'a self, job: &'a BuildJob) -> BuildFuture<'a>;
}

/// Clones with `git` and builds with the configured commands.
pub struct ShellBuildWorker {
    config: BuildConfig,
    sync: TreeSync,
}

impl ShellBuildWorker {
    pub fn new(config: BuildConfig, sync: TreeSync) -> Self {
        Self { config, sync }
    }

    async fn run(&self, job: &BuildJob) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.config.work_dir)
            .await
            .with_context(|| format!("creating {}", self.config.work_dir.display()))?;
        let work_dir = fs::canonicalize(&self.config.work_dir)
            .await
            .with_context(|| format!("resolving {}", self.config.work_dir.display()))?;

        let checkout = work_dir.join(job.id.as_str());
        if fs::try_exists(&checkout).await.unwrap_or(false) {
            fs::remove_dir_all(&checkout)
                .await
                .with_context(|| format!("clearing {}", checkout.display()))?;
        }

        let clone_url = job.repo.clone_url();
        let checkout_arg = checkout.to_string_lossy().into_owned();
        info!(id = %job.id, repo = %clone_url, "cloning");
        run_command(
            &[
                "git".to_string(),
                "clone".to_string(),
                "--depth".to_string(),
                "1".to_string(),
                clone_url,
                checkout_arg,
            ],
            &work_dir,
        )
        .await?;

        // Clone metadata is not part of the site source.
        let git_dir = checkout.join(".git");
        if fs::try_exists(&git_dir).await.unwrap_or(false) {
            fs::remove_dir_all(&git_dir)
                .await
                .with_context(|| format!("removing {}", git_dir.display()))?;
        }

        if self.config.retain_source {
            let report = self
                .sync
                .upload_tree(&checkout, Namespace::Source, &job.id)
                .await
                .context("uploading source tree")?;
            debug!(id = %job.id, files = report.files, "source retained");
        }

        info!(id = %job.id, "building");
        run_command(&self.config.install, &checkout).await?;
        run_command(&self.config.build, &checkout).await?;

        let output = checkout.join(&self.config.output_dir);
        let meta = fs::metadata(&output)
            .await
            .with_context(|| format!("build produced no {}", output.display()))?;
        if !meta.is_dir() {
            bail!("build output {} is not a directory", output.display());
        }
        Ok(output)
    }
}

impl BuildWorker for ShellBuildWorker {
    fn build<'a>(&'a self, job: &'a BuildJob) -> BuildFuture<'a> {
        Box::pin(self.run(job))
    }
}

/// Run `argv` in `cwd`, failing on a non-zero exit with the tail of stderr.
pub(crate) async fn run_command(argv: &[String], cwd: &Path) -> anyhow::Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("empty command");
    };
    let line = argv.join(" ");
    debug!(command = %line, cwd = %cwd.display(), "running");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("spawning `{line}`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<_> = stderr.lines().rev().take(20).collect();
        let tail: Vec<_> = tail.into_iter().rev().collect();
        bail!("`{line}` exited with {}: {}", output.status, tail.join("\n"));
    }
    Ok(())
}
