//! aura.toml configuration parser.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working single-node setup backed by an in-memory store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::id::{DEFAULT_ID_LEN, DeploymentId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuraConfig {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    pub api: ApiConfig,
    pub hosting: HostingConfig,
    pub repo: RepoConfig,
    pub build: BuildConfig,
    pub state: StateConfig,
}

/// Which object store backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub bucket: String,
    /// Root directory for the `local` backend.
    pub root: Option<PathBuf>,
    /// Custom S3-compatible endpoint (R2, MinIO, ...).
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub allow_http: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            bucket: "aura-deploy".to_string(),
            root: None,
            endpoint: None,
            region: None,
            allow_http: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on concurrent file transfers per tree operation.
    pub max_in_flight: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { max_in_flight: 16 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingConfig {
    /// Port the static host listens on.
    pub port: u16,
    /// Domain under which `<id>.<base_domain>` sites are published.
    pub base_domain: String,
    pub scheme: String,
    /// Port advertised in deployed URLs; `None` for the scheme default.
    pub public_port: Option<u16>,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            base_domain: "localhost".to_string(),
            scheme: "http".to_string(),
            public_port: Some(3001),
        }
    }
}

impl HostingConfig {
    /// Public URL of a deployed site's index document.
    pub fn deployed_url(&self, id: &DeploymentId) -> String {
        match self.public_port {
            Some(port) => format!("{}://{}.{}:{}/index.html", self.scheme, id, self.base_domain, port),
            None => format!("{}://{}.{}/index.html", self.scheme, id, self.base_domain),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub allowed_hosts: Vec<String>,
    pub id_length: usize,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec!["github.com".to_string()],
            id_length: DEFAULT_ID_LEN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Scratch directory; each deployment builds in `<work_dir>/<id>`.
    pub work_dir: PathBuf,
    /// Build output directory, relative to the cloned repository.
    pub output_dir: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub install: Vec<String>,
    pub build: Vec<String>,
    /// Upload the cloned source under the `output` namespace before building.
    pub retain_source: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("output"),
            output_dir: "dist".to_string(),
            workers: 2,
            queue_capacity: 64,
            install: vec!["npm".to_string(), "install".to_string()],
            build: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            retain_source: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub data_dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/aura"),
        }
    }
}

impl AuraConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AuraConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
