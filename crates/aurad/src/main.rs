//! aurad — the Aura daemon.
//!
//! Assembles the whole pipeline in one process:
//! - Object store client (memory, local directory or S3)
//! - Lifecycle tracker (redb)
//! - Build queue + workers
//! - Deploy API (`POST /deploy`, `GET /status`)
//! - Static host (`<id>.<domain>`)
//!
//! # Usage
//!
//! ```text
//! aurad --config aura.toml standalone --api-port 3000 --hosting-port 3001
//! aurad upload ./site --id abc123
//! aurad download abc123 ./restore --namespace output
//! ```

mod standalone;
mod transfer;

use std::path::{Path, PathBuf};

use anyhow::Context;
use aura_core::{AuraConfig, Namespace};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aurad", about = "Aura deployment daemon")]
struct Cli {
    /// Path to `aura.toml`; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deploy API, build workers and static host together.
    Standalone {
        /// Deploy API port (overrides `[api].port`).
        #[arg(long)]
        api_port: Option<u16>,

        /// Static hosting port (overrides `[hosting].port`).
        #[arg(long)]
        hosting_port: Option<u16>,

        /// Data directory for the lifecycle database (overrides `[state].data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Upload a local directory tree under `<namespace>/<id>/`.
    Upload {
        dir: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long, default_value = "dist")]
        namespace: Namespace,
    },

    /// Download everything under `<namespace>/<id>/` into a directory.
    Download {
        id: String,

        dest: PathBuf,

        #[arg(long, default_value = "dist")]
        namespace: Namespace,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Standalone {
            api_port,
            hosting_port,
            data_dir,
        } => {
            if let Some(port) = api_port {
                config.api.port = port;
            }
            if let Some(port) = hosting_port {
                config.hosting.port = port;
            }
            if let Some(dir) = data_dir {
                config.state.data_dir = dir;
            }
            standalone::run_standalone(config).await
        }
        Command::Upload { dir, id, namespace } => {
            transfer::upload(&config, &dir, &id, namespace).await
        }
        Command::Download { id, dest, namespace } => {
            transfer::download(&config, &id, &dest, namespace).await
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aurad=debug,aura=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AuraConfig> {
    match path {
        Some(path) => AuraConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(AuraConfig::default()),
    }
}
