//! stowaged — batch backups of container filesystems.
//!
//! # Usage
//!
//! ```text
//! stowaged run --config /srv/stowage/stowage.toml
//! stowaged status
//! stowaged check-config
//! ```
//!
//! Meant to be invoked periodically by an external scheduler (cron, a
//! systemd timer). Concurrent runs against the same archive directory
//! are not supported.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SubsecRound, Utc};
use clap::{Parser, Subcommand};
use stowage_core::config::CONFIG_FILENAME;
use stowage_core::{ArchiveLayout, BackupConfig, ConfigSource, RunLog};
use stowage_runtime::DockerRuntime;
use stowage_state::StateStore;
use stowaged::{Orchestrator, logging, status};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "stowaged", about = "Stowage container backup runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Perform one backup run.
    Run {
        /// Path to stowage.toml.
        #[arg(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
    },
    /// Print the instance table.
    Status {
        #[arg(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
    },
    /// Validate the configuration and print the effective values.
    CheckConfig {
        #[arg(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Status { config } => show_status(&config),
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn load_config(path: &Path) -> anyhow::Result<(BackupConfig, ConfigSource)> {
    BackupConfig::load(path).with_context(|| format!("invalid configuration {}", path.display()))
}

async fn run(config_path: &Path) -> anyhow::Result<()> {
    let now = Utc::now().trunc_subsecs(0);
    let (config, source) = load_config(config_path)?;

    let layout = ArchiveLayout::new(&config.archive_dir_path);
    let created_root = layout
        .bootstrap()
        .with_context(|| format!("cannot create {}", layout.root.display()))?;
    logging::init(Some(&layout.log_file_path(now)))?;

    let mut log = RunLog::new();
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "configuration loaded"),
        ConfigSource::Defaults(path) => log.info(format!(
            "No configuration found at {}, using defaults.",
            path.display()
        )),
    }
    if created_root {
        log.warn(format!(
            "Archive directory {} did not exist and was created.",
            layout.root.display()
        ));
    }
    debug!(?config, "effective configuration");

    let runtime = DockerRuntime::from_host(&config.docker_host)
        .with_context(|| format!("invalid docker_host {:?}", config.docker_host))?;
    let notifier = stowage_notify::from_config(config.telegram.as_ref());

    Orchestrator::new(&config, &layout, &runtime, notifier.as_ref())
        .run(now, &mut log)
        .await?;
    Ok(())
}

fn show_status(config_path: &Path) -> anyhow::Result<()> {
    let (config, _) = load_config(config_path)?;
    let layout = ArchiveLayout::new(&config.archive_dir_path);
    let mut log = RunLog::new();

    let dir = StateStore::new(&layout.state_path)
        .load(&mut log)
        .context("loading instance table")?;
    println!("{}", status::render(&dir));
    for message in log.messages(stowage_core::Level::Error) {
        eprintln!("{message}");
    }
    Ok(())
}

fn check_config(config_path: &Path) -> anyhow::Result<()> {
    let (config, source) = load_config(config_path)?;
    match source {
        ConfigSource::File(path) => println!("# loaded from {}", path.display()),
        ConfigSource::Defaults(path) => {
            println!("# {} not found, showing defaults", path.display())
        }
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
