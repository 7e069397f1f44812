//! RTM CLI - forward-wavefield checkpointing for reverse-time migration
//!
//! # Commands
//!
//! - `rtm replay` - Run one synthetic shot forward, then replay it backward
//!   through the checkpoint engine while imaging
//! - `rtm check` - Show the resolved configuration and self-test the
//!   workspace and codec
//!
//! Settings resolve as command line, then `RTM_*` environment variables,
//! then the optional TOML file, then defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtm_checkpoint::{build_config, ConfigOverrides};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Reverse-time migration checkpoint engine
#[derive(Parser, Debug)]
#[command(name = "rtm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory under which run workspaces are created
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Compress spilled frames
    #[arg(long, global = true)]
    compression: bool,

    /// Codec error bound
    #[arg(long, global = true)]
    tolerance: Option<f32>,

    /// Interpret the tolerance relative to each frame's peak amplitude
    #[arg(long, global = true)]
    relative: bool,

    /// Codec worker threads
    #[arg(long, global = true)]
    parallelism: Option<usize>,

    /// Cap on resident frames
    #[arg(long, global = true)]
    max_resident_frames: Option<usize>,

    /// Resident buffer budget in megabytes
    #[arg(long, global = true)]
    memory_budget_mb: Option<usize>,

    /// Leave the run workspace on disk
    #[arg(long, global = true)]
    keep_workspace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic shot forward and replay it backward
    Replay(commands::replay::ReplayArgs),

    /// Check configuration, workspace and codec
    Check,
}

impl From<&Cli> for ConfigOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            config_file: cli.config.clone(),
            workspace_root: cli.workspace.clone(),
            compression: cli.compression.then_some(true),
            tolerance: cli.tolerance,
            parallelism: cli.parallelism,
            relative: cli.relative.then_some(true),
            max_resident_frames: cli.max_resident_frames,
            memory_budget_mb: cli.memory_budget_mb,
            keep_workspace: cli.keep_workspace.then_some(true),
            log_level: cli.log_level.clone(),
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&ConfigOverrides::from(&cli)).context("invalid configuration")?;

    init_tracing(config.log_level.as_filter_str());
    tracing::debug!(?config, "configuration resolved");

    match &cli.command {
        Commands::Replay(args) => commands::replay::run(&config, args),
        Commands::Check => commands::check::run(&config),
    }
}
