// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fm: drive a fleet of coding agents against a goal.

mod status;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fm_adapters::ProcessAdapter;
use fm_bus::Phase;
use fm_core::{Config, SystemClock};
use fm_engine::Coordinator;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fm", about = "Foreman: hybrid multi-agent coordinator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start (or resume) a run for a goal
    Run {
        /// Goal handed to the decomposer
        goal: String,
        /// YAML configuration file
        #[arg(short, long, default_value = "fm.yaml")]
        config: PathBuf,
        /// Resume the run in the configured run directory
        #[arg(long)]
        resume: bool,
    },
    /// Render the latest state snapshot
    Status {
        /// Run directory (defaults to the config's run_dir)
        #[arg(long, default_value = ".fm/run")]
        run_dir: PathBuf,
    },
    /// Print the tail of the events journal
    Events {
        #[arg(long, default_value = ".fm/run")]
        run_dir: PathBuf,
        /// Number of trailing events
        #[arg(short = 'n', long, default_value_t = 50)]
        tail: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fm=info,warn")),
        )
        .init();

    match Cli::parse().command {
        Command::Run { goal, config, resume } => run(goal, config, resume).await,
        Command::Status { run_dir } => status::print_status(&run_dir),
        Command::Events { run_dir, tail } => status::print_events(&run_dir, tail),
    }
}

async fn run(goal: String, config_path: PathBuf, resume: bool) -> anyhow::Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let adapter = ProcessAdapter::new(SystemClock);
    let mut coordinator = Coordinator::new(config, goal, resume, adapter, SystemClock)?;
    tracing::info!(run_id = %coordinator.run_id(), "run starting");

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    let phase = coordinator.run().await?;
    match phase {
        Phase::Completed => {
            tracing::info!("run completed");
            Ok(())
        }
        other => bail!("run finished in phase {other}"),
    }
}
