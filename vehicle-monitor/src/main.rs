/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use vehicle_monitor::clock::MonotonicClock;
use vehicle_monitor::config::SystemConfig;
use vehicle_monitor::report::LogReporter;
use vehicle_monitor::scheduler::{SchedulerReport, SchedulingMode, ShutdownSignal};
use vehicle_monitor::vehicle::build_scheduler;

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Cooperative,
    Preemptive,
}

impl From<ModeArg> for SchedulingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Cooperative => SchedulingMode::Cooperative,
            ModeArg::Preemptive => SchedulingMode::Preemptive,
        }
    }
}

/// Simulated vehicle sensor monitor on a fixed-priority periodic scheduler.
///
/// Example:
///   vehicle-monitor --config vehicle.yaml --mode cooperative --duration-ms 5000
#[derive(Debug, Parser)]
#[command(
    name = "vehicle-monitor",
    about = "Fixed-priority periodic scheduler driving a simulated vehicle monitor",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML system configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Scheduling mode; overrides the configuration file.
    #[arg(short = 'm', long = "mode", value_enum)]
    mode: Option<ModeArg>,

    /// Stop after this many milliseconds.  Runs until Ctrl-C when absent.
    #[arg(long = "duration-ms")]
    duration_ms: Option<u64>,

    /// Seed for the simulated sensors; overrides the configuration file.
    #[arg(long = "seed")]
    seed: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config      = ?cli.config,
        mode        = ?cli.mode,
        duration_ms = ?cli.duration_ms,
        seed        = ?cli.seed,
        "vehicle-monitor starting up"
    );

    match run(cli).await {
        Ok(report) => report.log(),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<SchedulerReport> {
    // ── Load configuration ────────────────────────────────────────────────────
    let mut cfg = match &cli.config {
        Some(path) => SystemConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using the default vehicle workload");
            SystemConfig::default()
        }
    };
    if let Some(mode) = cli.mode {
        cfg.mode = mode.into();
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }

    // ── Build and start the scheduler ─────────────────────────────────────────
    let scheduler = build_scheduler(&cfg, Arc::new(MonotonicClock::new()), Box::new(LogReporter))
        .context("Failed to build the vehicle workload")?;

    let shutdown = ShutdownSignal::new();
    let run_signal = shutdown.clone();
    let mut runner = tokio::task::spawn_blocking(move || scheduler.run(&run_signal));

    let stop_after = async {
        match cli.duration_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };

    // ── Wait for a stop condition ─────────────────────────────────────────────
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Cannot listen for Ctrl-C: {e}");
            }
            info!("Ctrl-C received, shutting down");
        }
        _ = stop_after => {
            info!(duration_ms = ?cli.duration_ms, "run duration elapsed, shutting down");
        }
        res = &mut runner => {
            // the scheduler only returns early when it refused to start
            return Ok(res.context("scheduler thread panicked")??);
        }
    }

    shutdown.trigger();
    let report = runner.await.context("scheduler thread panicked")??;
    Ok(report)
}
