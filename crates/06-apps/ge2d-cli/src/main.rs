//! Command-line driver that runs queueing workloads against the simulated
//! GE2D accelerator and prints what the engine did.

mod scenario;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ge2d_engine::EngineConfig;
use ge2d_sim::{SimConfig, SimRig};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Text rendering helpers used by the CLI commands.
mod render {
    use crate::scenario::{Report, Run};
    use std::fmt::Write;

    const MAX_RUNS: usize = 16;

    /// Format a scenario report for a terminal.
    pub fn report(report: &Report) -> String {
        let mut out = String::new();
        writeln!(out, "scenario:   {}", report.scenario).expect("write scenario");
        writeln!(
            out,
            "submitted:  {} (refused {} times) in {} ms",
            report.submitted, report.rejected, report.elapsed_ms
        )
        .expect("write submitted");
        if let Some(wait) = report.max_wait_us {
            writeln!(out, "max wait:   {wait} us").expect("write wait");
        }
        writeln!(
            out,
            "engine:     state={:?} contexts={} dispatched={} hw_timeouts={}",
            report.status.state,
            report.status.contexts,
            report.status.dispatched,
            report.status.hw_timeouts
        )
        .expect("write engine");
        let sim = &report.sim;
        writeln!(
            out,
            "sim:        starts={} completed={} hangs={} resets={} gated_writes={}",
            sim.starts, sim.completed, sim.hangs, sim.resets, sim.gated_writes
        )
        .expect("write sim");
        out.push_str(&service(&report.service));
        out
    }

    /// Format the per-context service order, eliding long tails.
    pub fn service(runs: &[Run]) -> String {
        let mut out = String::from("service:   ");
        for run in runs.iter().take(MAX_RUNS) {
            write!(out, " ctx#{}x{}", run.context, run.commands).expect("write run");
        }
        if runs.len() > MAX_RUNS {
            write!(out, " ... ({} more)", runs.len() - MAX_RUNS).expect("write tail");
        }
        out.push('\n');
        out
    }
}

/// Drive the GE2D work-queue engine against a simulated accelerator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run GE2D queueing scenarios", long_about = None)]
struct Cli {
    /// TOML file with `[engine]` and `[sim]` tables.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulated per-command latency in microseconds.
    #[arg(long, value_name = "US")]
    latency_us: Option<u64>,

    /// Command slots per context.
    #[arg(long)]
    capacity: Option<u32>,

    /// Hardware completion timeout in milliseconds.
    #[arg(long, value_name = "MS")]
    hw_timeout_ms: Option<u64>,

    /// Print the report as one JSON object per line.
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Scenario,
}

#[derive(Subcommand, Debug)]
enum Scenario {
    /// Concurrent submitters, one per context, retrying on backpressure.
    Flood {
        #[arg(long, default_value_t = 4)]
        contexts: u32,
        /// Commands per context.
        #[arg(long, default_value_t = 256)]
        commands: u32,
    },
    /// Pre-queued batches served in round-robin order.
    Fairness {
        #[arg(long, default_value_t = 4)]
        contexts: u32,
        /// Commands per context; at most the slot capacity.
        #[arg(long, default_value_t = 8)]
        commands: u32,
    },
    /// Overfill a stopped context and count the refusals.
    Backpressure {
        /// Submissions beyond the slot capacity.
        #[arg(long, default_value_t = 1)]
        extra: u32,
    },
    /// Blocking submissions, one at a time.
    Blocking {
        #[arg(long, default_value_t = 16)]
        commands: u32,
    },
    /// Blocking submissions with injected accelerator hangs.
    Hang {
        /// Leading commands that never complete.
        #[arg(long, default_value_t = 1)]
        hangs: u32,
        #[arg(long, default_value_t = 3)]
        commands: u32,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    engine: EngineConfig,
    sim: SimConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let (engine, sim) = load_config(&cli)?;
    info!(
        "slots={} hw_timeout={}ms latency={}us",
        engine.slot_capacity, engine.hw_timeout_ms, sim.latency_us
    );
    let rig = SimRig::new(engine, &sim).context("building simulated accelerator")?;

    let report = match cli.command {
        Scenario::Flood { contexts, commands } => scenario::flood(&rig, contexts, commands)?,
        Scenario::Fairness { contexts, commands } => {
            scenario::fairness(&rig, contexts, commands)?
        }
        Scenario::Backpressure { extra } => scenario::backpressure(&rig, extra)?,
        Scenario::Blocking { commands } => scenario::blocking(&rig, commands)?,
        Scenario::Hang { hangs, commands } => scenario::hang(&rig, hangs, commands)?,
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string(&report).context("serialising report")?
        );
    } else {
        print!("{}", render::report(&report));
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<(EngineConfig, SimConfig)> {
    let file = match &cli.config {
        Some(path) => read_config(path)?,
        None => FileConfig::default(),
    };
    let FileConfig {
        mut engine,
        mut sim,
    } = file;
    if let Some(latency) = cli.latency_us {
        sim.latency_us = latency;
    }
    if let Some(capacity) = cli.capacity {
        engine.slot_capacity = capacity;
    }
    if let Some(timeout) = cli.hw_timeout_ms {
        engine.hw_timeout_ms = timeout;
    }
    Ok((engine, sim))
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read config {path:?}"))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {path:?}"))
}
