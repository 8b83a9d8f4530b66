//! `scout` – command line entry point for the rover autonomy stack.
//!
//! Loads `~/.scout/config.toml` (or `--config`), initialises logging and
//! drives a simulated sample-return mission through the control loop.
//! Ctrl-C stops the mission after the current tick and still prints the
//! summary.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use scout_decision::DecisionEngine;
use scout_hal::sim::SimRig;
use scout_runtime::{ControlLoop, MissionSummary, TracingSink, init_tracing};

/// Scout: a sample-return rover's autonomy loop, driven against a simulator.
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (defaults to ~/.scout/config.toml)
    #[arg(short, long, global = true, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated mission
    Run {
        /// Tick limit; overrides `mission.max_ticks`
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Run perception and decision as separate tasks
        #[arg(long, default_value_t = false)]
        pipelined: bool,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(config::config_path);

    let result = match cli.command {
        Commands::Run { ticks, pipelined } => run(&path, ticks, pipelined),
        Commands::Init { force } => init(&path, force),
        Commands::ShowConfig => show_config(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn run(path: &Path, ticks: Option<u64>, pipelined: bool) -> Result<(), String> {
    let cfg = config::load_effective(path)?;
    let _guard = init_tracing("scout", cfg.logging.format);

    print_banner();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this tick …".yellow().bold());
        shutdown_flag.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the mission can only end at its tick limit");
    }

    let engine = DecisionEngine::new(cfg.decision.clone()).map_err(|e| e.to_string())?;
    let hw = SimRig::mission(cfg.mission.seed_samples).build();
    let mut control = ControlLoop::new(hw.camera, hw.drive, engine).with_sink(TracingSink);
    if let Some(period) = cfg.mission.period() {
        control = control.with_period(period);
    }
    let max_ticks = ticks.unwrap_or(cfg.mission.max_ticks);

    println!(
        "  Mission: {} ticks, {} samples seeded{}\n",
        max_ticks.to_string().bold(),
        cfg.mission.seed_samples.to_string().bold(),
        if pipelined { ", pipelined" } else { "" }
    );

    let summary = if pipelined {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| format!("Failed to start tokio runtime: {e}"))?;
        runtime.block_on(control.run_pipelined(max_ticks, Arc::clone(&shutdown)))
    } else {
        control.run(max_ticks, &shutdown)
    }
    .map_err(|e| e.to_string())?;

    print_summary(&summary, cfg.mission.seed_samples);
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "config already exists at {} (pass --force to overwrite)",
            path.display()
        ));
    }
    config::save_to(&config::Config::default(), path)?;
    println!(
        "  {} Default configuration written to {}",
        "✓".green(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn show_config(path: &Path) -> Result<(), String> {
    let cfg = config::load_effective(path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, defaults)", path.display())
    };
    println!("# {}", source.dimmed());
    print!("{}", config::to_toml(&cfg)?);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║            Scout Rover               ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
}

fn print_summary(summary: &MissionSummary, seeded: usize) {
    let collected = format!("{}/{}", summary.samples_collected, seeded);
    let collected = if summary.samples_collected > 0 {
        collected.green().bold()
    } else {
        collected.yellow().bold()
    };

    println!();
    println!("{}", "  Mission summary".bold().underline());
    println!("    Ticks run        {}", summary.ticks);
    if summary.rejected_ticks > 0 {
        println!(
            "    Rejected ticks   {}",
            summary.rejected_ticks.to_string().red()
        );
    }
    println!("    Samples          {}", collected);
    println!("    Pickup requests  {}", summary.pickups_requested);
    println!("    Mode changes     {}", summary.mode_changes);
    println!("    Cells explored   {}", summary.explored_cells);
    println!("    Final mode       {}", summary.final_mode.to_string().cyan());
    println!(
        "    Final pose       ({:.1}, {:.1}) heading {:.0}°",
        summary.final_pose.x, summary.final_pose.y, summary.final_pose.yaw_deg
    );
    println!();
}
