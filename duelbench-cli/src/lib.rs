#![warn(missing_docs)]
//! DuelBench CLI Library
//!
//! This module provides the CLI infrastructure for harness binaries.
//! Call `duelbench::run(&suite)` (or `duelbench_cli::run(&suite)`) in your
//! main function. The same binary acts as master and, when re-launched with
//! `--worker`, as the worker for a single system.
//!
//! # Example
//!
//! ```ignore
//! use duelbench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new("stores")
//!         .system(SystemDef::new("btree", "BTreeMap", btree_workload))
//!         .system(SystemDef::new("hash", "HashMap", hash_workload));
//!     duelbench_cli::run(&suite)
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::*;
pub use executor::{
    DuelOutcome, SystemRun, build_report, build_report_meta, execute_plan, format_human_output,
    render_output,
};
pub use planner::{PlanError, RunPlan, build_plan};
pub use supervisor::*;

use clap::{Parser, Subcommand, ValueEnum};
use duelbench_core::{Suite, WorkerMain};
use duelbench_ipc::{EXIT_FATAL_ABORT, EXIT_WORKER_ERROR, LineWriter};
use duelbench_report::OutputFormat;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Test kinds a worker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestType {
    /// Timed steps with allocation tracking
    Performance,
}

/// DuelBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "duelbench")]
#[command(author, version, about = "DuelBench - head-to-head benchmark harness")]
pub struct Cli {
    /// Optional subcommand; defaults to running the duel
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Iterations each worker runs (default: duel.toml, else 5)
    #[arg(long, short = 'n')]
    pub iterations: Option<u64>,

    /// Reference system id (default: first registered)
    #[arg(long)]
    pub baseline: Option<String>,

    /// Evaluated system id (default: first registered other than the baseline)
    #[arg(long)]
    pub candidate: Option<String>,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Bound on each worker run, e.g. "300s" or "5m"; "0" waits indefinitely
    #[arg(long)]
    pub timeout: Option<String>,

    /// Configuration file (default: discover duel.toml upwards from the cwd)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Run as worker process (used by supervisor)
    #[arg(long, hide = true)]
    pub worker: bool,

    /// Internal: Kind of test the worker runs
    #[arg(long, hide = true, value_enum)]
    pub test_type: Option<TestType>,

    /// Internal: System the worker exercises
    #[arg(long, hide = true)]
    pub system: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered systems
    List,
    /// Run the duel (default)
    Run,
    /// Print a default duel.toml
    Init,
}

/// Run the DuelBench CLI with the process arguments.
/// This is the main entry point for harness binaries.
pub fn run(suite: &Suite) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, suite)
}

/// Run the DuelBench CLI with pre-parsed arguments.
///
/// Worker mode and fatal worker failures end the process with the matching
/// exit status instead of returning.
pub fn run_with_cli(cli: Cli, suite: &Suite) -> anyhow::Result<()> {
    init_logging(cli.verbose);

    // Handle worker mode first (before any master-side initialization)
    if cli.worker {
        std::process::exit(run_worker_mode(&cli, suite));
    }

    match cli.command {
        Some(Commands::List) => list_systems(suite),
        Some(Commands::Init) => {
            print!("{}", DuelConfig::default_toml());
            Ok(())
        }
        Some(Commands::Run) | None => run_duel(&cli, suite),
    }
}

/// Logs go to stderr in both modes; a worker's stdout carries only protocol lines.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "duelbench=debug"
    } else {
        "duelbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Ignored when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run as a worker process and return its exit status
fn run_worker_mode(cli: &Cli, suite: &Suite) -> i32 {
    run_worker(cli, suite, std::io::stdout())
}

/// Worker dispatch from parsed arguments, reporting protocol lines to `out`
fn run_worker<W: Write>(cli: &Cli, suite: &Suite, out: W) -> i32 {
    let Some(system) = cli.system.as_deref() else {
        let mut writer = LineWriter::new(out);
        if let Err(e) = writer.write_error("worker started without --system") {
            tracing::error!(error = %e, "could not report worker failure");
        }
        return EXIT_WORKER_ERROR;
    };

    let test_type = cli.test_type.unwrap_or(TestType::Performance);
    let iterations = cli.iterations.unwrap_or(RunnerConfig::default().iterations);
    tracing::debug!(system, ?test_type, iterations, "worker starting");

    WorkerMain::with_writer(out).execute(suite, system, iterations)
}

fn list_systems(suite: &Suite) -> anyhow::Result<()> {
    println!("DuelBench suite: {}", suite.name());
    for (index, system) in suite.systems().iter().enumerate() {
        let role = match index {
            0 => " (default baseline)",
            1 => " (default candidate)",
            _ => "",
        };
        println!("├── {} - {}{}", system.id, system.name, role);
    }
    println!("{} systems registered.", suite.systems().len());
    Ok(())
}

/// Layer configuration: duel.toml values, then CLI overrides
fn load_config(cli: &Cli) -> anyhow::Result<DuelConfig> {
    match &cli.config {
        Some(path) => DuelConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e)),
        None => Ok(DuelConfig::discover().unwrap_or_default()),
    }
}

fn run_duel(cli: &Cli, suite: &Suite) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(anyhow::Error::msg)?;
    let iterations = cli.iterations.unwrap_or(config.runner.iterations);
    let timeout = match cli.timeout.as_deref() {
        Some(s) => parse_timeout(s)?,
        None => config.timeout()?,
    };

    let plan = build_plan(
        suite,
        cli.baseline.as_deref().or(config.systems.baseline.as_deref()),
        cli.candidate.as_deref().or(config.systems.candidate.as_deref()),
        iterations,
        timeout,
    )?;

    eprintln!(
        "Running {} vs {} ({} iterations each, isolated workers)...\n",
        plan.baseline.id, plan.candidate.id, plan.iterations
    );

    let supervisor = Supervisor::new(WorkerCommand::current_exe()?, plan.iterations)
        .with_timeout(plan.timeout);

    let outcome = match execute_plan(&supervisor, &plan) {
        Ok(outcome) => outcome,
        Err(e) => fatal_abort(&e),
    };

    let meta = build_report_meta(suite, plan.iterations);
    let output = render_output(&outcome, format, meta)?;

    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        eprintln!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    Ok(())
}

/// Print everything the failed worker said, then abandon the run.
fn fatal_abort(err: &SupervisorError) -> ! {
    tracing::error!(error = %err, "aborting run");
    eprintln!("\nError: {err}");

    if let Some(message) = err.worker_message() {
        eprintln!("Worker reported: {message}");
    }
    if let Some((stdout, stderr)) = err.captured_output() {
        if !stdout.trim().is_empty() {
            eprintln!("\n--- worker stdout ---\n{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            eprintln!("\n--- worker stderr ---\n{}", stderr.trim_end());
        }
    }

    std::process::exit(EXIT_FATAL_ABORT);
}
