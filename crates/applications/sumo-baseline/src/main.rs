//! sumo-baseline - windowed SUMO baseline runs
//!
//! ## Usage
//!
//! ```bash
//! # 24 one-hour windows for seeds 0, 1 and 2, one hour warm-up, 8 at a time
//! sumo-baseline --seeds 0,1,2 --evaluation_interval 3600 --warmup_time 3600 --processes 8
//!
//! # Only write the configurations
//! sumo-baseline --seeds 0 --dry-run
//!
//! # Keep a JSON record and fail the shell pipeline if any run failed
//! sumo-baseline --seeds 0 --report-json batch.json --fail-on-error
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use sumo_baseline::{
    generate_jobs, BatchDispatcher, BatchParameters, BatchRecord, BatchReport,
    ConfigSynthesizer, DispatchConfig, EdgeDataOptions, SimulationPolicy, WindowPlanner,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Create SUMO configuration files per evaluation window and run them in parallel
#[derive(Parser, Debug)]
#[command(name = "sumo-baseline")]
#[command(about = "Create SUMO configuration files and run them in parallel", long_about = None)]
struct Cli {
    /// Seeds for simulation (comma-separated, e.g., 0,1,2)
    #[arg(
        long = "seeds",
        visible_alias = "s",
        value_delimiter = ',',
        default_value = "0",
        allow_hyphen_values = true
    )]
    seeds: Vec<i64>,

    /// Interval length [seconds]
    #[arg(long = "evaluation_interval", default_value_t = 3600, allow_negative_numbers = true)]
    evaluation_interval: i64,

    /// Warmup time in seconds
    #[arg(long = "warmup_time", default_value_t = 3600, allow_negative_numbers = true)]
    warmup_time: i64,

    /// Cooldown time in seconds
    #[arg(long = "cooldown_time", default_value_t = 0, allow_negative_numbers = true)]
    cooldown_time: i64,

    /// Number of parallel processes to run simulations
    #[arg(long, default_value_t = 4)]
    processes: usize,

    /// Simulation engine executable
    #[arg(long, default_value = "sumo")]
    engine: String,

    /// Extra argument passed to the engine after `-c <config>` (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Directory holding sumo_cfg/, edge_data_cfg/ and output/
    #[arg(long, default_value = ".")]
    artifact_root: PathBuf,

    /// JSON file overriding the simulation policy
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Kill a simulation after this many seconds
    #[arg(long)]
    job_timeout: Option<u64>,

    /// Write the batch record (parameters, report, outcomes) as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Generate configurations without running them
    #[arg(long)]
    dry_run: bool,

    /// Exit with status 1 if any simulation failed
    #[arg(long)]
    fail_on_error: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sumo_baseline=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Everything that can be rejected is rejected before any file is written
    let planner = WindowPlanner::new(cli.evaluation_interval, cli.warmup_time, cli.cooldown_time)?;

    let mut dispatch_config = DispatchConfig::new(&cli.engine).with_workers(cli.processes);
    for arg in &cli.engine_args {
        dispatch_config = dispatch_config.with_extra_arg(arg);
    }
    if let Some(secs) = cli.job_timeout {
        dispatch_config = dispatch_config.with_job_timeout(Duration::from_secs(secs));
    }
    let dispatcher = BatchDispatcher::new(dispatch_config)?;

    let policy = match &cli.policy {
        Some(path) => SimulationPolicy::from_json_file(path)
            .with_context(|| format!("failed to load policy {}", path.display()))?,
        None => SimulationPolicy::default(),
    };

    let synthesizer = ConfigSynthesizer::new(&cli.artifact_root, policy);
    let edge_data = EdgeDataOptions::with_period(planner.evaluation_interval());

    let started_at = chrono::Utc::now();
    let jobs = generate_jobs(&cli.seeds, &planner, &synthesizer, &edge_data)
        .context("failed to generate simulation configurations")?;

    info!(
        jobs = jobs.len(),
        seeds = ?cli.seeds,
        root = %synthesizer.layout().root().display(),
        "SUMO configuration files created"
    );

    if cli.dry_run {
        for job in &jobs {
            println!("{}", job.config_path.display());
        }
        info!("Dry run: skipping dispatch");
        return Ok(ExitCode::SUCCESS);
    }

    let outcomes = dispatcher.run(&jobs).await;
    let report = BatchReport::from_outcomes(&outcomes);
    print!("\n{}", report);

    if let Some(path) = &cli.report_json {
        let parameters = BatchParameters {
            seeds: cli.seeds.clone(),
            evaluation_interval: planner.evaluation_interval(),
            warmup_time: planner.warmup_time(),
            cooldown_time: planner.cooldown_time(),
            processes: cli.processes,
            engine: cli.engine.clone(),
        };
        let record = BatchRecord::new(started_at, parameters, outcomes);
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write batch record {}", path.display()))?;
        info!(path = %path.display(), batch_id = %record.batch_id, "Batch record written");
    }

    if !report.all_succeeded() {
        warn!(failed = report.failed_count(), "Some simulations failed");
        if cli.fail_on_error {
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}
