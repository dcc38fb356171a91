//! Parallel batch dispatch to the simulation engine
//!
//! Every job runs `<engine> -c <config> [extra args]` in its own OS process,
//! driven from its own tokio task. At most `workers` jobs run at once and
//! the outcomes come back in the order the jobs were given, whatever order
//! they finish in.
//!
//! ```text
//! Pending ──► Running ──┬──► Succeeded   (exit code 0)
//!                       └──► Failed      (exit code != 0, or -1 when the
//!                                         engine could not be run)
//! ```
//!
//! A failing job never aborts the batch: spawn errors, non-zero exits,
//! timeouts and even a panicking worker task all end up as a `Failed`
//! outcome for that job only. Nothing is retried.

use crate::error::{BaselineError, Result};
use crate::synth::{JobDescriptor, JobId};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Exit code recorded when the engine could not be run at all
pub const INVOCATION_FAILED_EXIT_CODE: i32 = -1;

/// Default engine executable
pub const DEFAULT_ENGINE: &str = "sumo";

/// Default number of concurrent jobs
pub const DEFAULT_WORKERS: usize = 4;

/// Engine invocation and pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Engine executable (looked up on PATH)
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments appended after `-c <config>`
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Number of concurrent jobs
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Kill a job after this long. `None` waits forever.
    #[serde(default)]
    pub job_timeout: Option<Duration>,
}

fn default_program() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: Vec::new(),
            workers: default_workers(),
            job_timeout: None,
        }
    }
}

impl DispatchConfig {
    /// Config for an engine executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Set worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Append an engine argument
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Set per-job timeout
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BaselineError::invalid("processes must be >= 1, got 0"));
        }
        if self.program.trim().is_empty() {
            return Err(BaselineError::invalid("engine executable must not be empty"));
        }
        if self.job_timeout == Some(Duration::ZERO) {
            return Err(BaselineError::invalid("job timeout must be > 0"));
        }
        Ok(())
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Waiting for a worker slot
    Pending,
    /// Engine process running
    Running,
    /// Engine exited with code 0
    Succeeded,
    /// Engine failed or could not be run
    Failed,
}

impl JobState {
    /// Succeeded and Failed are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }
}

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Engine could not be started, or the worker task died
    Invocation,
    /// Engine exited non-zero or was killed by a signal
    Execution,
    /// Engine exceeded the job timeout and was killed
    TimedOut,
}

/// Terminal result of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Job identity
    pub job: JobId,
    /// Configuration passed to the engine
    pub config_path: PathBuf,
    /// Terminal state
    pub state: JobState,
    /// Engine exit code, [`INVOCATION_FAILED_EXIT_CODE`] if there is none
    pub exit_code: i32,
    /// Failure classification, `None` on success
    pub failure: Option<FailureKind>,
    /// Error message or last line of engine stderr
    pub detail: Option<String>,
    /// Wall-clock time of the job (seconds)
    pub duration_secs: f64,
}

impl JobOutcome {
    /// Check if the job succeeded
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    fn succeeded(job: &JobDescriptor, duration: Duration) -> Self {
        Self {
            job: job.id,
            config_path: job.config_path.clone(),
            state: JobState::Succeeded,
            exit_code: 0,
            failure: None,
            detail: None,
            duration_secs: duration.as_secs_f64(),
        }
    }

    fn failed(
        job: JobId,
        config_path: PathBuf,
        kind: FailureKind,
        exit_code: i32,
        detail: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            job,
            config_path,
            state: JobState::Failed,
            exit_code,
            failure: Some(kind),
            detail,
            duration_secs: duration.as_secs_f64(),
        }
    }
}

/// Runs batches of jobs against the engine
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    config: Arc<DispatchConfig>,
}

impl BatchDispatcher {
    /// Create a dispatcher, rejecting a zero worker count
    pub fn new(config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Dispatch settings
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every job and wait for all of them.
    ///
    /// Returns one outcome per job, in input order.
    pub async fn run(&self, jobs: &[JobDescriptor]) -> Vec<JobOutcome> {
        info!(
            jobs = jobs.len(),
            workers = self.config.workers,
            engine = %self.config.program,
            "Running simulations"
        );

        // Slots are refilled as soon as any job finishes; order is restored below
        let mut indexed: Vec<(usize, JobOutcome)> =
            futures::stream::iter(jobs.iter().cloned().enumerate())
                .map(|(index, job)| {
                    let config = Arc::clone(&self.config);
                    async move {
                        let id = job.id;
                        let config_path = job.config_path.clone();
                        debug!(job = %id, state = ?JobState::Pending, "Job queued");
    
                        let outcome = match tokio::spawn(run_job(config, job)).await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                error!(job = %id, error = %e, "Worker task failed");
                                JobOutcome::failed(
                                    id,
                                    config_path,
                                    FailureKind::Invocation,
                                    INVOCATION_FAILED_EXIT_CODE,
                                    Some(format!("worker task failed: {}", e)),
                                    Duration::ZERO,
                                )
                            }
                        };
                        (index, outcome)
                    }
                })
                .buffer_unordered(self.config.workers)
                .collect()
                .await;

        indexed.sort_unstable_by_key(|(index, _)| *index);
        let outcomes: Vec<JobOutcome> = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            succeeded,
            failed = outcomes.len() - succeeded,
            "Batch completed"
        );

        outcomes
    }
}

async fn run_job(config: Arc<DispatchConfig>, job: JobDescriptor) -> JobOutcome {
    debug_assert!(JobState::Pending.can_transition_to(JobState::Running));
    debug!(job = %job.id, state = ?JobState::Running, "Starting engine");

    let started = Instant::now();

    let mut command = Command::new(&config.program);
    command
        .arg("-c")
        .arg(&job.config_path)
        .args(&config.extra_args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    // Ok(None) means the timeout fired; dropping the future kills the child.
    let result = match config.job_timeout {
        Some(limit) => match tokio::time::timeout(limit, command.output()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        },
        None => command.output().await.map(Some),
    };
    let elapsed = started.elapsed();

    let outcome = match result {
        Ok(Some(output)) if output.status.success() => JobOutcome::succeeded(&job, elapsed),
        Ok(Some(output)) => {
            let exit_code = output.status.code().unwrap_or(INVOCATION_FAILED_EXIT_CODE);
            let detail = last_line(&output.stderr)
                .or_else(|| output.status.code().is_none().then(|| output.status.to_string()));
            JobOutcome::failed(
                job.id,
                job.config_path.clone(),
                FailureKind::Execution,
                exit_code,
                detail,
                elapsed,
            )
        }
        Ok(None) => JobOutcome::failed(
            job.id,
            job.config_path.clone(),
            FailureKind::TimedOut,
            INVOCATION_FAILED_EXIT_CODE,
            config
                .job_timeout
                .map(|t| format!("timed out after {:?}", t)),
            elapsed,
        ),
        Err(e) => JobOutcome::failed(
            job.id,
            job.config_path.clone(),
            FailureKind::Invocation,
            INVOCATION_FAILED_EXIT_CODE,
            Some(format!("failed to run {}: {}", config.program, e)),
            elapsed,
        ),
    };

    if outcome.is_success() {
        info!(
            job = %outcome.job,
            config = %outcome.config_path.display(),
            secs = outcome.duration_secs,
            "Completed (return code: 0)"
        );
    } else {
        warn!(
            job = %outcome.job,
            config = %outcome.config_path.display(),
            exit_code = outcome.exit_code,
            failure = ?outcome.failure,
            detail = outcome.detail.as_deref().unwrap_or(""),
            "Simulation failed"
        );
    }

    outcome
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.to_string())
}
