//! Batch outcome reporting

use crate::dispatch::{FailureKind, JobOutcome};
use crate::synth::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// A job that needs operator attention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    /// Failed job
    pub job: JobId,
    /// Configuration the engine was given
    pub config_path: PathBuf,
    /// Engine exit code, `-1` when it never produced one
    pub exit_code: i32,
    /// Why the job failed
    pub failure: Option<FailureKind>,
    /// Last stderr line or error message
    pub detail: Option<String>,
}

/// Summary of a finished batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Jobs dispatched
    pub total: usize,
    /// Jobs with exit code 0
    pub succeeded: usize,
    /// Every other job, in dispatch order
    pub failed: Vec<FailedJob>,
}

impl BatchReport {
    /// Summarize a batch. Pure: only reads the outcomes.
    pub fn from_outcomes(outcomes: &[JobOutcome]) -> Self {
        let failed: Vec<FailedJob> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| FailedJob {
                job: o.job,
                config_path: o.config_path.clone(),
                exit_code: o.exit_code,
                failure: o.failure,
                detail: o.detail.clone(),
            })
            .collect();

        Self {
            total: outcomes.len(),
            succeeded: outcomes.len() - failed.len(),
            failed,
        }
    }

    /// Number of failed jobs
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when every job succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Completed: {} successful, {} failed ({} total)",
            self.succeeded,
            self.failed_count(),
            self.total
        )?;
        for failed in &self.failed {
            write!(
                f,
                "Simulation failed for config: {} [{}] (return code: {})",
                failed.config_path.display(),
                failed.job,
                failed.exit_code
            )?;
            if let Some(detail) = &failed.detail {
                write!(f, " - {}", detail)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parameters a batch was generated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParameters {
    /// Seeds, in dispatch order
    pub seeds: Vec<i64>,
    /// Evaluation interval (seconds)
    pub evaluation_interval: u64,
    /// Warm-up time (seconds)
    pub warmup_time: u64,
    /// Cool-down time (seconds)
    pub cooldown_time: u64,
    /// Worker count
    pub processes: usize,
    /// Engine executable
    pub engine: String,
}

/// Persistent record of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Unique id of this run
    pub batch_id: Uuid,
    /// Before job generation
    pub started_at: DateTime<Utc>,
    /// After the last job finished
    pub finished_at: DateTime<Utc>,
    /// Batch settings
    pub parameters: BatchParameters,
    /// Aggregated outcomes
    pub report: BatchReport,
    /// All outcomes, in dispatch order
    pub outcomes: Vec<JobOutcome>,
}

impl BatchRecord {
    /// Record a finished batch
    pub fn new(
        started_at: DateTime<Utc>,
        parameters: BatchParameters,
        outcomes: Vec<JobOutcome>,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            parameters,
            report: BatchReport::from_outcomes(&outcomes),
            outcomes,
        }
    }
}
