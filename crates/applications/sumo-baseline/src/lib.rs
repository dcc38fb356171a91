//! # SUMO Baseline Runner
//!
//! Windowed baseline runs of a SUMO scenario over a 24h horizon.
//!
//! ## Architecture
//!
//! ```text
//! WindowPlanner ──► ConfigSynthesizer ──► [JobDescriptor] ──► BatchDispatcher ──► BatchReport
//!  (arithmetic)      (writes sumo_cfg/      (one per seed      (sumo -c <cfg>,      (counts +
//!                     and edge_data_cfg/)    and window)        n at a time)         failed list)
//! ```
//!
//! Generation errors abort the run before anything is dispatched. Dispatch
//! errors stay with the job they belong to and show up in the report.
//!
//! See [`window`] for the interval arithmetic and [`synth`] for the file
//! naming scheme.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod policy;
pub mod report;
pub mod synth;
pub mod window;
pub mod xml;

// Error handling
pub use error::{BaselineError, Result};

// Window planning
pub use window::{EvaluationWindow, PlannedWindow, SimulationWindow, WindowPlanner, HORIZON_SECS};

// Configuration synthesis
pub use batch::generate_jobs;
pub use policy::{EdgeDataOptions, SimulationPolicy};
pub use synth::{ArtifactLayout, ConfigSynthesizer, JobDescriptor, JobId};

// Dispatch
pub use dispatch::{
    BatchDispatcher, DispatchConfig, FailureKind, JobOutcome, JobState,
    INVOCATION_FAILED_EXIT_CODE,
};

// Reporting
pub use report::{BatchParameters, BatchRecord, BatchReport, FailedJob};
