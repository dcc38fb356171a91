//! Fixed simulation policy
//!
//! Everything the generated configuration embeds that does not depend on the
//! job: scenario naming, input files, the output battery, the static time
//! bounds and the processing/random-number flags. Policy files are JSON;
//! any field left out takes its default.

use crate::error::{BaselineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder substituted with the seed in [`SimulationPolicy::route_file_pattern`]
pub const SEED_PLACEHOLDER: &str = "{seed}";

/// Policy embedded in every generated SUMO configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPolicy {
    /// Scenario name, prefixes every artifact file name
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// Network file, relative to the configuration directory
    #[serde(default = "default_net_file")]
    pub net_file: String,

    /// Route file pattern, `{seed}` is replaced by the job's seed
    #[serde(default = "default_route_file_pattern")]
    pub route_file_pattern: String,

    /// Output files written under the job's output prefix
    #[serde(default)]
    pub outputs: OutputFiles,

    /// Static simulation begin (seconds)
    #[serde(default = "default_time_begin")]
    pub time_begin: u64,

    /// Static simulation end (seconds)
    #[serde(default = "default_time_end")]
    pub time_end: f64,

    /// Processing flags
    #[serde(default)]
    pub processing: ProcessingFlags,

    /// Randomize the engine seed
    #[serde(default)]
    pub random: bool,

    /// Engine random seed
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

/// Output battery of the `output` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFiles {
    /// Engine log file
    #[serde(default = "default_log")]
    pub log: String,
    /// Per-step network summary
    #[serde(default = "default_summary_output")]
    pub summary_output: String,
    /// End-of-run statistics
    #[serde(default = "default_statistic_output")]
    pub statistic_output: String,
    /// Vehicle routes
    #[serde(default = "default_vehroute_output")]
    pub vehroute_output: String,
    /// Write route lengths into the vehicle routes
    #[serde(default = "default_true")]
    pub vehroute_route_length: bool,
    /// Stop events
    #[serde(default = "default_stop_output")]
    pub stop_output: String,
    /// Per-trip information
    #[serde(default = "default_tripinfo_output")]
    pub tripinfo_output: String,
}

/// Flags of the `processing` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingFlags {
    /// Routes loaded ahead (seconds)
    #[serde(default = "default_route_steps")]
    pub route_steps: u32,
    /// Disable junction-internal links
    #[serde(default)]
    pub no_internal_links: bool,
    /// Ignore vehicles blocking a junction after this many seconds
    #[serde(default = "default_ignore_junction_blocker")]
    pub ignore_junction_blocker: u32,
    /// Seconds a vehicle may wait before being teleported
    #[serde(default = "default_time_to_teleport")]
    pub time_to_teleport: f64,
    /// Teleport threshold on highways, 0 disables
    #[serde(default)]
    pub time_to_teleport_highways: u32,
    /// Try inserting every waiting vehicle each step
    #[serde(default)]
    pub eager_insert: bool,
}

fn default_scenario() -> String {
    "berlin".to_string()
}

fn default_net_file() -> String {
    "../berlin.net.xml.gz".to_string()
}

fn default_route_file_pattern() -> String {
    "../berlin_s_{seed}.rou.gz".to_string()
}

fn default_time_begin() -> u64 {
    21600
}

fn default_time_end() -> f64 {
    86400.0
}

fn default_random_seed() -> u64 {
    251920
}

fn default_log() -> String {
    "console.log".to_string()
}

fn default_summary_output() -> String {
    "summary.xml".to_string()
}

fn default_statistic_output() -> String {
    "statistics.xml".to_string()
}

fn default_vehroute_output() -> String {
    "vehroute.xml.gz".to_string()
}

fn default_stop_output() -> String {
    "stop.xml.gz".to_string()
}

fn default_tripinfo_output() -> String {
    "tripinfo.xml.gz".to_string()
}

fn default_true() -> bool {
    true
}

fn default_route_steps() -> u32 {
    200
}

fn default_ignore_junction_blocker() -> u32 {
    20
}

fn default_time_to_teleport() -> f64 {
    120.0
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            log: default_log(),
            summary_output: default_summary_output(),
            statistic_output: default_statistic_output(),
            vehroute_output: default_vehroute_output(),
            vehroute_route_length: true,
            stop_output: default_stop_output(),
            tripinfo_output: default_tripinfo_output(),
        }
    }
}

impl Default for ProcessingFlags {
    fn default() -> Self {
        Self {
            route_steps: default_route_steps(),
            no_internal_links: false,
            ignore_junction_blocker: default_ignore_junction_blocker(),
            time_to_teleport: default_time_to_teleport(),
            time_to_teleport_highways: 0,
            eager_insert: false,
        }
    }
}

impl Default for SimulationPolicy {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            net_file: default_net_file(),
            route_file_pattern: default_route_file_pattern(),
            outputs: OutputFiles::default(),
            time_begin: default_time_begin(),
            time_end: default_time_end(),
            processing: ProcessingFlags::default(),
            random: false,
            random_seed: default_random_seed(),
        }
    }
}

impl SimulationPolicy {
    /// Load a policy from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| BaselineError::io(path, e))?;
        let policy: Self = serde_json::from_str(&raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Reject policies that cannot produce a usable configuration
    pub fn validate(&self) -> Result<()> {
        if self.scenario.is_empty() {
            return Err(BaselineError::policy("scenario must not be empty"));
        }
        if self.scenario.contains(['/', '\\']) {
            return Err(BaselineError::policy(format!(
                "scenario must be a plain file name prefix, got {:?}",
                self.scenario
            )));
        }
        if !self.route_file_pattern.contains(SEED_PLACEHOLDER) {
            return Err(BaselineError::policy(format!(
                "route_file_pattern must contain {}, got {:?}",
                SEED_PLACEHOLDER, self.route_file_pattern
            )));
        }
        if (self.time_begin as f64) >= self.time_end {
            return Err(BaselineError::policy(format!(
                "time_begin ({}) must be before time_end ({})",
                self.time_begin, self.time_end
            )));
        }
        Ok(())
    }

    /// Set scenario name
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    /// Set network file
    pub fn with_net_file(mut self, net_file: impl Into<String>) -> Self {
        self.net_file = net_file.into();
        self
    }

    /// Set route file pattern
    pub fn with_route_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.route_file_pattern = pattern.into();
        self
    }

    /// Set engine random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Route file of one seed
    pub fn route_file(&self, seed: i64) -> String {
        self.route_file_pattern
            .replace(SEED_PLACEHOLDER, &seed.to_string())
    }
}

/// Policy of the edge statistics collection (`edgeData`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDataOptions {
    /// Aggregation period (seconds)
    pub period: u64,
    /// Include internal (junction) edges
    pub with_internal: bool,
    /// Skip edges without samples
    pub exclude_empty: bool,
    /// Minimum samples before an edge is written
    pub min_samples: u32,
    /// Track individual vehicles
    pub track_vehicles: bool,
}

impl EdgeDataOptions {
    /// Defaults with the given aggregation period
    pub fn with_period(period: u64) -> Self {
        Self {
            period,
            with_internal: true,
            exclude_empty: true,
            min_samples: 2,
            track_vehicles: true,
        }
    }
}

impl Default for EdgeDataOptions {
    fn default() -> Self {
        Self::with_period(3600)
    }
}
