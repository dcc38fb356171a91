//! Configuration synthesis
//!
//! Turns one (seed, window) pair into the two files SUMO needs:
//!
//! ```text
//! <root>/edge_data_cfg/<scenario>_s_<seed>_<es>_<ee>_baseline_edgedata_cfg.add.xml   (1)
//! <root>/sumo_cfg/<scenario>_s_<seed>_<es>_<ee>_baseline.sumocfg                      (2)
//! ```
//!
//! The configuration (2) references the edge statistics descriptor (1), so
//! (1) is always written first. File names are keyed by
//! `(seed, eval_start, eval_end)`; downstream tooling relies on them.

use crate::error::{BaselineError, Result};
use crate::policy::{EdgeDataOptions, SimulationPolicy};
use crate::window::{EvaluationWindow, PlannedWindow, SimulationWindow};
use crate::xml::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding the simulation configurations
pub const SUMO_CFG_DIR: &str = "sumo_cfg";

/// Directory holding the edge statistics descriptors
pub const EDGE_DATA_CFG_DIR: &str = "edge_data_cfg";

/// Directory the engine writes its outputs to
pub const OUTPUT_DIR: &str = "output";

const CONFIG_XSD: &str = "http://sumo.dlr.de/xsd/sumoConfiguration.xsd";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Identity of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    /// Route/demand realization
    pub seed: i64,
    /// Start of the evaluation window (seconds)
    pub eval_start: u64,
    /// End of the evaluation window (seconds)
    pub eval_end: u64,
}

impl JobId {
    /// Identity of a seed's window
    pub fn new(seed: i64, eval: EvaluationWindow) -> Self {
        Self {
            seed,
            eval_start: eval.eval_start,
            eval_end: eval.eval_end,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s_{}_{}_{}", self.seed, self.eval_start, self.eval_end)
    }
}

/// One generated job, ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Job identity
    pub id: JobId,
    /// Executed span
    pub sim: SimulationWindow,
    /// Generated `.sumocfg`
    pub config_path: PathBuf,
    /// Generated edge statistics descriptor
    pub edge_data_path: PathBuf,
    /// Output prefix written into the configuration
    pub output_prefix: String,
}

/// Where artifacts live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
    scenario: String,
}

impl ArtifactLayout {
    /// Layout rooted at `root` for a scenario
    pub fn new(root: impl Into<PathBuf>, scenario: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            scenario: scenario.into(),
        }
    }

    /// Artifact root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration directory
    pub fn sumo_cfg_dir(&self) -> PathBuf {
        self.root.join(SUMO_CFG_DIR)
    }

    /// Edge statistics descriptor directory
    pub fn edge_data_dir(&self) -> PathBuf {
        self.root.join(EDGE_DATA_CFG_DIR)
    }

    /// Engine output directory
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Create every artifact directory
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.sumo_cfg_dir(), self.edge_data_dir(), self.output_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| BaselineError::io(&dir, e))?;
        }
        Ok(())
    }

    fn stem(&self, id: &JobId) -> String {
        format!(
            "{}_s_{}_{}_{}_baseline",
            self.scenario, id.seed, id.eval_start, id.eval_end
        )
    }

    /// File name of the configuration
    pub fn config_file_name(&self, id: &JobId) -> String {
        format!("{}.sumocfg", self.stem(id))
    }

    /// File name of the edge statistics descriptor
    pub fn edge_data_file_name(&self, id: &JobId) -> String {
        format!("{}_edgedata_cfg.add.xml", self.stem(id))
    }

    /// File name of the edge statistics the engine will write
    pub fn edge_data_output_name(&self, id: &JobId) -> String {
        format!("{}_edgedata.xml", self.stem(id))
    }

    /// Full path of the configuration
    pub fn config_path(&self, id: &JobId) -> PathBuf {
        self.sumo_cfg_dir().join(self.config_file_name(id))
    }

    /// Full path of the edge statistics descriptor
    pub fn edge_data_path(&self, id: &JobId) -> PathBuf {
        self.edge_data_dir().join(self.edge_data_file_name(id))
    }

    /// Output prefix, relative to the configuration directory.
    ///
    /// Keyed by the simulation span, not the evaluation span.
    pub fn output_prefix(&self, seed: i64, sim: &SimulationWindow) -> String {
        format!(
            "../{}/{}_s_{}_baseline_{}_{}_",
            OUTPUT_DIR, self.scenario, seed, sim.sim_start, sim.sim_end
        )
    }
}

/// Writes the configuration and edge statistics descriptor of each job
#[derive(Debug, Clone)]
pub struct ConfigSynthesizer {
    layout: ArtifactLayout,
    policy: SimulationPolicy,
}

impl ConfigSynthesizer {
    /// Synthesizer writing under `root` with the given policy
    pub fn new(root: impl Into<PathBuf>, policy: SimulationPolicy) -> Self {
        let layout = ArtifactLayout::new(root, policy.scenario.clone());
        Self { layout, policy }
    }

    /// Artifact layout
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Simulation policy
    pub fn policy(&self) -> &SimulationPolicy {
        &self.policy
    }

    /// Write both artifacts of one job and return its descriptor.
    ///
    /// Existing files are overwritten.
    pub fn synthesize(
        &self,
        seed: i64,
        window: &PlannedWindow,
        edge_data: &EdgeDataOptions,
    ) -> Result<JobDescriptor> {
        let id = JobId::new(seed, window.eval);

        let edge_data_path = self.layout.edge_data_path(&id);
        write_artifact(&edge_data_path, &self.edge_data_document(&id, edge_data))?;

        let output_prefix = self.layout.output_prefix(seed, &window.sim);
        let config_path = self.layout.config_path(&id);
        write_artifact(
            &config_path,
            &self.config_document(&id, &output_prefix),
        )?;

        debug!(
            job = %id,
            sim_start = window.sim.sim_start,
            sim_end = window.sim.sim_end,
            config = %config_path.display(),
            "Synthesized job configuration"
        );

        Ok(JobDescriptor {
            id,
            sim: window.sim,
            config_path,
            edge_data_path,
            output_prefix,
        })
    }

    /// Edge statistics descriptor of a job
    pub fn edge_data_document(&self, id: &JobId, opts: &EdgeDataOptions) -> String {
        let edge_data = Element::new("edgeData")
            .with_attr(
                "id",
                format!("edgedata_s_{}_{}_{}", id.seed, id.eval_start, id.eval_end),
            )
            .with_attr("begin", id.eval_start)
            .with_attr("end", id.eval_end)
            .with_attr("file", self.layout.edge_data_output_name(id))
            .with_attr("period", opts.period)
            .with_attr("withInternal", opts.with_internal)
            .with_attr("excludeEmpty", opts.exclude_empty)
            .with_attr("minSamples", opts.min_samples)
            .with_attr("trackVehicles", opts.track_vehicles);

        Element::new("additional").with_child(edge_data).to_document()
    }

    /// Simulation configuration of a job
    pub fn config_document(&self, id: &JobId, output_prefix: &str) -> String {
        let policy = &self.policy;
        let outputs = &policy.outputs;
        let processing = &policy.processing;

        let input = Element::new("input").with_children([
            Element::option("net-file", &policy.net_file),
            Element::option("route-files", policy.route_file(id.seed)),
            Element::option(
                "additional-files",
                format!("../{}/{}", EDGE_DATA_CFG_DIR, self.layout.edge_data_file_name(id)),
            ),
        ]);

        let output = Element::new("output").with_children([
            Element::option("output-prefix", output_prefix),
            Element::option("log", &outputs.log),
            Element::option("summary-output", &outputs.summary_output),
            Element::option("statistic-output", &outputs.statistic_output),
            Element::option("vehroute-output", &outputs.vehroute_output),
            Element::option(
                "vehroute-output.route-length",
                outputs.vehroute_route_length,
            ),
            Element::option("stop-output", &outputs.stop_output),
            Element::option("tripinfo-output", &outputs.tripinfo_output),
        ]);

        let time = Element::new("time").with_children([
            Element::option("begin", policy.time_begin),
            Element::option("end", format!("{:?}", policy.time_end)),
        ]);

        let processing = Element::new("processing").with_children([
            Element::option("route-steps", processing.route_steps),
            Element::option("no-internal-links", processing.no_internal_links),
            Element::option(
                "ignore-junction-blocker",
                processing.ignore_junction_blocker,
            ),
            Element::option(
                "time-to-teleport",
                format!("{:?}", processing.time_to_teleport),
            ),
            Element::option(
                "time-to-teleport.highways",
                processing.time_to_teleport_highways,
            ),
            Element::option("eager-insert", processing.eager_insert),
        ]);

        let random = Element::new("random_number").with_children([
            Element::option("random", policy.random),
            Element::option("seed", policy.random_seed),
        ]);

        Element::new("configuration")
            .with_attr("xmlns:xsi", XSI_NS)
            .with_attr("xsi:noNamespaceSchemaLocation", CONFIG_XSD)
            .with_children([input, output, time, processing, random])
            .to_document()
    }
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| BaselineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowPlanner;
    use std::collections::HashSet;

    fn second_window() -> PlannedWindow {
        WindowPlanner::new(3600, 3600, 0)
            .unwrap()
            .windows()
            .nth(1)
            .unwrap()
    }

    fn synthesizer(root: &Path) -> ConfigSynthesizer {
        let synth = ConfigSynthesizer::new(root, SimulationPolicy::default());
        synth.layout().prepare().unwrap();
        synth
    }

    #[test]
    fn test_artifact_paths_keep_naming_scheme() {
        let layout = ArtifactLayout::new("/data", "berlin");
        let id = JobId {
            seed: 3,
            eval_start: 3600,
            eval_end: 7200,
        };

        assert_eq!(
            layout.config_path(&id),
            PathBuf::from("/data/sumo_cfg/berlin_s_3_3600_7200_baseline.sumocfg")
        );
        assert_eq!(
            layout.edge_data_path(&id),
            PathBuf::from(
                "/data/edge_data_cfg/berlin_s_3_3600_7200_baseline_edgedata_cfg.add.xml"
            )
        );
        let sim = SimulationWindow {
            sim_start: 0,
            sim_end: 7200,
        };
        assert_eq!(
            layout.output_prefix(3, &sim),
            "../output/berlin_s_3_baseline_0_7200_"
        );
    }

    #[test]
    fn test_synthesize_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(dir.path());

        let job = synth
            .synthesize(0, &second_window(), &EdgeDataOptions::with_period(3600))
            .unwrap();

        assert!(job.config_path.exists());
        assert!(job.edge_data_path.exists());
        assert_eq!(job.id.to_string(), "s_0_3600_7200");
        assert_eq!(job.output_prefix, "../output/berlin_s_0_baseline_0_7200_");

        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<configuration"));
        assert!(config.contains("<net-file value=\"../berlin.net.xml.gz\"/>"));
        assert!(config.contains("<route-files value=\"../berlin_s_0.rou.gz\"/>"));
        assert!(config.contains(
            "<additional-files value=\"../edge_data_cfg/berlin_s_0_3600_7200_baseline_edgedata_cfg.add.xml\"/>"
        ));
        assert!(config.contains("<output-prefix value=\"../output/berlin_s_0_baseline_0_7200_\"/>"));
        assert!(config.contains("<begin value=\"21600\"/>"));
        assert!(config.contains("<end value=\"86400.0\"/>"));
        assert!(config.contains("<time-to-teleport value=\"120.0\"/>"));
        assert!(config.contains("<seed value=\"251920\"/>"));

        let edge = std::fs::read_to_string(&job.edge_data_path).unwrap();
        assert!(edge.contains(
            "<edgeData id=\"edgedata_s_0_3600_7200\" begin=\"3600\" end=\"7200\" \
             file=\"berlin_s_0_3600_7200_baseline_edgedata.xml\" period=\"3600\" \
             withInternal=\"true\" excludeEmpty=\"true\" minSamples=\"2\" trackVehicles=\"true\"/>"
        ));
    }

    #[test]
    fn test_time_bounds_independent_of_window() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(dir.path());
        let planner = WindowPlanner::new(3600, 0, 0).unwrap();

        for window in planner.windows().take(3) {
            let job = synth
                .synthesize(1, &window, &EdgeDataOptions::default())
                .unwrap();
            let config = std::fs::read_to_string(&job.config_path).unwrap();
            assert!(config.contains("<begin value=\"21600\"/>"));
            assert!(config.contains("<end value=\"86400.0\"/>"));
        }
    }

    #[test]
    fn test_synthesize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(dir.path());
        let window = second_window();
        let opts = EdgeDataOptions::with_period(3600);

        let first = synth.synthesize(2, &window, &opts).unwrap();
        let config_a = std::fs::read(&first.config_path).unwrap();
        let edge_a = std::fs::read(&first.edge_data_path).unwrap();

        let second = synth.synthesize(2, &window, &opts).unwrap();
        assert_eq!(first, second);
        assert_eq!(config_a, std::fs::read(&second.config_path).unwrap());
        assert_eq!(edge_a, std::fs::read(&second.edge_data_path).unwrap());
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(dir.path());
        let window = second_window();
        let id = JobId::new(0, window.eval);

        std::fs::write(synth.layout().config_path(&id), "stale").unwrap();
        let job = synth
            .synthesize(0, &window, &EdgeDataOptions::default())
            .unwrap();

        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.starts_with("<?xml"));
    }

    #[test]
    fn test_no_path_collisions_within_seed() {
        let layout = ArtifactLayout::new("/data", "berlin");
        let planner = WindowPlanner::new(900, 3600, 600).unwrap();

        let mut configs = HashSet::new();
        let mut edges = HashSet::new();
        for window in planner.windows() {
            let id = JobId::new(5, window.eval);
            assert!(configs.insert(layout.config_path(&id)));
            assert!(edges.insert(layout.edge_data_path(&id)));
        }
        assert_eq!(configs.len(), planner.window_count());
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // No prepare(): sumo_cfg/ and edge_data_cfg/ do not exist
        let synth = ConfigSynthesizer::new(dir.path(), SimulationPolicy::default());

        let err = synth
            .synthesize(0, &second_window(), &EdgeDataOptions::default())
            .unwrap_err();
        assert!(matches!(err, BaselineError::Io { .. }));
    }

    #[test]
    fn test_custom_scenario_changes_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let policy = SimulationPolicy::default()
            .with_scenario("munich")
            .with_route_file_pattern("../munich_s_{seed}.rou.gz");
        let synth = ConfigSynthesizer::new(dir.path(), policy);
        synth.layout().prepare().unwrap();

        let job = synth
            .synthesize(4, &second_window(), &EdgeDataOptions::default())
            .unwrap();
        assert!(job
            .config_path
            .ends_with("sumo_cfg/munich_s_4_3600_7200_baseline.sumocfg"));
        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.contains("<route-files value=\"../munich_s_4.rou.gz\"/>"));
    }

    #[test]
    fn test_fractional_policy_values_render_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = SimulationPolicy::default();
        policy.time_end = 86400.75;
        policy.processing.time_to_teleport = 120.25;
        let synth = ConfigSynthesizer::new(dir.path(), policy);
        synth.layout().prepare().unwrap();

        let job = synth
            .synthesize(0, &second_window(), &EdgeDataOptions::default())
            .unwrap();
        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.contains("<end value=\"86400.75\"/>"));
        assert!(config.contains("<time-to-teleport value=\"120.25\"/>"));
    }

    #[test]
    fn test_negative_seed_in_names_and_routes() {
        let dir = tempfile::tempdir().unwrap();
        let synth = synthesizer(dir.path());

        let job = synth
            .synthesize(-7, &second_window(), &EdgeDataOptions::default())
            .unwrap();
        assert_eq!(job.id.to_string(), "s_-7_3600_7200");
        assert!(job
            .config_path
            .ends_with("sumo_cfg/berlin_s_-7_3600_7200_baseline.sumocfg"));
        assert_eq!(job.output_prefix, "../output/berlin_s_-7_baseline_0_7200_");
        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.contains("<route-files value=\"../berlin_s_-7.rou.gz\"/>"));
    }
}
