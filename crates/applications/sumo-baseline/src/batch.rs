//! Job generation for a whole batch
//!
//! Seeds x windows → synthesized job list. Any error here is fatal for the
//! run: nothing is dispatched without a complete, valid job list.

use crate::error::{BaselineError, Result};
use crate::policy::EdgeDataOptions;
use crate::synth::{ConfigSynthesizer, JobDescriptor, JobId};
use crate::window::WindowPlanner;
use std::collections::HashMap;
use tracing::info;

/// Generate every job of a batch, seed by seed, window by window.
///
/// The whole plan is checked before anything touches the filesystem: a batch
/// where two jobs would share an output prefix is rejected up front. That
/// happens when warm-up/cool-down clamp two windows of the same seed to the
/// same simulation span. Artifact directories are created next, then every
/// job is synthesized.
pub fn generate_jobs(
    seeds: &[i64],
    planner: &WindowPlanner,
    synthesizer: &ConfigSynthesizer,
    edge_data: &EdgeDataOptions,
) -> Result<Vec<JobDescriptor>> {
    if seeds.is_empty() {
        return Err(BaselineError::invalid("at least one seed is required"));
    }

    check_output_prefixes(seeds, planner, synthesizer)?;
    synthesizer.layout().prepare()?;

    let mut jobs = Vec::with_capacity(seeds.len() * planner.window_count());
    for &seed in seeds {
        for window in planner.windows() {
            jobs.push(synthesizer.synthesize(seed, &window, edge_data)?);
        }
        info!(seed, windows = planner.window_count(), "Generated seed configurations");
    }

    Ok(jobs)
}

fn check_output_prefixes(
    seeds: &[i64],
    planner: &WindowPlanner,
    synthesizer: &ConfigSynthesizer,
) -> Result<()> {
    let layout = synthesizer.layout();
    let mut prefixes: HashMap<String, JobId> = HashMap::new();

    for &seed in seeds {
        for window in planner.windows() {
            let id = JobId::new(seed, window.eval);
            let prefix = layout.output_prefix(seed, &window.sim);

            if let Some(&other) = prefixes.get(&prefix) {
                return Err(BaselineError::invalid(format!(
                    "jobs {} and {} share output prefix {}; \
                     reduce warmup_time/cooldown_time so simulation spans differ",
                    other, id, prefix
                )));
            }
            prefixes.insert(prefix, id);
        }
    }

    Ok(())
}
