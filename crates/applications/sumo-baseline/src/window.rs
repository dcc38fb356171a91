//! Evaluation window planning
//!
//! Splits the 24h horizon into evaluation windows and pads each one with
//! warm-up and cool-down to get the span the engine actually simulates:
//!
//! ```text
//! 0                                                             86400
//! |------|------|------|------|  ...  |------|------|------|------|
//!        [eval_start, eval_end)
//!   <-warmup-|                 |-cooldown->
//! [sim_start .......................... sim_end]   (clamped to horizon)
//! ```
//!
//! The last evaluation window is not clamped: when the interval does not
//! divide the horizon its `eval_end` runs past 86400, while `sim_end` never
//! does.

use crate::error::{BaselineError, Result};
use serde::{Deserialize, Serialize};

/// Length of the simulated day (seconds)
pub const HORIZON_SECS: u64 = 24 * 3600;

/// Span over which output statistics are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationWindow {
    /// Start of the evaluation span (seconds, inclusive)
    pub eval_start: u64,
    /// End of the evaluation span (seconds, exclusive)
    pub eval_end: u64,
}

/// Span the engine executes, including warm-up and cool-down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationWindow {
    /// Start of simulation (seconds), never below 0
    pub sim_start: u64,
    /// End of simulation (seconds), never above [`HORIZON_SECS`]
    pub sim_end: u64,
}

/// An evaluation window with its padded simulation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannedWindow {
    /// Scored span
    pub eval: EvaluationWindow,
    /// Executed span
    pub sim: SimulationWindow,
}

/// Computes the ordered windows of one seed
///
/// Parameters are taken signed so that negative CLI input is rejected here
/// instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    evaluation_interval: u64,
    warmup_time: u64,
    cooldown_time: u64,
}

impl WindowPlanner {
    /// Create a planner, validating all three durations
    pub fn new(evaluation_interval: i64, warmup_time: i64, cooldown_time: i64) -> Result<Self> {
        if evaluation_interval <= 0 {
            return Err(BaselineError::invalid(format!(
                "evaluation_interval must be > 0, got {}",
                evaluation_interval
            )));
        }
        if warmup_time < 0 {
            return Err(BaselineError::invalid(format!(
                "warmup_time must be >= 0, got {}",
                warmup_time
            )));
        }
        if cooldown_time < 0 {
            return Err(BaselineError::invalid(format!(
                "cooldown_time must be >= 0, got {}",
                cooldown_time
            )));
        }

        Ok(Self {
            evaluation_interval: evaluation_interval as u64,
            warmup_time: warmup_time as u64,
            cooldown_time: cooldown_time as u64,
        })
    }

    /// Evaluation interval (seconds)
    pub fn evaluation_interval(&self) -> u64 {
        self.evaluation_interval
    }

    /// Warm-up time (seconds)
    pub fn warmup_time(&self) -> u64 {
        self.warmup_time
    }

    /// Cool-down time (seconds)
    pub fn cooldown_time(&self) -> u64 {
        self.cooldown_time
    }

    /// Number of windows per seed
    pub fn window_count(&self) -> usize {
        HORIZON_SECS.div_ceil(self.evaluation_interval) as usize
    }

    /// Derive the simulation window for one evaluation window
    pub fn simulation_window(&self, eval: EvaluationWindow) -> SimulationWindow {
        SimulationWindow {
            sim_start: eval.eval_start.saturating_sub(self.warmup_time),
            sim_end: eval
                .eval_end
                .saturating_add(self.cooldown_time)
                .min(HORIZON_SECS),
        }
    }

    /// Lazily iterate the windows in order. Every call starts a fresh pass.
    pub fn windows(&self) -> impl Iterator<Item = PlannedWindow> + '_ {
        (0..HORIZON_SECS)
            .step_by(self.evaluation_interval.min(HORIZON_SECS) as usize)
            .map(move |eval_start| {
                let eval = EvaluationWindow {
                    eval_start,
                    eval_end: eval_start + self.evaluation_interval,
                };
                PlannedWindow {
                    eval,
                    sim: self.simulation_window(eval),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(interval: i64, warmup: i64, cooldown: i64) -> Vec<PlannedWindow> {
        WindowPlanner::new(interval, warmup, cooldown)
            .unwrap()
            .windows()
            .collect()
    }

    #[test]
    fn test_default_scenario() {
        let windows = plan(3600, 3600, 0);
        assert_eq!(windows.len(), 24);

        assert_eq!(windows[0].eval, EvaluationWindow { eval_start: 0, eval_end: 3600 });
        assert_eq!(windows[0].sim, SimulationWindow { sim_start: 0, sim_end: 3600 });

        assert_eq!(windows[1].eval, EvaluationWindow { eval_start: 3600, eval_end: 7200 });
        assert_eq!(windows[1].sim, SimulationWindow { sim_start: 0, sim_end: 7200 });

        assert_eq!(windows[23].eval.eval_end, HORIZON_SECS);
    }

    #[test]
    fn test_windows_contiguous_and_cover_horizon() {
        for interval in [1, 7, 900, 3600, 5000, 7000, 43200, 86400, 100_000] {
            let windows = plan(interval, 0, 0);
            assert_eq!(windows.first().unwrap().eval.eval_start, 0);
            for pair in windows.windows(2) {
                assert_eq!(pair[0].eval.eval_end, pair[1].eval.eval_start);
                assert!(pair[0].eval.eval_start < pair[0].eval.eval_end);
            }
            let last = windows.last().unwrap().eval;
            assert!(last.eval_start < HORIZON_SECS);
            assert!(last.eval_end >= HORIZON_SECS);
            assert_eq!(
                windows.len(),
                WindowPlanner::new(interval, 0, 0).unwrap().window_count()
            );
        }
    }

    #[test]
    fn test_last_window_eval_end_not_clamped() {
        let windows = plan(7000, 0, 500);
        let last = windows.last().unwrap();
        assert_eq!(last.eval.eval_start, 84000);
        assert_eq!(last.eval.eval_end, 91000);
        assert_eq!(last.sim.sim_end, HORIZON_SECS);
    }

    #[test]
    fn test_simulation_window_bounds() {
        for (warmup, cooldown) in [(0, 0), (600, 0), (3600, 1800), (90_000, 90_000)] {
            for w in plan(3600, warmup, cooldown) {
                assert!(w.sim.sim_start <= w.eval.eval_start);
                assert!(w.sim.sim_end >= w.eval.eval_end.min(HORIZON_SECS));
                assert!(w.sim.sim_end <= HORIZON_SECS);
            }
        }
    }

    #[test]
    fn test_cooldown_extends_sim_end() {
        let windows = plan(3600, 0, 1800);
        assert_eq!(windows[0].sim, SimulationWindow { sim_start: 0, sim_end: 5400 });
        assert_eq!(windows[23].sim.sim_end, HORIZON_SECS);
    }

    #[test]
    fn test_windows_restartable() {
        let planner = WindowPlanner::new(5000, 100, 100).unwrap();
        let first: Vec<_> = planner.windows().collect();
        let second: Vec<_> = planner.windows().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            WindowPlanner::new(0, 0, 0),
            Err(BaselineError::InvalidParameter(_))
        ));
        assert!(matches!(
            WindowPlanner::new(-3600, 0, 0),
            Err(BaselineError::InvalidParameter(_))
        ));
        assert!(matches!(
            WindowPlanner::new(3600, -1, 0),
            Err(BaselineError::InvalidParameter(_))
        ));
        assert!(matches!(
            WindowPlanner::new(3600, 0, -1),
            Err(BaselineError::InvalidParameter(_))
        ));
    }
}
