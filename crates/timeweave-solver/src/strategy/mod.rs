//! Solve strategies and their outcomes.
//!
//! A strategy takes a compiled [`Model`] and returns exactly one of three
//! outcomes. Strategies never return a partial schedule: a search that is
//! stopped before it completes one reports progress only.

mod backtracking;
mod exact;

use std::fmt::Debug;

use serde::Serialize;
use timeweave_config::{OptimizationConfig, SchedulerConfig};
use timeweave_core::{AssignmentSet, RequirementId, ScheduleScore};

use crate::model::Model;
use crate::scoring::ScheduleScorer;
use crate::statistics::SearchStatistics;
use crate::termination::Termination;

pub use backtracking::{BacktrackingStrategy, TieBreak};
pub use exact::ExactStrategy;

/// A solving backend.
///
/// Implementations must be deterministic: the same model, configuration,
/// and tie-break must give the same outcome whenever the search is not cut
/// short by wall-clock time.
pub trait SolveStrategy: Send + Sync + Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this strategy can take the model.
    fn is_available(&self, _model: &Model) -> bool {
        true
    }

    fn solve(&self, model: &Model, termination: &dyn Termination) -> SolveOutcome;
}

/// A complete schedule for the model's variables.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    /// One assignment per variable; the score covers fixed sessions too.
    pub assignments: AssignmentSet,
    /// The search space was exhausted, so no better schedule exists.
    pub optimal: bool,
    pub statistics: SearchStatistics,
}

impl Solution {
    pub fn score(&self) -> ScheduleScore {
        self.assignments.score()
    }
}

/// Why no schedule exists.
#[derive(Debug, Clone, Serialize)]
pub struct InfeasibleReason {
    /// Requirements that ran out of placements, in id order.
    pub requirements: Vec<RequirementId>,
    pub detail: String,
    pub statistics: SearchStatistics,
}

/// How far a search got before it was stopped.
#[derive(Debug, Clone, Serialize)]
pub struct PartialProgress {
    /// Most variables decided at once.
    pub placed: usize,
    pub total: usize,
    pub statistics: SearchStatistics,
}

/// Result of one solve.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveOutcome {
    Feasible(Solution),
    Infeasible(InfeasibleReason),
    TimedOut(PartialProgress),
}

impl SolveOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, SolveOutcome::Feasible(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Feasible(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SolveOutcome::Feasible(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn statistics(&self) -> &SearchStatistics {
        match self {
            SolveOutcome::Feasible(s) => &s.statistics,
            SolveOutcome::Infeasible(r) => &r.statistics,
            SolveOutcome::TimedOut(p) => &p.statistics,
        }
    }

    /// Status label used in logs and job events.
    pub fn status(&self) -> &'static str {
        match self {
            SolveOutcome::Feasible(_) => "FEASIBLE",
            SolveOutcome::Infeasible(_) => "INFEASIBLE",
            SolveOutcome::TimedOut(_) => "TIMED_OUT",
        }
    }
}

/// Scoring and optimisation settings every strategy shares.
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    pub scorer: ScheduleScorer,
    pub optimization: OptimizationConfig,
    /// Nodes a single run may expand, if capped.
    pub node_limit: Option<u64>,
}

impl SearchSettings {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            scorer: ScheduleScorer::from_config(config),
            optimization: config.optimization.clone(),
            node_limit: config.termination.node_limit,
        }
    }

    /// Same settings with post-feasibility optimisation turned off.
    pub fn first_feasible(mut self) -> Self {
        self.optimization.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests;
