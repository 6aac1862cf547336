//! Exact branch-and-bound.
//!
//! Chooses the variable with the fewest admissible values at every node and
//! tries values cheapest first under the monotone penalties (daily load,
//! recess, room changes). A branch whose bound cannot beat the best schedule
//! found so far is cut. When the search space is exhausted within the node
//! limit the result is proven optimal.
//!
//! The strategy reports itself unavailable for models above the configured
//! size, leaving them to [`BacktrackingStrategy`](super::BacktrackingStrategy).

use std::cmp::Reverse;

use timeweave_config::ExactConfig;
use tracing::debug;

use super::{SearchSettings, SolveOutcome, SolveStrategy};
use crate::model::Model;
use crate::search::{run_search, Decider, PartialSchedule, SearchLimits};
use crate::termination::Termination;

#[derive(Debug, Clone)]
pub struct ExactStrategy {
    settings: SearchSettings,
    max_requirements: usize,
    node_limit: u64,
}

impl ExactStrategy {
    pub fn new(settings: SearchSettings, exact: &ExactConfig) -> Self {
        Self {
            settings,
            max_requirements: exact.max_requirements,
            node_limit: exact.node_limit,
        }
    }

    fn limits(&self) -> SearchLimits {
        let optimization = &self.settings.optimization;
        let node_limit = self
            .settings
            .node_limit
            .map_or(self.node_limit, |limit| limit.min(self.node_limit));
        SearchLimits {
            optimize: optimization.enabled,
            node_limit: Some(node_limit),
            improve_nodes: Some(optimization.node_limit),
            improve_time: optimization.time_budget(),
        }
    }
}

impl SolveStrategy for ExactStrategy {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn is_available(&self, model: &Model) -> bool {
        model.len() <= self.max_requirements
    }

    fn solve(&self, model: &Model, termination: &dyn Termination) -> SolveOutcome {
        let mut decider = MostConstrainedDecider::default();
        let outcome = run_search(
            model,
            &self.settings.scorer,
            &mut decider,
            &self.limits(),
            termination,
        );
        debug!(
            strategy = self.name(),
            status = outcome.status(),
            nodes = outcome.statistics().nodes,
            pruned = outcome.statistics().pruned,
            "Search finished"
        );
        outcome
    }
}

#[derive(Default)]
struct MostConstrainedDecider {
    cached: Option<(usize, Vec<usize>)>,
}

impl MostConstrainedDecider {
    fn ordered(state: &PartialSchedule<'_>, variable: usize) -> Vec<usize> {
        let mut values: Vec<_> = state
            .admissible(variable)
            .into_iter()
            .map(|(value, check)| (Reverse(state.value_delta(variable, value)), check.violations, value))
            .collect();
        values.sort();
        values.into_iter().map(|(_, _, value)| value).collect()
    }
}

impl Decider for MostConstrainedDecider {
    fn next_variable(&mut self, state: &PartialSchedule<'_>, _depth: usize) -> usize {
        let model = state.model();
        let mut best: Option<(usize, Vec<usize>)> = None;
        for variable in (0..model.len()).filter(|&v| !state.is_assigned(v)) {
            let values = Self::ordered(state, variable);
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| values.len() < current.len());
            if better {
                let empty = values.is_empty();
                best = Some((variable, values));
                if empty {
                    break;
                }
            }
        }
        match best {
            Some((variable, values)) => {
                self.cached = Some((variable, values));
                variable
            }
            None => 0,
        }
    }

    fn order_values(&mut self, state: &PartialSchedule<'_>, variable: usize) -> Vec<usize> {
        match self.cached.take() {
            Some((cached, values)) if cached == variable => values,
            _ => Self::ordered(state, variable),
        }
    }
}
