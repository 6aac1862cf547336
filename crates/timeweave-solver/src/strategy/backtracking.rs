//! Fail-first chronological backtracking.
//!
//! Variables are decided in a fixed order, scarcest domain first with ties
//! broken by requirement id. Values are tried in domain order with those
//! that break a scored medium rule moved to the back. After the first
//! feasible schedule the search keeps going, within the optimisation
//! budget, for a better one.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{SearchSettings, SolveOutcome, SolveStrategy};
use crate::model::Model;
use crate::search::{run_search, Decider, PartialSchedule, SearchLimits};
use crate::termination::Termination;

/// How ties in variable and value order are broken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Requirement id and domain order.
    #[default]
    Canonical,
    /// Shuffled with a seeded generator; the same seed gives the same order.
    Perturbed(u64),
}

/// The fallback strategy; always available.
#[derive(Debug, Clone, Default)]
pub struct BacktrackingStrategy {
    settings: SearchSettings,
    tie_break: TieBreak,
}

impl BacktrackingStrategy {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            tie_break: TieBreak::Canonical,
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    fn limits(&self) -> SearchLimits {
        let optimization = &self.settings.optimization;
        SearchLimits {
            optimize: optimization.enabled,
            node_limit: self.settings.node_limit,
            improve_nodes: Some(optimization.node_limit),
            improve_time: optimization.time_budget(),
        }
    }
}

impl SolveStrategy for BacktrackingStrategy {
    fn name(&self) -> &'static str {
        "backtracking"
    }

    fn solve(&self, model: &Model, termination: &dyn Termination) -> SolveOutcome {
        let mut decider = FailFirstDecider::new(model, self.tie_break);
        let outcome = run_search(
            model,
            &self.settings.scorer,
            &mut decider,
            &self.limits(),
            termination,
        );
        debug!(
            strategy = self.name(),
            tie_break = ?self.tie_break,
            status = outcome.status(),
            nodes = outcome.statistics().nodes,
            "Search finished"
        );
        outcome
    }
}

struct FailFirstDecider {
    order: Vec<usize>,
    rng: Option<ChaCha8Rng>,
}

impl FailFirstDecider {
    fn new(model: &Model, tie_break: TieBreak) -> Self {
        let mut order: Vec<usize> = (0..model.len()).collect();
        order.sort_by_key(|&v| {
            let var = model.variable(v);
            (var.domain.len(), var.requirement)
        });

        let mut rng = match tie_break {
            TieBreak::Canonical => None,
            TieBreak::Perturbed(seed) => Some(ChaCha8Rng::seed_from_u64(seed)),
        };
        if let Some(rng) = rng.as_mut() {
            // Shuffle only within runs of equal scarcity.
            let mut start = 0;
            while start < order.len() {
                let size = model.variable(order[start]).domain.len();
                let end = order[start..]
                    .iter()
                    .position(|&v| model.variable(v).domain.len() != size)
                    .map_or(order.len(), |offset| start + offset);
                order[start..end].shuffle(rng);
                start = end;
            }
        }

        Self { order, rng }
    }
}

impl Decider for FailFirstDecider {
    fn next_variable(&mut self, _state: &PartialSchedule<'_>, depth: usize) -> usize {
        self.order[depth]
    }

    fn order_values(&mut self, state: &PartialSchedule<'_>, variable: usize) -> Vec<usize> {
        let mut values = state.admissible(variable);
        if let Some(rng) = self.rng.as_mut() {
            values.shuffle(rng);
        }
        values.sort_by_key(|(_, check)| check.violations);
        values.into_iter().map(|(value, _)| value).collect()
    }
}
