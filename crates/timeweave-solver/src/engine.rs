//! The solver engine: strategy selection and solve orchestration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use timeweave_config::{SchedulerConfig, StrategyType};
use timeweave_core::{EntitySnapshot, Result};

use crate::compiler::compile;
use crate::model::Model;
use crate::scoring::ScheduleScorer;
use crate::strategy::{
    BacktrackingStrategy, ExactStrategy, SearchSettings, SolveOutcome, SolveStrategy,
};
use crate::termination::{Deadline, ExternalTermination, OrTermination};

/// Runs compiled models through the configured strategy.
///
/// With [`StrategyType::Auto`] the exact backend takes every model it
/// reports itself available for; larger models, and models on which the
/// exact search runs out of nodes before the deadline, go to backtracking.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use timeweave_config::SchedulerConfig;
/// use timeweave_solver::{Deadline, SolverEngine};
/// use timeweave_test::campus;
///
/// let engine = SolverEngine::new(SchedulerConfig::default());
/// let outcome = engine
///     .generate(Arc::new(campus::small_campus()), Deadline::after(Duration::from_secs(10)))
///     .unwrap();
/// assert!(outcome.is_feasible());
/// ```
#[derive(Debug, Clone)]
pub struct SolverEngine {
    config: SchedulerConfig,
    settings: SearchSettings,
    exact: ExactStrategy,
    fallback: BacktrackingStrategy,
}

impl Default for SolverEngine {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl SolverEngine {
    pub fn new(config: SchedulerConfig) -> Self {
        let settings = SearchSettings::from_config(&config);
        let exact = ExactStrategy::new(settings.clone(), &config.exact);
        let fallback = BacktrackingStrategy::new(settings.clone());
        Self {
            config,
            settings,
            exact,
            fallback,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn scorer(&self) -> &ScheduleScorer {
        &self.settings.scorer
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// The strategy that will take `model`.
    pub fn select(&self, model: &Model) -> &dyn SolveStrategy {
        match self.config.strategy {
            StrategyType::Backtracking => &self.fallback,
            StrategyType::Exact | StrategyType::Auto => {
                if self.exact.is_available(model) {
                    &self.exact
                } else {
                    warn!(
                        requirements = model.len(),
                        max_requirements = self.config.exact.max_requirements,
                        "Exact strategy unavailable, using backtracking"
                    );
                    &self.fallback
                }
            }
        }
    }

    /// Compiles the snapshot and solves it.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::Compile`](timeweave_core::TimeweaveError::Compile)
    /// with every diagnostic when the snapshot cannot be compiled.
    pub fn generate(&self, snapshot: Arc<EntitySnapshot>, deadline: Deadline) -> Result<SolveOutcome> {
        self.generate_with(snapshot, deadline, None)
    }

    /// Like [`generate`](Self::generate), stopping early when `cancel` is raised.
    pub fn generate_with(
        &self,
        snapshot: Arc<EntitySnapshot>,
        deadline: Deadline,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SolveOutcome> {
        let model = compile(snapshot)?;
        Ok(self.solve_with(&model, deadline, cancel))
    }

    pub fn solve(&self, model: &Model, deadline: Deadline) -> SolveOutcome {
        self.solve_with(model, deadline, None)
    }

    /// Solves a compiled model before the earlier of `deadline` and the
    /// configured time limit.
    pub fn solve_with(
        &self,
        model: &Model,
        deadline: Deadline,
        cancel: Option<Arc<AtomicBool>>,
    ) -> SolveOutcome {
        let deadline = deadline.min(Deadline::from_limit(self.config.time_limit()));
        let mut termination = OrTermination::new().with(deadline);
        if let Some(flag) = cancel.clone() {
            termination.push(ExternalTermination::new(flag));
        }

        let strategy = self.select(model);
        info!(
            event = "solve_start",
            strategy = strategy.name(),
            requirements = model.len(),
            fixed = model.fixed().len(),
            domain_size = model.domain_size(),
        );

        let mut outcome = strategy.solve(model, &termination);
        let cancelled = cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));
        let retry = self.config.strategy == StrategyType::Auto
            && strategy.name() == self.exact.name()
            && matches!(outcome, SolveOutcome::TimedOut(_))
            && !deadline.is_expired()
            && !cancelled;
        if retry {
            warn!(
                nodes = outcome.statistics().nodes,
                "Exact strategy ran out of nodes, using backtracking"
            );
            outcome = self.fallback.solve(model, &termination);
        }

        match &outcome {
            SolveOutcome::Feasible(solution) => info!(
                event = "solve_end",
                status = outcome.status(),
                score = %solution.score(),
                optimal = solution.optimal,
                nodes = solution.statistics.nodes,
                backtracks = solution.statistics.backtracks,
                duration_ms = solution.statistics.duration.as_millis() as u64,
            ),
            other => info!(
                event = "solve_end",
                status = other.status(),
                nodes = other.statistics().nodes,
                backtracks = other.statistics().backtracks,
                duration_ms = other.statistics().duration.as_millis() as u64,
            ),
        }
        outcome
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
