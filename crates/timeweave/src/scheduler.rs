//! Scheduler entry point that hides the engine wiring.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use timeweave_config::SchedulerConfig;
use timeweave_core::{
    AssignmentSet, Calendar, EntitySnapshot, EntityStore, Result, TimeweaveError,
};
use timeweave_solver::{
    ConflictDetector, ConflictGraph, Deadline, ProposedChange, RepairEngine, RepairOutcome,
    RepairRequest, ScheduleManager, ScoreExplanation, SolveOutcome, SolverEngine,
};

/// The three operations the timetabling core exposes: full generation, a
/// read-only conflict query, and incremental repair.
///
/// Every call reads one snapshot and keeps it until it returns, and every
/// result is a new [`AssignmentSet`]; inputs are never modified.
#[derive(Debug, Clone)]
pub struct Scheduler {
    engine: SolverEngine,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(
            strategy = ?config.strategy,
            seed = config.random_seed,
            "Scheduler configured"
        );
        Self {
            engine: SolverEngine::new(config),
        }
    }

    /// Uses `timeweave.toml` in the working directory when it exists and
    /// parses, the defaults otherwise.
    pub fn from_default_config() -> Self {
        Self::new(SchedulerConfig::load("timeweave.toml").unwrap_or_default())
    }

    /// Loads a TOML or YAML configuration, picked by file extension.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::Config`] when the file cannot be read,
    /// parsed, or validated.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        let config = if yaml {
            SchedulerConfig::from_yaml_file(path)
        } else {
            SchedulerConfig::from_toml_file(path)
        }
        .map_err(|e| TimeweaveError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.engine.config()
    }

    /// The weekly grid described by the configured calendar, for ingestion
    /// code building snapshots.
    pub fn calendar(&self) -> Result<Calendar> {
        Calendar::derive(&self.config().calendar)
    }

    /// Solves the whole snapshot.
    ///
    /// Output is byte-identical across runs as long as neither `deadline`
    /// nor `optimization.time_budget_millis` cuts the search short; the
    /// default configuration bounds optimisation by node count only.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::Compile`] carrying every diagnostic when a
    /// requirement has no admissible placement or no mapped faculty. Search
    /// results, including infeasibility and timeouts, are `Ok`.
    pub fn generate(&self, snapshot: Arc<EntitySnapshot>, deadline: Deadline) -> Result<SolveOutcome> {
        self.engine.generate(snapshot, deadline)
    }

    /// Solves the store's current snapshot.
    pub fn generate_from(&self, store: &dyn EntityStore, deadline: Deadline) -> Result<SolveOutcome> {
        self.generate(store.snapshot(), deadline)
    }

    /// Reports the hard rules `change` would break in `set`, without
    /// touching either.
    pub fn propose_change(
        &self,
        snapshot: Arc<EntitySnapshot>,
        set: &AssignmentSet,
        change: &ProposedChange,
    ) -> Result<ConflictGraph> {
        ConflictDetector::new(snapshot).detect(set, change)
    }

    /// Re-solves the part of `set` that `graph` reaches, moving at most
    /// `change_budget` sessions.
    pub fn repair(
        &self,
        snapshot: Arc<EntitySnapshot>,
        set: &AssignmentSet,
        graph: &ConflictGraph,
        change_budget: usize,
    ) -> Result<RepairOutcome> {
        RepairEngine::new(snapshot, self.config()).repair(set, graph, change_budget)
    }

    /// [`repair`](Self::repair) with the configured default budget.
    pub fn repair_within_default_budget(
        &self,
        snapshot: Arc<EntitySnapshot>,
        set: &AssignmentSet,
        graph: &ConflictGraph,
    ) -> Result<RepairOutcome> {
        let budget = self.config().repair.default_change_budget;
        self.repair(snapshot, set, graph, budget)
    }

    /// Runs a fully specified repair request.
    pub fn run_repair(&self, snapshot: Arc<EntitySnapshot>, request: &RepairRequest) -> Result<RepairOutcome> {
        RepairEngine::new(snapshot, self.config()).run(request)
    }

    /// Per-rule breakdown of a schedule's score under this configuration.
    pub fn explain(&self, snapshot: &EntitySnapshot, set: &AssignmentSet) -> ScoreExplanation {
        self.engine.scorer().explain(snapshot, set.iter())
    }

    /// A job manager sharing this configuration.
    pub fn manager(&self) -> ScheduleManager {
        ScheduleManager::new(self.config().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeweave_config::StrategyType;
    use timeweave_test::campus;

    #[test]
    fn test_from_config_file_reads_toml_and_yaml() {
        let dir = std::env::temp_dir().join(format!("timeweave-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml = dir.join("timeweave.toml");
        std::fs::write(&toml, "random_seed = 7\nstrategy = \"backtracking\"\n").unwrap();
        let scheduler = Scheduler::from_config_file(&toml).unwrap();
        assert_eq!(scheduler.config().random_seed, 7);
        assert_eq!(scheduler.config().strategy, StrategyType::Backtracking);

        let yaml = dir.join("timeweave.yaml");
        std::fs::write(&yaml, "random_seed: 9\n").unwrap();
        assert_eq!(Scheduler::from_config_file(&yaml).unwrap().config().random_seed, 9);

        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "[repair]\nattempts = 0\n").unwrap();
        assert!(matches!(
            Scheduler::from_config_file(&bad),
            Err(TimeweaveError::Config(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_default_config_without_file() {
        let scheduler = Scheduler::from_default_config();
        assert_eq!(scheduler.config().repair.attempts, 4);
    }

    #[test]
    fn test_calendar_follows_config() {
        let calendar = Scheduler::default().calendar().unwrap();
        assert_eq!(calendar.timeslots().len(), 50);
    }

    #[test]
    fn test_explain_matches_fixture() {
        let snapshot = campus::three_sections();
        let schedule = campus::three_section_schedule();
        let explanation = Scheduler::default().explain(&snapshot, &schedule);
        assert!(explanation.is_feasible());
    }
}
