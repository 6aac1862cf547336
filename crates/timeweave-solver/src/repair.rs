//! Incremental repair of an existing schedule after a change.
//!
//! A repair moves as few sessions as it can. It starts from the blast
//! radius (every requirement reachable through conflict edges from the
//! change), freezes everything else, and re-solves only the radius. If that
//! sub-problem has no schedule, the radius widens one contender at a time,
//! most contended first, until it is solved, the change budget is reached
//! (`BudgetExceeded`), or nothing is left to free (`Infeasible`). A repair
//! never falls back to solving the whole schedule again.
//!
//! ```text
//! Requested -> BlastRadiusComputed -> SubsolveRunning -> Resolved
//!                    ^                      |         -> Infeasible
//!                    +------ widen ---------+         -> BudgetExceeded
//!                                                     -> TimedOut
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use timeweave_config::{RepairConfig, SchedulerConfig};
use timeweave_core::{
    Assignment, AssignmentSet, CompileErrors, EntitySnapshot, RequirementId, Result,
    ScheduleScore, TimeweaveError,
};

use crate::compiler::ModelCompiler;
use crate::conflict::ConflictGraph;
use crate::engine::SolverEngine;
use crate::index::OccupancyIndex;
use crate::model::Model;
use crate::statistics::SearchStatistics;
use crate::strategy::{BacktrackingStrategy, SolveOutcome, SolveStrategy, TieBreak};
use crate::termination::{Deadline, ExternalTermination, OrTermination};

/// Where a repair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairState {
    Requested,
    BlastRadiusComputed,
    SubsolveRunning,
    Resolved,
    Infeasible,
    BudgetExceeded,
    TimedOut,
}

impl RepairState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairState::Requested => "REQUESTED",
            RepairState::BlastRadiusComputed => "BLAST_RADIUS_COMPUTED",
            RepairState::SubsolveRunning => "SUBSOLVE_RUNNING",
            RepairState::Resolved => "RESOLVED",
            RepairState::Infeasible => "INFEASIBLE",
            RepairState::BudgetExceeded => "BUDGET_EXCEEDED",
            RepairState::TimedOut => "TIMED_OUT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RepairState::Resolved
                | RepairState::Infeasible
                | RepairState::BudgetExceeded
                | RepairState::TimedOut
        )
    }
}

/// One way to absorb the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRepair {
    /// The whole schedule after the repair, change included.
    pub assignments: AssignmentSet,
    /// Requirements whose placement differs from the original schedule,
    /// in id order. A requested move counts.
    pub moved: Vec<RequirementId>,
    pub faculty_changes: usize,
    pub day_changes: usize,
    pub room_type_changes: usize,
    /// Sub-solve attempt that produced it; 0 is the canonical order.
    pub attempt: usize,
}

impl CandidateRepair {
    pub fn score(&self) -> ScheduleScore {
        self.assignments.score()
    }

    fn rank(&self) -> (usize, usize, usize, usize, Reverse<ScheduleScore>) {
        (
            self.moved.len(),
            self.faculty_changes,
            self.day_changes,
            self.room_type_changes,
            Reverse(self.score()),
        )
    }
}

/// Result of a repair, with the states it passed through.
#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub state: RepairState,
    /// Best first; empty unless `state` is `Resolved`.
    pub candidates: Vec<CandidateRepair>,
    /// Requirements the repair was allowed to move, including the one a
    /// move change relocates.
    pub blast_radius: Vec<RequirementId>,
    /// Requirements that could not be placed, when known.
    pub unsatisfied: Vec<RequirementId>,
    pub detail: Option<String>,
    pub trace: Vec<RepairState>,
    pub statistics: SearchStatistics,
}

impl RepairOutcome {
    pub fn is_resolved(&self) -> bool {
        self.state == RepairState::Resolved
    }

    pub fn best(&self) -> Option<&CandidateRepair> {
        self.candidates.first()
    }
}

/// A repair job description.
#[derive(Debug, Clone)]
pub struct RepairRequest {
    pub set: AssignmentSet,
    pub graph: ConflictGraph,
    /// Most requirements the repair may move, a requested move included.
    pub change_budget: usize,
    /// Requirements that must not move.
    pub locked: BTreeSet<RequirementId>,
    pub deadline: Deadline,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RepairRequest {
    pub fn new(set: AssignmentSet, graph: ConflictGraph, change_budget: usize) -> Self {
        Self {
            set,
            graph,
            change_budget,
            locked: BTreeSet::new(),
            deadline: Deadline::none(),
            cancel: None,
        }
    }

    pub fn with_locked(mut self, locked: impl IntoIterator<Item = RequirementId>) -> Self {
        self.locked.extend(locked);
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

enum Subsolve {
    Solved(Vec<CandidateRepair>),
    Infeasible(Vec<RequirementId>, String),
    Unsatisfiable(CompileErrors),
    TimedOut,
}

/// Repairs schedules built on one entity snapshot.
#[derive(Debug, Clone)]
pub struct RepairEngine {
    snapshot: Arc<EntitySnapshot>,
    engine: SolverEngine,
    repair: RepairConfig,
    seed: u64,
}

impl RepairEngine {
    pub fn new(snapshot: Arc<EntitySnapshot>, config: &SchedulerConfig) -> Self {
        Self {
            snapshot,
            engine: SolverEngine::new(config.clone()),
            repair: config.repair.clone(),
            seed: config.random_seed,
        }
    }

    /// Repairs `set` against the conflicts in `graph`, moving at most
    /// `change_budget` requirements.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::UnknownAssignment`] when the graph names a
    /// requirement that is not in `set`.
    pub fn repair(
        &self,
        set: &AssignmentSet,
        graph: &ConflictGraph,
        change_budget: usize,
    ) -> Result<RepairOutcome> {
        self.run(&RepairRequest::new(set.clone(), graph.clone(), change_budget))
    }

    pub fn run(&self, request: &RepairRequest) -> Result<RepairOutcome> {
        let graph = &request.graph;
        for requirement in graph.roots().iter().chain(request.locked.iter()) {
            if !request.set.contains(*requirement) {
                return Err(TimeweaveError::UnknownAssignment(*requirement));
            }
        }

        let mut trace = vec![RepairState::Requested];
        let mut statistics = SearchStatistics::new();
        statistics.start();
        info!(
            event = "repair_start",
            change = %graph.change(),
            roots = graph.roots().len(),
            edges = graph.edges().len(),
            budget = request.change_budget,
        );

        let effective = Arc::new(graph.change().apply_to(&self.snapshot));
        let pinned = graph.pinned().cloned();
        let base = match &pinned {
            Some(moved) => request
                .set
                .with_replacements([moved.clone()], request.set.score()),
            None => request.set.clone(),
        };

        let finish = |state: RepairState,
                      mut trace: Vec<RepairState>,
                      candidates: Vec<CandidateRepair>,
                      radius: &BTreeSet<RequirementId>,
                      unsatisfied: Vec<RequirementId>,
                      detail: Option<String>,
                      mut statistics: SearchStatistics| {
            trace.push(state);
            statistics.finish();
            info!(
                event = "repair_end",
                state = state.as_str(),
                candidates = candidates.len(),
                blast_radius = radius.len(),
                duration_ms = statistics.duration.as_millis() as u64,
            );
            Ok(RepairOutcome {
                state,
                candidates,
                blast_radius: radius.iter().copied().collect(),
                unsatisfied,
                detail,
                trace,
                statistics,
            })
        };

        if let Some(moved) = &pinned {
            let broken: BTreeSet<_> = graph
                .edges_of(moved.requirement)
                .filter(|e| e.is_unary())
                .map(|e| e.kind.code())
                .collect();
            if !broken.is_empty() {
                let detail = format!(
                    "the requested placement itself breaks {}",
                    broken.into_iter().collect::<Vec<_>>().join(", ")
                );
                return finish(
                    RepairState::Infeasible,
                    trace,
                    Vec::new(),
                    &BTreeSet::new(),
                    vec![moved.requirement],
                    Some(detail),
                    statistics,
                );
            }
        }

        let pinned_id = pinned.as_ref().map(|a| a.requirement);
        let mut excluded = request.locked.clone();
        excluded.extend(pinned_id);

        // The moved assignment belongs to the radius but stays where it was
        // asked to go; only the rest of the radius is re-solved.
        let mut radius = graph.component_from(graph.roots());
        radius.extend(pinned_id);
        let is_free = |r: &RequirementId| Some(*r) != pinned_id;
        let locked_hits: Vec<RequirementId> =
            radius.intersection(&request.locked).copied().collect();
        if !locked_hits.is_empty() {
            return finish(
                RepairState::Infeasible,
                trace,
                Vec::new(),
                &radius,
                locked_hits,
                Some("the change conflicts with locked assignments".to_string()),
                statistics,
            );
        }
        trace.push(RepairState::BlastRadiusComputed);

        if radius.len() > request.change_budget {
            let detail = format!(
                "{} requirements conflict with the change; the budget allows {}",
                radius.len(),
                request.change_budget
            );
            return finish(
                RepairState::BudgetExceeded,
                trace,
                Vec::new(),
                &radius,
                Vec::new(),
                Some(detail),
                statistics,
            );
        }
        if !radius.iter().any(is_free) {
            let score = self
                .engine
                .scorer()
                .score(&effective, base.iter());
            let applied = AssignmentSet::new(base.assignments().to_vec(), score);
            let candidate = self.describe_candidate(&request.set, applied, 0);
            return finish(
                RepairState::Resolved,
                trace,
                vec![candidate],
                &radius,
                Vec::new(),
                None,
                statistics,
            );
        }

        let deadline = request
            .deadline
            .min(Deadline::from_limit(self.engine.config().time_limit()));

        loop {
            trace.push(RepairState::SubsolveRunning);
            debug!(radius = radius.len(), "Repair sub-solve");
            let model = match ModelCompiler::new(effective.clone())
                .with_requirements(radius.iter().copied().filter(is_free))
                .with_fixed(
                    base.iter()
                        .filter(|a| !radius.contains(&a.requirement) || !is_free(&a.requirement))
                        .cloned(),
                )
                .compile()
            {
                Ok(model) => model,
                Err(errors) => {
                    let (unsatisfied, detail) = Self::describe(errors);
                    return finish(
                        RepairState::Infeasible,
                        trace,
                        Vec::new(),
                        &radius,
                        unsatisfied,
                        Some(detail),
                        statistics,
                    );
                }
            };

            match self.subsolve(
                &model,
                &request.set,
                &base,
                deadline,
                request.cancel.clone(),
                &mut statistics,
            ) {
                Subsolve::Solved(candidates) => {
                    return finish(
                        RepairState::Resolved,
                        trace,
                        candidates,
                        &radius,
                        Vec::new(),
                        None,
                        statistics,
                    );
                }
                Subsolve::TimedOut => {
                    return finish(
                        RepairState::TimedOut,
                        trace,
                        Vec::new(),
                        &radius,
                        Vec::new(),
                        Some("the deadline passed before a repair was found".to_string()),
                        statistics,
                    );
                }
                Subsolve::Unsatisfiable(errors) => {
                    let (unsatisfied, detail) = Self::describe(errors);
                    return finish(
                        RepairState::Infeasible,
                        trace,
                        Vec::new(),
                        &radius,
                        unsatisfied,
                        Some(detail),
                        statistics,
                    );
                }
                Subsolve::Infeasible(unsatisfied, detail) => {
                    let contenders = Self::contenders(&model, &base, &radius, &excluded);
                    let Some(&next) = contenders.first() else {
                        return finish(
                            RepairState::Infeasible,
                            trace,
                            Vec::new(),
                            &radius,
                            unsatisfied,
                            Some(detail),
                            statistics,
                        );
                    };
                    if radius.len() >= request.change_budget {
                        let detail = format!(
                            "no repair moves {} or fewer requirements; {} more could be freed",
                            request.change_budget,
                            contenders.len()
                        );
                        return finish(
                            RepairState::BudgetExceeded,
                            trace,
                            Vec::new(),
                            &radius,
                            unsatisfied,
                            Some(detail),
                            statistics,
                        );
                    }
                    debug!(added = %next, radius = radius.len() + 1, "Widening blast radius");
                    radius.insert(next);
                    trace.push(RepairState::BlastRadiusComputed);
                }
            }
        }
    }

    fn describe(errors: CompileErrors) -> (Vec<RequirementId>, String) {
        let detail = errors.to_string();
        let mut unsatisfied: Vec<RequirementId> = errors.iter().map(|e| e.requirement).collect();
        unsatisfied.sort();
        unsatisfied.dedup();
        (unsatisfied, detail)
    }

    /// Runs the canonical attempt and the perturbed retries in parallel and
    /// turns every feasible result into a ranked, deduplicated candidate.
    fn subsolve(
        &self,
        model: &Model,
        original: &AssignmentSet,
        base: &AssignmentSet,
        deadline: Deadline,
        cancel: Option<Arc<AtomicBool>>,
        statistics: &mut SearchStatistics,
    ) -> Subsolve {
        let attempts = self.repair.attempts.max(1);
        let outcomes: Vec<SolveOutcome> = (0..attempts)
            .into_par_iter()
            .map(|attempt| {
                if attempt == 0 {
                    return self.engine.solve_with(model, deadline, cancel.clone());
                }
                let mut termination = OrTermination::new().with(deadline);
                if let Some(flag) = cancel.clone() {
                    termination.push(ExternalTermination::new(flag));
                }
                BacktrackingStrategy::new(self.engine.settings().clone())
                    .with_tie_break(TieBreak::Perturbed(
                        self.seed.wrapping_add(attempt as u64),
                    ))
                    .solve(model, &termination)
            })
            .collect();

        let mut candidates: Vec<CandidateRepair> = Vec::new();
        let mut infeasible: Option<(Vec<RequirementId>, String)> = None;
        let mut timed_out = false;
        for (attempt, outcome) in outcomes.into_iter().enumerate() {
            statistics.absorb(outcome.statistics());
            match outcome {
                SolveOutcome::Feasible(solution) => {
                    let score = solution.score();
                    let repaired = base.with_replacements(
                        solution.assignments.assignments().iter().cloned(),
                        score,
                    );
                    candidates.push(self.describe_candidate(original, repaired, attempt));
                }
                SolveOutcome::Infeasible(reason) => {
                    infeasible.get_or_insert((reason.requirements, reason.detail));
                }
                SolveOutcome::TimedOut(_) => timed_out = true,
            }
        }

        if candidates.is_empty() {
            // An exhausted search is conclusive even if a sibling attempt timed out.
            return match infeasible {
                Some((requirements, detail)) => Subsolve::Infeasible(requirements, detail),
                None if timed_out => Subsolve::TimedOut,
                None => Subsolve::Infeasible(Vec::new(), "no attempt completed".to_string()),
            };
        }

        candidates.sort_by(|a, b| {
            a.rank()
                .cmp(&b.rank())
                .then_with(|| a.assignments.assignments().cmp(b.assignments.assignments()))
        });
        candidates.dedup_by(|later, earlier| later.assignments == earlier.assignments);
        candidates.truncate(self.repair.max_candidates.max(1));
        Subsolve::Solved(candidates)
    }

    fn describe_candidate(
        &self,
        original: &AssignmentSet,
        repaired: AssignmentSet,
        attempt: usize,
    ) -> CandidateRepair {
        let calendar = self.snapshot.calendar();
        let day_of = |a: &Assignment| {
            a.timeslots
                .first()
                .and_then(|slot| calendar.timeslot(*slot))
                .map(|slot| slot.day)
        };
        let type_of = |a: &Assignment| self.snapshot.room(a.room).map(|room| room.room_type);

        let moved = original.differing(&repaired);
        let mut faculty_changes = 0;
        let mut day_changes = 0;
        let mut room_type_changes = 0;
        for requirement in &moved {
            let (Some(before), Some(after)) =
                (original.get(*requirement), repaired.get(*requirement))
            else {
                continue;
            };
            faculty_changes += usize::from(before.faculty != after.faculty);
            day_changes += usize::from(day_of(before) != day_of(after));
            room_type_changes += usize::from(type_of(before) != type_of(after));
        }

        CandidateRepair {
            assignments: repaired,
            moved,
            faculty_changes,
            day_changes,
            room_type_changes,
            attempt,
        }
    }

    /// Assignments outside the radius whose sessions stand in the way of a
    /// radius requirement, most contended first, then by id.
    fn contenders(
        model: &Model,
        base: &AssignmentSet,
        radius: &BTreeSet<RequirementId>,
        excluded: &BTreeSet<RequirementId>,
    ) -> Vec<RequirementId> {
        let index = OccupancyIndex::from_assignments(
            base.iter()
                .filter(|a| !radius.contains(&a.requirement) && !excluded.contains(&a.requirement)),
        );
        let mut blocking: BTreeMap<RequirementId, usize> = BTreeMap::new();
        for var in model.variables() {
            for value in &var.domain {
                let holders: BTreeSet<RequirementId> = index
                    .clashes(var.section, var.faculty, value.room, &value.slots, var.requirement)
                    .into_iter()
                    .map(|(_, _, holder)| holder)
                    .collect();
                for holder in holders {
                    *blocking.entry(holder).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<(RequirementId, usize)> = blocking.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(requirement, _)| requirement).collect()
    }
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
