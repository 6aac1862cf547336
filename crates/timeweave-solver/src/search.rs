//! Depth-first search over a [`Model`] shared by every strategy.
//!
//! The driver keeps an explicit stack of frames, one per decided variable,
//! so search depth never touches the call stack. A [`Decider`] picks the
//! next variable and orders its values; the driver handles placement,
//! backtracking, bound pruning, optimisation budgets, and termination.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use smallvec::SmallVec;
use tracing::trace;
use timeweave_core::{
    Assignment, AssignmentSet, ConstraintKind, ConstraintMode, CourseId, FacultyId, RequirementId,
    RoomId, RoomType, ScheduleScore, SectionId,
};

use crate::index::{Occupancy, OccupancyIndex};
use crate::model::{DomainValue, Model};
use crate::scoring::ScheduleScorer;
use crate::statistics::SearchStatistics;
use crate::strategy::{InfeasibleReason, PartialProgress, Solution, SolveOutcome};
use crate::termination::Termination;

/// Medium rules a value would break, evaluated against the current partial
/// schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MediumCheck {
    /// A rule in `Hard` mode is broken; the value must be skipped.
    pub blocked: bool,
    /// Rules in `Soft` mode that are broken.
    pub violations: u8,
}

/// Undo record for one placement.
#[derive(Debug)]
pub(crate) struct Placement {
    variable: usize,
    value: usize,
    occupancy: Occupancy,
    penalty: ScheduleScore,
}

/// Resource usage of the sessions placed so far, fixed ones included.
#[derive(Debug)]
pub(crate) struct PartialSchedule<'m> {
    model: &'m Model,
    scorer: &'m ScheduleScorer,
    index: OccupancyIndex,
    chosen: Vec<Option<usize>>,
    placed: usize,
    faculty_load: HashMap<(FacultyId, u8), u16>,
    section_rooms: HashMap<(SectionId, u8), SmallVec<[(RoomId, u16); 4]>>,
    lab_positions: HashMap<(SectionId, CourseId), SmallVec<[(u8, u16, u16); 4]>>,
    bound: ScheduleScore,
}

impl<'m> PartialSchedule<'m> {
    pub fn new(model: &'m Model, scorer: &'m ScheduleScorer) -> Self {
        let mut schedule = Self {
            model,
            scorer,
            index: OccupancyIndex::new(),
            chosen: vec![None; model.len()],
            placed: 0,
            faculty_load: HashMap::new(),
            section_rooms: HashMap::new(),
            lab_positions: HashMap::new(),
            bound: ScheduleScore::ZERO,
        };
        for assignment in model.fixed() {
            schedule.seed(assignment);
        }
        schedule
    }

    fn seed(&mut self, assignment: &Assignment) {
        let model = self.model;
        let snapshot = model.snapshot();
        let calendar = snapshot.calendar();
        self.index.insert(assignment);

        let Some((day, window)) = calendar.span_window(&assignment.timeslots) else {
            return;
        };
        let periods: SmallVec<[u16; 4]> = assignment
            .timeslots
            .iter()
            .filter_map(|id| calendar.timeslot(*id))
            .map(|slot| slot.period)
            .collect();
        let (Some(&first), Some(&last)) = (periods.first(), periods.last()) else {
            return;
        };
        let value = DomainValue {
            room: assignment.room,
            slots: assignment.timeslots.iter().copied().collect(),
            day,
            first_period: first,
            last_period: last,
            window,
        };
        let is_lab = snapshot
            .requirement(assignment.requirement)
            .map(|r| r.room_type)
            .or_else(|| snapshot.course(assignment.course).map(|c| c.room_type))
            == Some(RoomType::Lab);

        let penalty = self.monotone_delta(assignment.faculty, assignment.section, &value);
        self.bound += penalty;
        self.record(assignment.faculty, assignment.section, &value);
        if is_lab {
            self.lab_positions
                .entry((assignment.section, assignment.course))
                .or_default()
                .push((day, first, last));
        }
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    pub fn is_assigned(&self, variable: usize) -> bool {
        self.chosen[variable].is_some()
    }

    pub fn placed(&self) -> usize {
        self.placed
    }

    /// Penalties so far from rules that can only grow as sessions are added.
    pub fn bound(&self) -> ScheduleScore {
        self.bound
    }

    /// Returns true if the value's room, faculty, and section are free.
    pub fn fits(&self, variable: usize, value: usize) -> bool {
        let var = self.model.variable(variable);
        let value = &var.domain[value];
        self.index
            .fits(var.section, var.faculty, value.room, &value.slots)
    }

    /// Medium rules the value would break under the active policy.
    pub fn medium_check(&self, variable: usize, value: usize) -> MediumCheck {
        let var = self.model.variable(variable);
        let value = &var.domain[value];
        let policy = self.scorer.policy();
        let snapshot = self.model.snapshot();

        let lab_split = var.lab_group().is_some_and(|group| {
            self.lab_positions.get(&group).is_some_and(|siblings| {
                !siblings.is_empty()
                    && !siblings
                        .iter()
                        .any(|&(day, first, last)| value.touches(day, first, last))
            })
        });
        let load = self
            .faculty_load
            .get(&(var.faculty, value.day))
            .copied()
            .unwrap_or(0);
        let overloaded = load + value.periods() > u16::from(policy.max_daily_periods);
        let in_recess = snapshot
            .calendar()
            .recesses()
            .iter()
            .any(|r| r.overlaps(&value.window));

        let mut check = MediumCheck::default();
        for (kind, broken) in [
            (ConstraintKind::LabContiguity, lab_split),
            (ConstraintKind::FacultyDailyLoad, overloaded),
            (ConstraintKind::Recess, in_recess),
        ] {
            if !broken {
                continue;
            }
            match policy.mode(kind) {
                ConstraintMode::Hard => check.blocked = true,
                ConstraintMode::Soft => check.violations += 1,
                ConstraintMode::Off => {}
            }
        }
        check
    }

    /// Growth of the monotone penalties if the value were placed.
    pub fn value_delta(&self, variable: usize, value: usize) -> ScheduleScore {
        let var = self.model.variable(variable);
        self.monotone_delta(var.faculty, var.section, &var.domain[value])
    }

    fn monotone_delta(
        &self,
        faculty: FacultyId,
        section: SectionId,
        value: &DomainValue,
    ) -> ScheduleScore {
        let max = u64::from(self.scorer.policy().max_daily_periods);
        let load = u64::from(
            self.faculty_load
                .get(&(faculty, value.day))
                .copied()
                .unwrap_or(0),
        );
        let excess_before = load.saturating_sub(max);
        let excess_after = (load + u64::from(value.periods())).saturating_sub(max);

        let rooms = self.section_rooms.get(&(section, value.day));
        let new_room = rooms.is_some_and(|rooms| {
            !rooms.is_empty() && !rooms.iter().any(|(room, _)| *room == value.room)
        });

        let in_recess = self
            .model
            .snapshot()
            .calendar()
            .recesses()
            .iter()
            .any(|r| r.overlaps(&value.window));

        self.scorer
            .penalty(ConstraintKind::FacultyDailyLoad, excess_after - excess_before)
            + self
                .scorer
                .penalty(ConstraintKind::SectionRoomChange, u64::from(new_room))
            + self
                .scorer
                .penalty(ConstraintKind::Recess, u64::from(in_recess))
    }

    fn record(&mut self, faculty: FacultyId, section: SectionId, value: &DomainValue) {
        *self.faculty_load.entry((faculty, value.day)).or_insert(0) += value.periods();
        let rooms = self.section_rooms.entry((section, value.day)).or_default();
        match rooms.iter_mut().find(|(room, _)| *room == value.room) {
            Some((_, count)) => *count += 1,
            None => rooms.push((value.room, 1)),
        }
    }

    fn forget(&mut self, faculty: FacultyId, section: SectionId, value: &DomainValue) {
        if let Some(load) = self.faculty_load.get_mut(&(faculty, value.day)) {
            *load = load.saturating_sub(value.periods());
        }
        if let Some(rooms) = self.section_rooms.get_mut(&(section, value.day)) {
            if let Some(pos) = rooms.iter().position(|(room, _)| *room == value.room) {
                rooms[pos].1 -= 1;
                if rooms[pos].1 == 0 {
                    rooms.remove(pos);
                }
            }
        }
    }

    pub fn place(&mut self, variable: usize, value: usize) -> Placement {
        let model = self.model;
        let var = model.variable(variable);
        let chosen = &var.domain[value];

        let penalty = self.monotone_delta(var.faculty, var.section, chosen);
        let occupancy = self.index.occupy(
            var.requirement,
            var.section,
            var.faculty,
            chosen.room,
            &chosen.slots,
        );
        self.record(var.faculty, var.section, chosen);
        if let Some(group) = var.lab_group() {
            self.lab_positions.entry(group).or_default().push((
                chosen.day,
                chosen.first_period,
                chosen.last_period,
            ));
        }
        self.bound += penalty;
        self.chosen[variable] = Some(value);
        self.placed += 1;

        Placement {
            variable,
            value,
            occupancy,
            penalty,
        }
    }

    pub fn unplace(&mut self, placement: Placement) {
        let model = self.model;
        let var = model.variable(placement.variable);
        let chosen = &var.domain[placement.value];

        self.index.release(&placement.occupancy);
        self.forget(var.faculty, var.section, chosen);
        if let Some(group) = var.lab_group() {
            if let Some(positions) = self.lab_positions.get_mut(&group) {
                let entry = (chosen.day, chosen.first_period, chosen.last_period);
                if let Some(pos) = positions.iter().rposition(|p| *p == entry) {
                    positions.remove(pos);
                }
            }
        }
        self.bound = self.bound - placement.penalty;
        self.chosen[placement.variable] = None;
        self.placed -= 1;
    }

    /// Values that fit and are not blocked by a `Hard` medium rule, in
    /// domain order, with their soft violation counts.
    pub fn admissible(&self, variable: usize) -> Vec<(usize, MediumCheck)> {
        (0..self.model.variable(variable).domain.len())
            .filter(|&value| self.fits(variable, value))
            .map(|value| (value, self.medium_check(variable, value)))
            .filter(|(_, check)| !check.blocked)
            .collect()
    }

    /// Assignments for every decided variable.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.chosen
            .iter()
            .enumerate()
            .filter_map(|(variable, value)| {
                let var = self.model.variable(variable);
                value.map(|value| var.assignment(&var.domain[value]))
            })
            .collect()
    }

    /// Full score of the fixed sessions plus every decided variable.
    pub fn full_score(&self, decided: &[Assignment]) -> ScheduleScore {
        self.scorer.score(
            self.model.snapshot(),
            self.model.fixed().iter().chain(decided.iter()),
        )
    }
}

/// Chooses variables and orders their values.
pub(crate) trait Decider {
    /// The next variable to decide, given that `depth` are decided.
    fn next_variable(&mut self, state: &PartialSchedule<'_>, depth: usize) -> usize;

    /// Value indices to try for `variable`, best first. Only values that
    /// fit and are not blocked may be returned.
    fn order_values(&mut self, state: &PartialSchedule<'_>, variable: usize) -> Vec<usize>;
}

/// Budgets for one search run.
#[derive(Debug, Clone)]
pub(crate) struct SearchLimits {
    /// Keep searching for better schedules after the first feasible one.
    pub optimize: bool,
    /// Nodes the run may expand in total.
    pub node_limit: Option<u64>,
    /// Nodes allowed after the first feasible schedule.
    pub improve_nodes: Option<u64>,
    /// Time allowed after the first feasible schedule.
    pub improve_time: Option<Duration>,
}

struct Frame {
    variable: usize,
    candidates: Vec<usize>,
    cursor: usize,
    placement: Option<Placement>,
}

enum Stop {
    Exhausted,
    FirstSolution,
    ImproveBudget,
    Terminated,
}

/// Runs a depth-first search and converts the result to an outcome.
pub(crate) fn run_search(
    model: &Model,
    scorer: &ScheduleScorer,
    decider: &mut dyn Decider,
    limits: &SearchLimits,
    termination: &dyn Termination,
) -> SolveOutcome {
    let mut stats = SearchStatistics::new();
    stats.start();
    let mut state = PartialSchedule::new(model, scorer);

    let starved: Vec<RequirementId> = (0..model.len())
        .filter(|&v| state.admissible(v).is_empty())
        .map(|v| model.variable(v).requirement)
        .collect();
    if !starved.is_empty() {
        stats.finish();
        return SolveOutcome::Infeasible(InfeasibleReason {
            requirements: starved,
            detail: "no placement is free once fixed sessions are in place".to_string(),
            statistics: stats,
        });
    }

    let total = model.len();
    let mut best: Option<(ScheduleScore, Vec<Assignment>)> = None;
    let mut wipeouts: BTreeMap<RequirementId, u64> = BTreeMap::new();
    let mut improving_since: Option<(Instant, u64)> = None;
    let mut deepest = 0usize;
    let mut stack: Vec<Frame> = Vec::with_capacity(total);

    if total > 0 {
        let first = decider.next_variable(&state, 0);
        let candidates = decider.order_values(&state, first);
        stack.push(Frame {
            variable: first,
            candidates,
            cursor: 0,
            placement: None,
        });
    }

    let stop = loop {
        if total == 0 {
            let score = state.full_score(&[]);
            stats.solutions += 1;
            stats.record_improvement(score);
            best = Some((score, Vec::new()));
            break Stop::FirstSolution;
        }
        if termination.is_terminated(&stats)
            || limits.node_limit.is_some_and(|limit| stats.nodes >= limit)
        {
            break Stop::Terminated;
        }
        if let Some((since, nodes)) = improving_since {
            let out_of_nodes = limits
                .improve_nodes
                .is_some_and(|limit| stats.nodes - nodes >= limit);
            let out_of_time = limits
                .improve_time
                .is_some_and(|limit| since.elapsed() >= limit);
            if out_of_nodes || out_of_time {
                break Stop::ImproveBudget;
            }
        }

        let depth = stack.len();
        let Some(frame) = stack.last_mut() else {
            break Stop::Exhausted;
        };
        if let Some(placement) = frame.placement.take() {
            state.unplace(placement);
        }
        if frame.cursor >= frame.candidates.len() {
            let requirement = model.variable(frame.variable).requirement;
            trace!(requirement = %requirement, depth, "Backtrack");
            *wipeouts.entry(requirement).or_insert(0) += 1;
            stats.backtracks += 1;
            stack.pop();
            continue;
        }

        let value = frame.candidates[frame.cursor];
        frame.cursor += 1;
        stats.nodes += 1;
        frame.placement = Some(state.place(frame.variable, value));
        deepest = deepest.max(depth);

        if let Some((best_score, _)) = &best {
            if state.bound() <= *best_score {
                stats.pruned += 1;
                continue;
            }
        }

        if depth == total {
            stats.solutions += 1;
            let decided = state.assignments();
            let score = state.full_score(&decided);
            if best.as_ref().map_or(true, |(b, _)| score > *b) {
                stats.record_improvement(score);
                best = Some((score, decided));
            }
            if !limits.optimize {
                break Stop::FirstSolution;
            }
            if improving_since.is_none() {
                improving_since = Some((Instant::now(), stats.nodes));
            }
            continue;
        }

        let next = decider.next_variable(&state, depth);
        let candidates = decider.order_values(&state, next);
        stack.push(Frame {
            variable: next,
            candidates,
            cursor: 0,
            placement: None,
        });
    };

    stats.finish();
    match (best, stop) {
        (Some((score, decided)), stop) => SolveOutcome::Feasible(Solution {
            assignments: AssignmentSet::new(decided, score),
            optimal: matches!(stop, Stop::Exhausted),
            statistics: stats,
        }),
        (None, Stop::Exhausted) => {
            let mut culprits: Vec<(RequirementId, u64)> = wipeouts.into_iter().collect();
            culprits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            let detail = format!(
                "search exhausted after {} nodes; {} requirement(s) ran out of placements",
                stats.nodes,
                culprits.len()
            );
            let mut requirements: Vec<RequirementId> = culprits.into_iter().map(|c| c.0).collect();
            requirements.sort();
            SolveOutcome::Infeasible(InfeasibleReason {
                requirements,
                detail,
                statistics: stats,
            })
        }
        (None, _) => SolveOutcome::TimedOut(PartialProgress {
            placed: deepest,
            total,
            statistics: stats,
        }),
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
