//! Full schedule scoring with per-rule explanation.
//!
//! Hard rules are counted at the hard level. Medium rules follow the
//! configured [`ConstraintMode`]: `Hard` counts them as hard, `Soft` at the
//! medium level, `Off` not at all. Soft rules are always soft. Every count
//! is multiplied by the rule's weight.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use timeweave_config::{PolicyConfig, SchedulerConfig, WeightsConfig};
use timeweave_core::{
    Assignment, ConstraintKind, ConstraintMode, CourseId, EntitySnapshot, FacultyId,
    MeetingRequirement, RequirementId, RoomId, RoomType, ScheduleScore, ScoreLevel, SectionId,
    TimeslotId,
};

use crate::index::Resource;

/// Score contribution of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintMatchTotal {
    pub kind: ConstraintKind,
    /// Level the rule was scored at under the active policy.
    pub level: ScoreLevel,
    /// Raw violation count before weighting.
    pub count: u64,
    pub penalty: ScheduleScore,
}

/// A score broken down by rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreExplanation {
    pub score: ScheduleScore,
    /// One entry per violated rule, in catalogue order.
    pub constraints: Vec<ConstraintMatchTotal>,
}

impl ScoreExplanation {
    pub fn count(&self, kind: ConstraintKind) -> u64 {
        self.constraints
            .iter()
            .find(|c| c.kind == kind)
            .map_or(0, |c| c.count)
    }

    pub fn is_feasible(&self) -> bool {
        self.score.is_feasible()
    }
}

/// Scores complete or partial schedules against an entity snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScheduleScorer {
    policy: PolicyConfig,
    weights: WeightsConfig,
}

impl ScheduleScorer {
    pub fn new(policy: PolicyConfig, weights: WeightsConfig) -> Self {
        Self { policy, weights }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.policy.clone(), config.weights.clone())
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Level a rule is scored at, or `None` when the policy turns it off.
    pub fn level_of(&self, kind: ConstraintKind) -> Option<ScoreLevel> {
        if !kind.is_medium() {
            return Some(kind.level());
        }
        match self.policy.mode(kind) {
            ConstraintMode::Hard => Some(ScoreLevel::Hard),
            ConstraintMode::Soft => Some(ScoreLevel::Medium),
            ConstraintMode::Off => None,
        }
    }

    /// Weighted penalty for `count` violations of `kind`.
    pub fn penalty(&self, kind: ConstraintKind, count: u64) -> ScheduleScore {
        match self.level_of(kind) {
            Some(level) if count > 0 => {
                ScheduleScore::penalty(level, count as i64 * self.weights.weight(kind))
            }
            _ => ScheduleScore::ZERO,
        }
    }

    pub fn score<'a>(
        &self,
        snapshot: &EntitySnapshot,
        assignments: impl IntoIterator<Item = &'a Assignment>,
    ) -> ScheduleScore {
        self.explain(snapshot, assignments).score
    }

    /// Scores the assignments and reports each violated rule.
    pub fn explain<'a>(
        &self,
        snapshot: &EntitySnapshot,
        assignments: impl IntoIterator<Item = &'a Assignment>,
    ) -> ScoreExplanation {
        let counts = violation_counts(snapshot, assignments, self.policy.max_daily_periods);

        let mut score = ScheduleScore::ZERO;
        let mut constraints = Vec::new();
        for kind in ConstraintKind::ALL {
            let count = counts.get(&kind).copied().unwrap_or(0);
            let Some(level) = self.level_of(kind) else {
                continue;
            };
            if count == 0 {
                continue;
            }
            let penalty = self.penalty(kind, count);
            score += penalty;
            constraints.push(ConstraintMatchTotal {
                kind,
                level,
                count,
                penalty,
            });
        }
        ScoreExplanation { score, constraints }
    }
}

/// Position of one assignment on the grid.
struct Placed<'a> {
    assignment: &'a Assignment,
    day: u8,
    periods: Vec<u16>,
}

fn violation_counts<'a>(
    snapshot: &EntitySnapshot,
    assignments: impl IntoIterator<Item = &'a Assignment>,
    max_daily_periods: u8,
) -> BTreeMap<ConstraintKind, u64> {
    let calendar = snapshot.calendar();
    let requirements: HashMap<RequirementId, &MeetingRequirement> =
        snapshot.requirements().iter().map(|r| (r.id, r)).collect();

    let mut counts: BTreeMap<ConstraintKind, u64> = BTreeMap::new();
    let mut bump = |kind: ConstraintKind, by: u64| {
        if by > 0 {
            *counts.entry(kind).or_insert(0) += by;
        }
    };

    let mut cells: HashMap<(Resource, TimeslotId), u64> = HashMap::new();
    let mut faculty_days: HashMap<(FacultyId, u8), Vec<u16>> = HashMap::new();
    let mut section_rooms: HashMap<(SectionId, u8), BTreeSet<RoomId>> = HashMap::new();
    let mut section_days: BTreeMap<SectionId, BTreeMap<u8, u64>> = BTreeMap::new();
    let mut lab_groups: HashMap<(SectionId, CourseId), Vec<(u8, u16, u16)>> = HashMap::new();

    for assignment in assignments {
        for &slot in &assignment.timeslots {
            for resource in [
                Resource::Room(assignment.room),
                Resource::Faculty(assignment.faculty),
                Resource::Section(assignment.section),
            ] {
                *cells.entry((resource, slot)).or_insert(0) += 1;
            }
        }

        let Some((day, window)) = calendar.span_window(&assignment.timeslots) else {
            bump(ConstraintKind::ShiftWindow, 1);
            continue;
        };
        let placed = Placed {
            assignment,
            day,
            periods: assignment
                .timeslots
                .iter()
                .filter_map(|id| calendar.timeslot(*id))
                .map(|slot| slot.period)
                .collect(),
        };

        let section = snapshot.section(assignment.section);
        let room_type = requirements
            .get(&assignment.requirement)
            .map(|r| r.room_type)
            .or_else(|| snapshot.course(assignment.course).map(|c| c.room_type));

        match snapshot.room(assignment.room) {
            None => bump(ConstraintKind::RoomType, 1),
            Some(room) => {
                let mismatched = room_type.is_some_and(|t| t != room.room_type)
                    || section.is_some_and(|s| s.required_room_type != room.room_type);
                if mismatched {
                    bump(ConstraintKind::RoomType, 1);
                }
                if section.is_some_and(|s| room.capacity < s.student_count) {
                    bump(ConstraintKind::RoomCapacity, 1);
                }
            }
        }

        let admitted = snapshot
            .shift_of(assignment.section)
            .is_some_and(|shift| shift.admits_window(day, &window));
        if !admitted {
            bump(ConstraintKind::ShiftWindow, 1);
        }
        if !snapshot.faculty_available(assignment.faculty, day, &window) {
            bump(ConstraintKind::FacultyAvailability, 1);
        }
        if calendar.recesses().iter().any(|r| r.overlaps(&window)) {
            bump(ConstraintKind::Recess, 1);
        }

        faculty_days
            .entry((assignment.faculty, day))
            .or_default()
            .extend(placed.periods.iter().copied());
        section_rooms
            .entry((assignment.section, day))
            .or_default()
            .insert(assignment.room);
        *section_days
            .entry(assignment.section)
            .or_default()
            .entry(day)
            .or_insert(0) += placed.periods.len() as u64;

        if room_type == Some(RoomType::Lab) {
            if let (Some(&first), Some(&last)) = (placed.periods.first(), placed.periods.last()) {
                lab_groups
                    .entry((assignment.section, placed.assignment.course))
                    .or_default()
                    .push((placed.day, first, last));
            }
        }
    }

    for ((resource, _), n) in &cells {
        let kind = match resource {
            Resource::Room(_) => ConstraintKind::RoomOccupancy,
            Resource::Faculty(_) => ConstraintKind::FacultyOccupancy,
            Resource::Section(_) => ConstraintKind::SectionOccupancy,
        };
        bump(kind, n.saturating_sub(1));
    }

    for periods in faculty_days.values_mut() {
        let load = periods.len() as u64;
        bump(
            ConstraintKind::FacultyDailyLoad,
            load.saturating_sub(u64::from(max_daily_periods)),
        );

        periods.sort_unstable();
        periods.dedup();
        if let (Some(first), Some(last)) = (periods.first(), periods.last()) {
            let spread = u64::from(last - first) + 1;
            bump(ConstraintKind::FacultyIdleGap, spread - periods.len() as u64);
        }
    }

    for rooms in section_rooms.values() {
        bump(
            ConstraintKind::SectionRoomChange,
            rooms.len().saturating_sub(1) as u64,
        );
    }

    for (section, days) in &section_days {
        let working: Vec<u8> = snapshot
            .shift_of(*section)
            .map(|shift| shift.working_days.clone())
            .unwrap_or_default();
        let loads: Vec<u64> = working
            .iter()
            .filter(|d| calendar.timeslots().iter().any(|s| s.day == **d))
            .map(|d| days.get(d).copied().unwrap_or(0))
            .collect();
        if let (Some(max), Some(min)) = (loads.iter().max(), loads.iter().min()) {
            bump(ConstraintKind::DailyLoadBalance, max - min);
        }
    }

    for members in lab_groups.values() {
        if members.len() < 2 {
            continue;
        }
        let isolated = members
            .iter()
            .enumerate()
            .filter(|(i, (day, first, last))| {
                !members.iter().enumerate().any(|(j, (d, f, l))| {
                    j != *i && d == day && (*l + 1 == *first || *last + 1 == *f)
                })
            })
            .count();
        bump(ConstraintKind::LabContiguity, isolated as u64);
    }

    counts
}

#[cfg(test)]
#[path = "scoring_tests.rs"]
mod tests;
