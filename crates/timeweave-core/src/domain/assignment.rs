//! Assignments and immutable assignment sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{CourseId, FacultyId, RequirementId, RoomId, SectionId, TimeslotId};
use crate::score::ScheduleScore;

/// One scheduled session: who teaches which section, where, and when.
///
/// `timeslots` holds the consecutive periods the session occupies; the first
/// entry is the start slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub requirement: RequirementId,
    pub section: SectionId,
    pub course: CourseId,
    pub faculty: FacultyId,
    pub room: RoomId,
    pub timeslots: Vec<TimeslotId>,
}

impl Assignment {
    /// The start timeslot.
    ///
    /// # Panics
    ///
    /// Panics if the assignment occupies no timeslot, which the solver never
    /// produces.
    pub fn timeslot(&self) -> TimeslotId {
        self.timeslots[0]
    }

    pub fn occupies(&self, slot: TimeslotId) -> bool {
        self.timeslots.contains(&slot)
    }

    /// Returns true if both assignments occupy at least one common timeslot.
    pub fn overlaps(&self, other: &Assignment) -> bool {
        self.timeslots.iter().any(|s| other.timeslots.contains(s))
    }

    /// Returns true if room, time, and faculty are identical.
    pub fn same_placement(&self, other: &Assignment) -> bool {
        self.room == other.room && self.faculty == other.faculty && self.timeslots == other.timeslots
    }
}

/// One complete, immutable schedule instance.
///
/// Assignments are kept sorted by requirement id so that two sets built from
/// the same assignments serialize identically. A repair never mutates a set;
/// it derives a new one with [`AssignmentSet::with_replacements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSet {
    assignments: Vec<Assignment>,
    score: ScheduleScore,
}

impl AssignmentSet {
    pub fn new(mut assignments: Vec<Assignment>, score: ScheduleScore) -> Self {
        assignments.sort_by_key(|a| a.requirement);
        assignments.dedup_by_key(|a| a.requirement);
        Self { assignments, score }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), ScheduleScore::ZERO)
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn score(&self) -> ScheduleScore {
        self.score
    }

    pub fn get(&self, requirement: RequirementId) -> Option<&Assignment> {
        self.assignments
            .binary_search_by_key(&requirement, |a| a.requirement)
            .ok()
            .map(|idx| &self.assignments[idx])
    }

    pub fn contains(&self, requirement: RequirementId) -> bool {
        self.get(requirement).is_some()
    }

    /// Derives a new set where `replacements` supersede the assignments for
    /// the same requirements. `self` is left untouched.
    pub fn with_replacements(
        &self,
        replacements: impl IntoIterator<Item = Assignment>,
        score: ScheduleScore,
    ) -> AssignmentSet {
        let replacements: Vec<Assignment> = replacements.into_iter().collect();
        let replaced: BTreeSet<RequirementId> =
            replacements.iter().map(|a| a.requirement).collect();
        let merged = self
            .assignments
            .iter()
            .filter(|a| !replaced.contains(&a.requirement))
            .cloned()
            .chain(replacements)
            .collect();
        AssignmentSet::new(merged, score)
    }

    /// Requirements whose assignment differs between the two sets, including
    /// requirements present in only one of them.
    pub fn differing(&self, other: &AssignmentSet) -> Vec<RequirementId> {
        let ids: BTreeSet<RequirementId> = self
            .assignments
            .iter()
            .chain(other.assignments.iter())
            .map(|a| a.requirement)
            .collect();
        ids.into_iter()
            .filter(|id| self.get(*id) != other.get(*id))
            .collect()
    }
}

impl<'a> IntoIterator for &'a AssignmentSet {
    type Item = &'a Assignment;
    type IntoIter = std::slice::Iter<'a, Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.assignments.iter()
    }
}
