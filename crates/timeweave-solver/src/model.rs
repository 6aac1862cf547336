//! The backend-neutral constraint model.
//!
//! A [`Model`] holds one decision variable per meeting requirement to be
//! placed, each with a finite, deterministically ordered domain of
//! (room, timeslot span) values. Assignments already fixed in place (frozen
//! by a repair or pinned by a proposed move) travel with the model so that
//! every strategy sees the same occupancy.

use std::sync::Arc;

use smallvec::SmallVec;
use timeweave_core::{
    Assignment, ClockTime, CourseId, EntitySnapshot, FacultyId, RequirementId, RoomId, RoomType,
    SectionId, TimeWindow, TimeslotId,
};

/// Consecutive timeslots covered by one session.
pub type Span = SmallVec<[TimeslotId; 4]>;

/// One candidate placement for a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainValue {
    pub room: RoomId,
    pub slots: Span,
    pub day: u8,
    /// Grid period of the first slot.
    pub first_period: u16,
    /// Grid period of the last slot.
    pub last_period: u16,
    pub window: TimeWindow,
}

impl DomainValue {
    pub fn start(&self) -> TimeslotId {
        self.slots[0]
    }

    pub fn start_time(&self) -> ClockTime {
        self.window.start
    }

    pub fn periods(&self) -> u16 {
        self.last_period - self.first_period + 1
    }

    /// Returns true if the two placements sit back to back on the same day.
    pub fn touches(&self, day: u8, first_period: u16, last_period: u16) -> bool {
        self.day == day
            && (self.last_period + 1 == first_period || last_period + 1 == self.first_period)
    }
}

/// A requirement to place, with the faculty member resolved.
#[derive(Debug, Clone)]
pub struct Variable {
    pub requirement: RequirementId,
    pub section: SectionId,
    pub course: CourseId,
    pub faculty: FacultyId,
    pub room_type: RoomType,
    pub periods: u8,
    pub domain: Vec<DomainValue>,
}

impl Variable {
    /// Builds the assignment this variable takes with `value`.
    pub fn assignment(&self, value: &DomainValue) -> Assignment {
        Assignment {
            requirement: self.requirement,
            section: self.section,
            course: self.course,
            faculty: self.faculty,
            room: value.room,
            timeslots: value.slots.to_vec(),
        }
    }

    /// Lab sessions of one course for one section are kept together.
    pub fn lab_group(&self) -> Option<(SectionId, CourseId)> {
        (self.room_type == RoomType::Lab).then_some((self.section, self.course))
    }
}

/// A compiled scheduling problem.
#[derive(Debug, Clone)]
pub struct Model {
    snapshot: Arc<EntitySnapshot>,
    variables: Vec<Variable>,
    fixed: Vec<Assignment>,
}

impl Model {
    pub(crate) fn new(
        snapshot: Arc<EntitySnapshot>,
        variables: Vec<Variable>,
        fixed: Vec<Assignment>,
    ) -> Self {
        Self {
            snapshot,
            variables,
            fixed,
        }
    }

    pub fn snapshot(&self) -> &Arc<EntitySnapshot> {
        &self.snapshot
    }

    /// Variables in requirement order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    /// Assignments that occupy resources but are not decided by the search.
    pub fn fixed(&self) -> &[Assignment] {
        &self.fixed
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Total number of (variable, value) pairs.
    pub fn domain_size(&self) -> usize {
        self.variables.iter().map(|v| v.domain.len()).sum()
    }

    pub fn index_of(&self, requirement: RequirementId) -> Option<usize> {
        self.variables
            .binary_search_by_key(&requirement, |v| v.requirement)
            .ok()
    }
}
