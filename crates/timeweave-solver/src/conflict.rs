//! Conflict detection for proposed changes.
//!
//! Detection is a pure query: the assignment set and snapshot are never
//! touched. The result is a [`ConflictGraph`] whose nodes are requirements
//! and whose edges name the hard rule that a proposed change would break.
//! Unary edges (capacity, room type, shift window, a removed room, a newly
//! blocked faculty window) have no target.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use timeweave_core::{
    Assignment, AssignmentSet, EntitySnapshot, FacultyId, FacultyUnavailability, RequirementId,
    Result, RoomId, TimeWindow, TimeslotId, TimeweaveError,
};

use crate::index::{OccupancyIndex, Resource};

/// An edit to an existing schedule or to the entities behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposedChange {
    /// Place a session at a new room, start timeslot, and faculty member.
    MoveAssignment {
        requirement: RequirementId,
        room: RoomId,
        timeslot: TimeslotId,
        faculty: FacultyId,
    },
    /// Take a room out of service.
    RemoveRoom { room: RoomId },
    /// Withdraw part of a faculty member's availability.
    RemoveFacultyAvailability {
        faculty: FacultyId,
        day: u8,
        window: TimeWindow,
    },
}

impl ProposedChange {
    pub fn move_assignment(
        requirement: impl Into<RequirementId>,
        room: impl Into<RoomId>,
        timeslot: impl Into<TimeslotId>,
        faculty: impl Into<FacultyId>,
    ) -> Self {
        ProposedChange::MoveAssignment {
            requirement: requirement.into(),
            room: room.into(),
            timeslot: timeslot.into(),
            faculty: faculty.into(),
        }
    }

    pub fn remove_room(room: impl Into<RoomId>) -> Self {
        ProposedChange::RemoveRoom { room: room.into() }
    }

    pub fn remove_faculty_availability(
        faculty: impl Into<FacultyId>,
        day: u8,
        window: TimeWindow,
    ) -> Self {
        ProposedChange::RemoveFacultyAvailability {
            faculty: faculty.into(),
            day,
            window,
        }
    }

    /// The snapshot as it stands once the change is in effect.
    pub fn apply_to(&self, snapshot: &EntitySnapshot) -> EntitySnapshot {
        match self {
            ProposedChange::MoveAssignment { .. } => snapshot.clone(),
            ProposedChange::RemoveRoom { room } => snapshot.without_room(*room),
            ProposedChange::RemoveFacultyAvailability {
                faculty,
                day,
                window,
            } => snapshot
                .clone()
                .with_unavailability(FacultyUnavailability::new(*faculty, *day, *window)),
        }
    }
}

impl fmt::Display for ProposedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposedChange::MoveAssignment {
                requirement,
                room,
                timeslot,
                faculty,
            } => write!(f, "move {} to {} at {} with {}", requirement, room, timeslot, faculty),
            ProposedChange::RemoveRoom { room } => write!(f, "remove {}", room),
            ProposedChange::RemoveFacultyAvailability {
                faculty,
                day,
                window,
            } => write!(f, "block {} on day {} {}", faculty, day, window),
        }
    }
}

/// The hard rule behind a conflict edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    Room,
    Faculty,
    Section,
    Capacity,
    TypeMismatch,
    ShiftWindow,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::Room => "ROOM",
            ConflictKind::Faculty => "FACULTY",
            ConflictKind::Section => "SECTION",
            ConflictKind::Capacity => "CAPACITY",
            ConflictKind::TypeMismatch => "TYPE_MISMATCH",
            ConflictKind::ShiftWindow => "SHIFT_WINDOW",
        }
    }

    fn of(resource: Resource) -> Self {
        match resource {
            Resource::Room(_) => ConflictKind::Room,
            Resource::Faculty(_) => ConflictKind::Faculty,
            Resource::Section(_) => ConflictKind::Section,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One broken rule between two requirements, or on one requirement alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictEdge {
    pub kind: ConflictKind,
    pub source: RequirementId,
    pub target: Option<RequirementId>,
    /// First slot where the clash happens, when it is tied to one.
    pub timeslot: Option<TimeslotId>,
}

impl ConflictEdge {
    pub fn is_unary(&self) -> bool {
        self.target.is_none()
    }

    pub fn touches(&self, requirement: RequirementId) -> bool {
        self.source == requirement || self.target == Some(requirement)
    }
}

/// Conflicts a proposed change would introduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictGraph {
    change: ProposedChange,
    pinned: Option<Assignment>,
    roots: Vec<RequirementId>,
    edges: Vec<ConflictEdge>,
}

impl ConflictGraph {
    pub fn change(&self) -> &ProposedChange {
        &self.change
    }

    /// For a move, the session at its requested placement.
    pub fn pinned(&self) -> Option<&Assignment> {
        self.pinned.as_ref()
    }

    /// Requirements the change touches directly.
    pub fn roots(&self) -> &[RequirementId] {
        &self.roots
    }

    pub fn edges(&self) -> &[ConflictEdge] {
        &self.edges
    }

    /// Returns true if the change breaks no hard rule.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every requirement named by an edge.
    pub fn nodes(&self) -> BTreeSet<RequirementId> {
        self.edges
            .iter()
            .flat_map(|e| std::iter::once(e.source).chain(e.target))
            .collect()
    }

    pub fn edges_of(&self, requirement: RequirementId) -> impl Iterator<Item = &ConflictEdge> {
        self.edges.iter().filter(move |e| e.touches(requirement))
    }

    /// Kinds of conflict a requirement takes part in.
    pub fn kinds_of(&self, requirement: RequirementId) -> BTreeSet<ConflictKind> {
        self.edges_of(requirement).map(|e| e.kind).collect()
    }

    pub fn neighbours(&self, requirement: RequirementId) -> BTreeSet<RequirementId> {
        self.edges_of(requirement)
            .flat_map(|e| std::iter::once(e.source).chain(e.target))
            .filter(|r| *r != requirement)
            .collect()
    }

    /// Transitive closure of conflict edges from `start`.
    pub fn component_from(&self, start: &[RequirementId]) -> BTreeSet<RequirementId> {
        let mut seen: BTreeSet<RequirementId> = BTreeSet::new();
        let mut queue: VecDeque<RequirementId> = start.iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            queue.extend(self.neighbours(next).into_iter().filter(|r| !seen.contains(r)));
        }
        seen
    }
}

/// Finds the conflicts a proposed change would introduce.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    snapshot: Arc<EntitySnapshot>,
}

impl ConflictDetector {
    pub fn new(snapshot: Arc<EntitySnapshot>) -> Self {
        Self { snapshot }
    }

    /// Checks the change against every assignment sharing its room, faculty
    /// member, or section.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::UnknownAssignment`] when a move names a
    /// requirement that is not in `set`, [`TimeweaveError::UnknownEntity`]
    /// for a room or faculty member missing from the snapshot, and
    /// [`TimeweaveError::InvalidChange`] when the change cannot be laid on
    /// the calendar.
    pub fn detect(&self, set: &AssignmentSet, change: &ProposedChange) -> Result<ConflictGraph> {
        let graph = match change {
            ProposedChange::MoveAssignment {
                requirement,
                room,
                timeslot,
                faculty,
            } => self.detect_move(set, change, *requirement, *room, *timeslot, *faculty)?,
            ProposedChange::RemoveRoom { room } => self.detect_room_removal(set, change, *room)?,
            ProposedChange::RemoveFacultyAvailability {
                faculty,
                day,
                window,
            } => self.detect_blocked_window(set, change, *faculty, *day, *window)?,
        };
        debug!(
            change = %change,
            edges = graph.edges.len(),
            roots = graph.roots.len(),
            "Conflicts detected"
        );
        Ok(graph)
    }

    fn detect_move(
        &self,
        set: &AssignmentSet,
        change: &ProposedChange,
        requirement: RequirementId,
        room_id: RoomId,
        timeslot: TimeslotId,
        faculty: FacultyId,
    ) -> Result<ConflictGraph> {
        let snapshot = &*self.snapshot;
        let original = set
            .get(requirement)
            .ok_or(TimeweaveError::UnknownAssignment(requirement))?;
        let room = snapshot
            .room(room_id)
            .ok_or_else(|| TimeweaveError::UnknownEntity(room_id.to_string()))?;
        if snapshot.faculty(faculty).is_none() {
            return Err(TimeweaveError::UnknownEntity(faculty.to_string()));
        }

        let calendar = snapshot.calendar();
        let periods = u8::try_from(original.timeslots.len()).unwrap_or(u8::MAX);
        let span = calendar.span(timeslot, periods).ok_or_else(|| {
            TimeweaveError::InvalidChange(format!(
                "{} periods from {} do not fit on one day",
                periods, timeslot
            ))
        })?;
        let (day, window) = calendar.span_window(&span).ok_or_else(|| {
            TimeweaveError::InvalidChange(format!("{} is not on the calendar", timeslot))
        })?;

        let moved = Assignment {
            room: room.id,
            faculty,
            timeslots: span,
            ..original.clone()
        };

        let mut edges = Vec::new();
        let unary = |kind| ConflictEdge {
            kind,
            source: requirement,
            target: None,
            timeslot: Some(timeslot),
        };
        if snapshot
            .section(moved.section)
            .is_some_and(|s| s.student_count > room.capacity)
        {
            edges.push(unary(ConflictKind::Capacity));
        }
        let required_type = snapshot
            .requirement(requirement)
            .map(|r| r.room_type)
            .or_else(|| snapshot.course(moved.course).map(|c| c.room_type));
        let section_type = snapshot.section(moved.section).map(|s| s.required_room_type);
        if required_type.is_some_and(|t| t != room.room_type)
            || section_type.is_some_and(|t| t != room.room_type)
        {
            edges.push(unary(ConflictKind::TypeMismatch));
        }
        if !snapshot
            .shift_of(moved.section)
            .is_some_and(|shift| shift.admits_window(day, &window))
        {
            edges.push(unary(ConflictKind::ShiftWindow));
        }
        if !snapshot.faculty_available(faculty, day, &window) {
            edges.push(unary(ConflictKind::Faculty));
        }

        let index = OccupancyIndex::from_assignments(set.iter().filter(|a| a.requirement != requirement));
        let mut seen = BTreeSet::new();
        for (resource, slot, holder) in index.clashes(
            moved.section,
            moved.faculty,
            moved.room,
            &moved.timeslots,
            requirement,
        ) {
            let kind = ConflictKind::of(resource);
            if seen.insert((kind, holder)) {
                edges.push(ConflictEdge {
                    kind,
                    source: requirement,
                    target: Some(holder),
                    timeslot: Some(slot),
                });
            }
        }
        edges.sort();

        Ok(ConflictGraph {
            change: change.clone(),
            pinned: Some(moved),
            roots: vec![requirement],
            edges,
        })
    }

    fn detect_room_removal(
        &self,
        set: &AssignmentSet,
        change: &ProposedChange,
        room: RoomId,
    ) -> Result<ConflictGraph> {
        if self.snapshot.room(room).is_none() {
            return Err(TimeweaveError::UnknownEntity(room.to_string()));
        }
        let edges: Vec<ConflictEdge> = set
            .iter()
            .filter(|a| a.room == room)
            .map(|a| ConflictEdge {
                kind: ConflictKind::Room,
                source: a.requirement,
                target: None,
                timeslot: a.timeslots.first().copied(),
            })
            .collect();
        Ok(ConflictGraph {
            change: change.clone(),
            pinned: None,
            roots: edges.iter().map(|e| e.source).collect(),
            edges,
        })
    }

    fn detect_blocked_window(
        &self,
        set: &AssignmentSet,
        change: &ProposedChange,
        faculty: FacultyId,
        day: u8,
        window: TimeWindow,
    ) -> Result<ConflictGraph> {
        if self.snapshot.faculty(faculty).is_none() {
            return Err(TimeweaveError::UnknownEntity(faculty.to_string()));
        }
        if window.is_empty() {
            return Err(TimeweaveError::InvalidChange(format!(
                "window {} is empty",
                window
            )));
        }
        let block = FacultyUnavailability::new(faculty, day, window);
        let calendar = self.snapshot.calendar();
        let edges: Vec<ConflictEdge> = set
            .iter()
            .filter(|a| a.faculty == faculty)
            .filter(|a| {
                calendar
                    .span_window(&a.timeslots)
                    .is_some_and(|(d, w)| block.blocks(d, &w))
            })
            .map(|a| ConflictEdge {
                kind: ConflictKind::Faculty,
                source: a.requirement,
                target: None,
                timeslot: a.timeslots.first().copied(),
            })
            .collect();
        Ok(ConflictGraph {
            change: change.clone(),
            pinned: None,
            roots: edges.iter().map(|e| e.source).collect(),
            edges,
        })
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
