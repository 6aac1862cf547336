//! Occupancy index: who holds each room, faculty member, and section at
//! each timeslot.
//!
//! The index is updated incrementally as the search places and withdraws
//! sessions; [`Occupancy`] records exactly the cells one placement touched
//! so that withdrawing it is the inverse operation.

use std::collections::HashMap;

use smallvec::SmallVec;
use timeweave_core::{Assignment, FacultyId, RequirementId, RoomId, SectionId, TimeslotId};

/// A schedulable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Room(RoomId),
    Faculty(FacultyId),
    Section(SectionId),
}

type Cell = (Resource, TimeslotId);

/// Cells claimed by one placement.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    requirement: RequirementId,
    cells: SmallVec<[Cell; 12]>,
}

impl Occupancy {
    pub fn requirement(&self) -> RequirementId {
        self.requirement
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Resource-by-timeslot occupancy.
#[derive(Debug, Clone, Default)]
pub struct OccupancyIndex {
    cells: HashMap<Cell, SmallVec<[RequirementId; 2]>>,
}

impl OccupancyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every assignment.
    pub fn from_assignments<'a>(assignments: impl IntoIterator<Item = &'a Assignment>) -> Self {
        let mut index = Self::new();
        for assignment in assignments {
            index.insert(assignment);
        }
        index
    }

    pub fn insert(&mut self, assignment: &Assignment) -> Occupancy {
        self.occupy(
            assignment.requirement,
            assignment.section,
            assignment.faculty,
            assignment.room,
            &assignment.timeslots,
        )
    }

    /// Claims the room, faculty, and section cells for every slot.
    pub fn occupy(
        &mut self,
        requirement: RequirementId,
        section: SectionId,
        faculty: FacultyId,
        room: RoomId,
        slots: &[TimeslotId],
    ) -> Occupancy {
        let mut occupancy = Occupancy {
            requirement,
            cells: SmallVec::new(),
        };
        for &slot in slots {
            for resource in [
                Resource::Room(room),
                Resource::Faculty(faculty),
                Resource::Section(section),
            ] {
                let holders = self.cells.entry((resource, slot)).or_default();
                if !holders.contains(&requirement) {
                    holders.push(requirement);
                    occupancy.cells.push((resource, slot));
                }
            }
        }
        occupancy
    }

    /// Withdraws a placement made by [`OccupancyIndex::occupy`].
    pub fn release(&mut self, occupancy: &Occupancy) {
        for cell in &occupancy.cells {
            if let Some(holders) = self.cells.get_mut(cell) {
                holders.retain(|r| *r != occupancy.requirement);
                if holders.is_empty() {
                    self.cells.remove(cell);
                }
            }
        }
    }

    pub fn holders(&self, resource: Resource, slot: TimeslotId) -> &[RequirementId] {
        self.cells
            .get(&(resource, slot))
            .map_or(&[][..], |holders| holders.as_slice())
    }

    pub fn is_free(&self, resource: Resource, slot: TimeslotId) -> bool {
        self.holders(resource, slot).is_empty()
    }

    /// Returns true if room, faculty, and section are all free in every slot.
    pub fn fits(
        &self,
        section: SectionId,
        faculty: FacultyId,
        room: RoomId,
        slots: &[TimeslotId],
    ) -> bool {
        slots.iter().all(|&slot| {
            self.is_free(Resource::Room(room), slot)
                && self.is_free(Resource::Faculty(faculty), slot)
                && self.is_free(Resource::Section(section), slot)
        })
    }

    /// Every holder that would clash with the placement, with the resource
    /// and slot of the clash, in a stable order. `ignore` is skipped.
    pub fn clashes(
        &self,
        section: SectionId,
        faculty: FacultyId,
        room: RoomId,
        slots: &[TimeslotId],
        ignore: RequirementId,
    ) -> Vec<(Resource, TimeslotId, RequirementId)> {
        let mut clashes = Vec::new();
        for &slot in slots {
            for resource in [
                Resource::Room(room),
                Resource::Faculty(faculty),
                Resource::Section(section),
            ] {
                for &holder in self.holders(resource, slot) {
                    if holder != ignore {
                        clashes.push((resource, slot, holder));
                    }
                }
            }
        }
        clashes.sort();
        clashes.dedup();
        clashes
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeweave_core::CourseId;

    fn assignment(requirement: u32, section: u32, faculty: u32, room: u32, slots: &[u32]) -> Assignment {
        Assignment {
            requirement: RequirementId(requirement),
            section: SectionId(section),
            course: CourseId(1),
            faculty: FacultyId(faculty),
            room: RoomId(room),
            timeslots: slots.iter().map(|s| TimeslotId(*s)).collect(),
        }
    }

    #[test]
    fn test_occupy_and_release_are_inverse() {
        let mut index = OccupancyIndex::new();
        let first = index.insert(&assignment(0, 1, 1, 1, &[0, 1]));
        assert_eq!(first.len(), 6);
        assert!(!index.fits(SectionId(2), FacultyId(2), RoomId(1), &[TimeslotId(1)]));
        assert!(index.fits(SectionId(2), FacultyId(2), RoomId(1), &[TimeslotId(2)]));

        index.release(&first);
        assert!(index.is_empty());
    }

    #[test]
    fn test_clashes_name_every_holder() {
        let a = assignment(0, 1, 1, 1, &[3]);
        let b = assignment(1, 2, 2, 2, &[3]);
        let index = OccupancyIndex::from_assignments([&a, &b]);

        let clashes = index.clashes(SectionId(2), FacultyId(1), RoomId(9), &[TimeslotId(3)], RequirementId(7));
        let holders: Vec<RequirementId> = clashes.iter().map(|c| c.2).collect();
        assert_eq!(holders, vec![RequirementId(0), RequirementId(1)]);
        assert!(matches!(clashes[0].0, Resource::Faculty(_)));
    }

    #[test]
    fn test_release_keeps_other_holders() {
        let mut index = OccupancyIndex::new();
        let a = index.insert(&assignment(0, 1, 1, 1, &[0]));
        index.insert(&assignment(1, 2, 2, 1, &[0]));
        assert_eq!(index.holders(Resource::Room(RoomId(1)), TimeslotId(0)).len(), 2);

        index.release(&a);
        assert_eq!(
            index.holders(Resource::Room(RoomId(1)), TimeslotId(0)),
            &[RequirementId(1)]
        );
    }
}
