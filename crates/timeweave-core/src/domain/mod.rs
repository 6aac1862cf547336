//! Domain model: the read-only entity view and the solver's output types.

mod assignment;
mod calendar;
mod entity;
mod ids;
mod requirement;
mod snapshot;
mod store;

pub use assignment::{Assignment, AssignmentSet};
pub use calendar::{Calendar, CalendarConfig, ClockTime, ParseTimeError, Shift, TimeWindow, Timeslot};
pub use entity::{
    Course, Faculty, FacultyCourseMapping, FacultyUnavailability, Room, RoomType, Section,
};
pub use ids::{CourseId, FacultyId, RequirementId, RoomId, SectionId, TimeslotId};
pub use requirement::{derive_requirements, MeetingRequirement};
pub use snapshot::EntitySnapshot;
pub use store::{EntityStore, SharedEntityStore};

#[cfg(test)]
mod tests;
