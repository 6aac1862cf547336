//! timeweave Core - Core types for course timetabling
//!
//! This crate provides the fundamental abstractions for timeweave:
//! - Entity records (faculty, courses, rooms, sections) supplied by ingestion
//! - Calendar derivation from shift configuration (working days, period grid, lunch)
//! - Meeting requirements, assignments, and immutable assignment sets
//! - The three-level schedule score and the constraint catalogue
//! - The error taxonomy shared by the compiler, solver, and repair engine

pub mod constraint;
pub mod domain;
pub mod error;
pub mod score;

pub use constraint::{ConstraintKind, ConstraintMode};
pub use domain::{
    derive_requirements, Assignment, AssignmentSet, Calendar, CalendarConfig, ClockTime, Course,
    CourseId, EntitySnapshot, EntityStore, Faculty, FacultyCourseMapping, FacultyId,
    FacultyUnavailability, MeetingRequirement, RequirementId, Room, RoomId, RoomType, Section,
    SectionId, SharedEntityStore, Shift, TimeWindow, Timeslot, TimeslotId,
};
pub use error::{CompileError, CompileErrorKind, CompileErrors, Result, TimeweaveError};
pub use score::{ScheduleScore, ScoreLevel, ScoreParseError};
