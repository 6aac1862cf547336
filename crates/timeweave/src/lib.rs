//! timeweave - Course Timetabling in Rust
//!
//! Assigns teaching sessions to rooms, timeslots, and faculty without
//! double-booking anyone, then repairs an existing schedule after a local
//! change by re-solving only the sessions the change reaches.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use timeweave::prelude::*;
//! use timeweave_test::campus;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default());
//! let snapshot = Arc::new(campus::three_sections());
//!
//! let outcome = scheduler.generate(snapshot.clone(), Deadline::none()).unwrap();
//! let schedule = outcome.into_solution().unwrap().assignments;
//!
//! let graph = scheduler
//!     .propose_change(snapshot.clone(), &schedule, &ProposedChange::remove_room(1))
//!     .unwrap();
//! let repaired = scheduler.repair(snapshot, &schedule, &graph, 3).unwrap();
//! assert!(repaired.is_resolved());
//! ```

// Entities, scores and errors
pub use timeweave_core::{
    derive_requirements, Assignment, AssignmentSet, Calendar, CalendarConfig, ClockTime,
    CompileError, CompileErrorKind, CompileErrors, ConstraintKind, ConstraintMode, Course,
    CourseId, EntitySnapshot, EntityStore, Faculty, FacultyCourseMapping, FacultyId,
    FacultyUnavailability, MeetingRequirement, RequirementId, Result, Room, RoomId, RoomType,
    ScheduleScore, ScoreLevel, Section, SectionId, SharedEntityStore, Shift, TimeWindow,
    Timeslot, TimeslotId, TimeweaveError,
};

pub use timeweave_config::{
    ConfigError, ExactConfig, OptimizationConfig, PolicyConfig, RepairConfig, SchedulerConfig,
    StrategyType, TerminationConfig, WeightsConfig,
};

pub use timeweave_solver::{
    CandidateRepair, ConflictEdge, ConflictGraph, ConflictKind, Deadline, InfeasibleReason,
    JobEvent, JobId, JobResult, JobStatus, PartialProgress, ProposedChange, RepairOutcome,
    RepairRequest, RepairState, ScheduleManager, ScoreExplanation, SearchStatistics, Solution,
    SolveOutcome,
};

mod scheduler;
pub use scheduler::Scheduler;

/// Lower-level building blocks: the compiler, strategies and engines.
pub mod solver {
    pub use timeweave_solver::*;
}

pub mod prelude {
    pub use super::{
        AssignmentSet, ConflictGraph, Deadline, EntitySnapshot, ProposedChange, RepairOutcome,
        RepairState, ScheduleScore, Scheduler, SchedulerConfig, SolveOutcome,
    };
}
