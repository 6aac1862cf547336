//! Solver engine for timeweave.
//!
//! This crate provides:
//! - The constraint model compiler ([`compile`], [`ModelCompiler`])
//! - Exact branch-and-bound and fail-first backtracking strategies behind
//!   one [`SolveStrategy`] contract, orchestrated by [`SolverEngine`]
//! - Schedule scoring with per-rule explanation ([`ScheduleScorer`])
//! - Conflict detection for proposed changes ([`ConflictDetector`])
//! - Incremental repair bounded by a change budget ([`RepairEngine`])
//! - Background jobs with cooperative cancellation ([`ScheduleManager`])

pub mod compiler;
pub mod conflict;
pub mod engine;
pub mod index;
pub mod manager;
pub mod model;
pub mod repair;
pub mod scoring;
mod search;
pub mod statistics;
pub mod strategy;
pub mod termination;

pub use compiler::{compile, ModelCompiler};
pub use conflict::{ConflictDetector, ConflictEdge, ConflictGraph, ConflictKind, ProposedChange};
pub use engine::SolverEngine;
pub use index::{OccupancyIndex, Resource};
pub use manager::{JobEvent, JobId, JobResult, JobStatus, ScheduleManager};
pub use model::{DomainValue, Model, Span, Variable};
pub use repair::{CandidateRepair, RepairEngine, RepairOutcome, RepairRequest, RepairState};
pub use scoring::{ConstraintMatchTotal, ScheduleScorer, ScoreExplanation};
pub use statistics::{ScoreImprovement, SearchStatistics};
pub use strategy::{
    BacktrackingStrategy, ExactStrategy, InfeasibleReason, PartialProgress, SearchSettings,
    Solution, SolveOutcome, SolveStrategy, TieBreak,
};
pub use termination::{
    Deadline, ExternalTermination, NodeCountTermination, OrTermination, Termination,
};
