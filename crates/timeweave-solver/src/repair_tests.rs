use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use timeweave_config::{OptimizationConfig, SchedulerConfig};
use timeweave_core::{AssignmentSet, EntitySnapshot, RequirementId, RoomId, ScheduleScore, TimeslotId};
use timeweave_test::campus;

use super::*;
use crate::conflict::{ConflictDetector, ProposedChange};

fn config() -> SchedulerConfig {
    SchedulerConfig {
        optimization: OptimizationConfig {
            time_budget_millis: None,
            node_limit: 200,
            ..OptimizationConfig::default()
        },
        ..SchedulerConfig::default()
    }
}

fn detect(snapshot: &Arc<EntitySnapshot>, set: &AssignmentSet, change: ProposedChange) -> ConflictGraph {
    ConflictDetector::new(snapshot.clone())
        .detect(set, &change)
        .unwrap()
}

#[test]
fn test_removed_room_moves_only_its_session() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 1)
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.blast_radius, vec![RequirementId(1)]);
    assert_eq!(
        outcome.trace,
        vec![
            RepairState::Requested,
            RepairState::BlastRadiusComputed,
            RepairState::SubsolveRunning,
            RepairState::Resolved,
        ]
    );

    let best = outcome.best().unwrap();
    assert_eq!(best.moved, vec![RequirementId(1)]);
    assert!(best.score().is_feasible());
    let moved = best.assignments.get(RequirementId(1)).unwrap();
    assert_eq!(moved.room, RoomId(3));
    assert_ne!(moved.timeslot(), TimeslotId(0));
    assert_eq!(best.assignments.get(RequirementId(0)), set.get(RequirementId(0)));
    assert_eq!(best.assignments.get(RequirementId(2)), set.get(RequirementId(2)));
    assert_eq!(best.faculty_changes, 0);
    assert!(outcome.candidates.len() <= config().repair.max_candidates);
}

#[test]
fn test_repair_never_mutates_the_input() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let before = set.clone();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));

    RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 1)
        .unwrap();
    assert_eq!(set, before);
}

#[test]
fn test_budget_exceeded_when_a_contender_must_move() {
    let snapshot = Arc::new(campus::three_sections_single_slot());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 1)
        .unwrap();
    assert_eq!(outcome.state, RepairState::BudgetExceeded);
    assert!(outcome.candidates.is_empty());
    assert!(outcome.detail.unwrap().contains("1 more"));
}

#[test]
fn test_infeasible_once_nothing_is_left_to_free() {
    let snapshot = Arc::new(campus::three_sections_single_slot());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 2)
        .unwrap();
    assert_eq!(outcome.state, RepairState::Infeasible);
    assert_eq!(outcome.blast_radius, vec![RequirementId(0), RequirementId(1)]);
    assert!(!outcome.unsatisfied.is_empty());
    assert_eq!(
        outcome.trace,
        vec![
            RepairState::Requested,
            RepairState::BlastRadiusComputed,
            RepairState::SubsolveRunning,
            RepairState::BlastRadiusComputed,
            RepairState::SubsolveRunning,
            RepairState::Infeasible,
        ]
    );
}

#[test]
fn test_move_displaces_the_clashing_session() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(2, 3, 0, 3));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 2)
        .unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.blast_radius, vec![RequirementId(0), RequirementId(2)]);
    let best = outcome.best().unwrap();
    // The requested move counts as moved.
    assert_eq!(best.moved, vec![RequirementId(0), RequirementId(2)]);

    let pinned = best.assignments.get(RequirementId(2)).unwrap();
    assert_eq!(pinned.room, RoomId(3));
    assert_eq!(pinned.timeslot(), TimeslotId(0));
    let displaced = best.assignments.get(RequirementId(0)).unwrap();
    assert_eq!(displaced.room, RoomId(3));
    assert_ne!(displaced.timeslot(), TimeslotId(0));
}

#[test]
fn test_locked_contender_blocks_the_repair() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(2, 3, 0, 3));

    let request = RepairRequest::new(set, graph, 3).with_locked([RequirementId(0)]);
    let outcome = RepairEngine::new(snapshot, &config()).run(&request).unwrap();
    assert_eq!(outcome.state, RepairState::Infeasible);
    assert_eq!(outcome.unsatisfied, vec![RequirementId(0)]);
    assert!(outcome.detail.unwrap().contains("locked"));
}

#[test]
fn test_move_that_breaks_a_unary_rule_is_infeasible() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(0, 1, 1, 1));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 3)
        .unwrap();
    assert_eq!(outcome.state, RepairState::Infeasible);
    assert_eq!(outcome.unsatisfied, vec![RequirementId(0)]);
    assert!(outcome.detail.unwrap().contains("CAPACITY"));
}

#[test]
fn test_clean_move_resolves_without_moving_others() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(1, 2, 1, 2));
    assert!(graph.is_empty());
    let engine = RepairEngine::new(snapshot, &config());

    let outcome = engine.repair(&set, &graph, 1).unwrap();
    assert!(outcome.is_resolved());
    assert_eq!(outcome.blast_radius, vec![RequirementId(1)]);
    assert!(!outcome.trace.contains(&RepairState::SubsolveRunning));
    let best = outcome.best().unwrap();
    assert_eq!(best.moved, vec![RequirementId(1)]);
    assert_eq!(best.assignments.get(RequirementId(0)), set.get(RequirementId(0)));
    assert_eq!(best.assignments.get(RequirementId(2)), set.get(RequirementId(2)));
    assert_eq!(
        best.assignments.get(RequirementId(1)).unwrap().timeslot(),
        TimeslotId(1)
    );

    // Even a clean move needs room in the budget for itself.
    let outcome = engine.repair(&set, &graph, 0).unwrap();
    assert_eq!(outcome.state, RepairState::BudgetExceeded);
}

#[test]
fn test_move_repair_stays_inside_the_blast_radius() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    // Section 3 into room 2 at Monday 08:00, where section 2 already sits.
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(2, 2, 0, 3));
    let engine = RepairEngine::new(snapshot, &config());

    let outcome = engine.repair(&set, &graph, 2).unwrap();
    assert!(outcome.is_resolved(), "{:?}", outcome.detail);
    assert_eq!(outcome.blast_radius, vec![RequirementId(1), RequirementId(2)]);
    for candidate in &outcome.candidates {
        let differing = set.differing(&candidate.assignments);
        assert!(differing.len() <= outcome.blast_radius.len());
        assert!(differing.iter().all(|r| outcome.blast_radius.contains(r)));
        assert_eq!(differing, candidate.moved);
        assert_eq!(candidate.assignments.get(RequirementId(0)), set.get(RequirementId(0)));
        let pinned = candidate.assignments.get(RequirementId(2)).unwrap();
        assert_eq!((pinned.room, pinned.timeslot()), (RoomId(2), TimeslotId(0)));
    }

    // Moving section 3 already spends the only unit of budget.
    let outcome = engine.repair(&set, &graph, 1).unwrap();
    assert_eq!(outcome.state, RepairState::BudgetExceeded);
    assert!(outcome.candidates.is_empty());
}

#[test]
fn test_radius_over_budget_is_rejected_up_front() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::move_assignment(2, 3, 0, 3));

    let outcome = RepairEngine::new(snapshot, &config())
        .repair(&set, &graph, 1)
        .unwrap();
    assert_eq!(outcome.state, RepairState::BudgetExceeded);
    assert_eq!(outcome.blast_radius, vec![RequirementId(0), RequirementId(2)]);
    assert!(!outcome.trace.contains(&RepairState::SubsolveRunning));
}

#[test]
fn test_unknown_root_is_an_error() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));
    let without: Vec<_> = set
        .iter()
        .filter(|a| a.requirement != RequirementId(1))
        .cloned()
        .collect();
    let partial = AssignmentSet::new(without, ScheduleScore::ZERO);

    let result = RepairEngine::new(snapshot, &config()).repair(&partial, &graph, 1);
    assert!(matches!(
        result,
        Err(TimeweaveError::UnknownAssignment(RequirementId(1)))
    ));
}

#[test]
fn test_cancelled_repair_times_out() {
    let snapshot = Arc::new(campus::three_sections());
    let set = campus::three_section_schedule();
    let graph = detect(&snapshot, &set, ProposedChange::remove_room(2));

    let request = RepairRequest::new(set, graph, 1).with_cancel(Arc::new(AtomicBool::new(true)));
    let outcome = RepairEngine::new(snapshot, &config()).run(&request).unwrap();
    assert_eq!(outcome.state, RepairState::TimedOut);
    assert!(outcome.state.is_terminal());
    assert_eq!(outcome.state.as_str(), "TIMED_OUT");
}
