use std::sync::Arc;

use timeweave_config::ExactConfig;
use timeweave_core::{
    AssignmentSet, CalendarConfig, ClockTime, MeetingRequirement, RequirementId, RoomType,
    TimeWindow, TimeslotId,
};
use timeweave_test::{campus, SnapshotBuilder};

use super::*;
use crate::compiler::compile;
use crate::termination::Deadline;

fn assert_no_clashes(set: &AssignmentSet) {
    let all = set.assignments();
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            if a.overlaps(b) {
                assert_ne!(a.room, b.room, "{:?} / {:?}", a, b);
                assert_ne!(a.faculty, b.faculty, "{:?} / {:?}", a, b);
                assert_ne!(a.section, b.section, "{:?} / {:?}", a, b);
            }
        }
    }
}

fn quick() -> SearchSettings {
    SearchSettings::default().first_feasible()
}

#[test]
fn test_backtracking_solves_small_campus() {
    let model = compile(Arc::new(campus::small_campus())).unwrap();
    let strategy = BacktrackingStrategy::new(quick());
    assert_eq!(strategy.name(), "backtracking");
    assert!(strategy.is_available(&model));

    let outcome = strategy.solve(&model, &Deadline::none());
    let solution = outcome.solution().unwrap();
    assert_eq!(solution.assignments.len(), 14);
    assert!(solution.score().is_feasible());
    assert_no_clashes(&solution.assignments);
}

#[test]
fn test_backtracking_is_deterministic() {
    let model = compile(Arc::new(campus::small_campus())).unwrap();
    let strategy = BacktrackingStrategy::new(SearchSettings::default());

    let first = strategy.solve(&model, &Deadline::none()).into_solution().unwrap();
    let second = strategy.solve(&model, &Deadline::none()).into_solution().unwrap();
    assert_eq!(first.assignments, second.assignments);
}

#[test]
fn test_perturbed_tie_break_is_seeded() {
    let model = compile(Arc::new(campus::small_campus())).unwrap();
    let seeded = |seed| {
        BacktrackingStrategy::new(quick())
            .with_tie_break(TieBreak::Perturbed(seed))
            .solve(&model, &Deadline::none())
            .into_solution()
            .unwrap()
    };

    let a = seeded(7);
    let b = seeded(7);
    assert_eq!(a.assignments, b.assignments);
    assert_no_clashes(&a.assignments);

    let canonical = BacktrackingStrategy::new(quick());
    assert_eq!(canonical.tie_break(), TieBreak::Canonical);
    assert_no_clashes(&seeded(8).assignments);
}

#[test]
fn test_scored_medium_violations_are_tried_last() {
    let recess = TimeWindow::new(ClockTime::from_hm(10, 0), ClockTime::from_hm(10, 15));
    let snapshot = SnapshotBuilder::new()
        .with_calendar(CalendarConfig::default().with_recess(recess))
        .faculty(1, "Ada")
        .lecture(10, "CS101", 1)
        .room(1, "AB_101", RoomType::Lecture, 60)
        .section(1, "CSE_2A", 40, "SHIFT_8_4", &[10])
        .teaches(1, 10)
        .requirement(
            MeetingRequirement::new(0, 1, 10, RoomType::Lecture)
                .with_allowed_timeslots([TimeslotId(2), TimeslotId(3)]),
        )
        .build();
    let model = compile(Arc::new(snapshot)).unwrap();

    let solution = BacktrackingStrategy::new(quick())
        .solve(&model, &Deadline::none())
        .into_solution()
        .unwrap();
    let placed = solution.assignments.get(RequirementId(0)).unwrap();
    assert_eq!(placed.timeslot(), TimeslotId(3));
    assert_eq!(solution.score().medium(), 0);
}

#[test]
fn test_exact_proves_single_lecture_optimal() {
    let model = compile(Arc::new(campus::single_lecture())).unwrap();
    let strategy = ExactStrategy::new(SearchSettings::default(), &ExactConfig::default());
    assert_eq!(strategy.name(), "exact");

    let solution = strategy
        .solve(&model, &Deadline::none())
        .into_solution()
        .unwrap();
    assert!(solution.optimal);
    assert_eq!(solution.assignments.len(), 1);
}

#[test]
fn test_exact_solves_small_campus() {
    let model = compile(Arc::new(campus::small_campus())).unwrap();
    let strategy = ExactStrategy::new(quick(), &ExactConfig::default());

    let solution = strategy
        .solve(&model, &Deadline::none())
        .into_solution()
        .unwrap();
    assert_eq!(solution.assignments.len(), 14);
    assert_no_clashes(&solution.assignments);
}

#[test]
fn test_exact_reports_lab_contention_as_infeasible() {
    let model = compile(Arc::new(campus::lab_contention())).unwrap();
    let outcome = ExactStrategy::new(quick(), &ExactConfig::default()).solve(&model, &Deadline::none());

    match outcome {
        SolveOutcome::Infeasible(reason) => {
            assert_eq!(reason.requirements, vec![RequirementId(0), RequirementId(1)]);
        }
        other => panic!("expected INFEASIBLE, got {}", other.status()),
    }
}

#[test]
fn test_exact_unavailable_above_size_limit() {
    let model = compile(Arc::new(campus::small_campus())).unwrap();
    let small = ExactConfig {
        max_requirements: 10,
        ..ExactConfig::default()
    };
    assert!(!ExactStrategy::new(quick(), &small).is_available(&model));
    assert!(ExactStrategy::new(quick(), &ExactConfig::default()).is_available(&model));
}

#[test]
fn test_outcome_serializes_with_status_tag() {
    let model = compile(Arc::new(campus::single_lecture())).unwrap();
    let outcome = BacktrackingStrategy::new(quick()).solve(&model, &Deadline::none());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "FEASIBLE");
    assert_eq!(json["optimal"], false);
    assert_eq!(outcome.status(), "FEASIBLE");
    assert!(outcome.is_feasible());
}
