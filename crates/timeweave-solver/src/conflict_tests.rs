use std::collections::BTreeSet;
use std::sync::Arc;

use timeweave_core::{
    Assignment, AssignmentSet, CourseId, FacultyId, RequirementId, RoomId, RoomType,
    ScheduleScore, SectionId, TimeWindow, TimeslotId, TimeweaveError,
};
use timeweave_test::{campus, SnapshotBuilder};

use super::*;

fn detector() -> ConflictDetector {
    ConflictDetector::new(Arc::new(campus::three_sections()))
}

/// One section meeting twice, Monday 08:00 in room 1 and 09:00 in room 2,
/// with a lab room left empty.
fn twice_weekly() -> (ConflictDetector, AssignmentSet) {
    let snapshot = SnapshotBuilder::new()
        .faculty(1, "Ada")
        .faculty(2, "Grace")
        .lecture(10, "CS101", 2)
        .room(1, "AB_101", RoomType::Lecture, 60)
        .room(2, "AB_102", RoomType::Lecture, 60)
        .room(3, "LAB_1", RoomType::Lab, 60)
        .section(1, "CSE_2A", 40, "SHIFT_8_4", &[10])
        .teaches(1, 10)
        .build();
    let session = |requirement: u32, room: u32, slot: u32| Assignment {
        requirement: RequirementId(requirement),
        section: SectionId(1),
        course: CourseId(10),
        faculty: FacultyId(1),
        room: RoomId(room),
        timeslots: vec![TimeslotId(slot)],
    };
    let set = AssignmentSet::new(vec![session(0, 1, 0), session(1, 2, 1)], ScheduleScore::ZERO);
    (ConflictDetector::new(Arc::new(snapshot)), set)
}

#[test]
fn test_move_onto_the_sections_other_meeting() {
    let (detector, set) = twice_weekly();
    // Room and faculty are free at 08:00; the section is not.
    let change = ProposedChange::move_assignment(1, 2, 0, 2);

    let graph = detector.detect(&set, &change).unwrap();
    assert_eq!(
        graph.edges(),
        &[ConflictEdge {
            kind: ConflictKind::Section,
            source: RequirementId(1),
            target: Some(RequirementId(0)),
            timeslot: Some(TimeslotId(0)),
        }]
    );
    assert_eq!(graph.neighbours(RequirementId(1)), BTreeSet::from([RequirementId(0)]));
}

#[test]
fn test_lecture_moved_into_a_lab_is_unary_type_mismatch() {
    let (detector, set) = twice_weekly();
    // Monday 13:00, after the lunch break.
    let change = ProposedChange::move_assignment(0, 3, 5, 1);

    let graph = detector.detect(&set, &change).unwrap();
    assert_eq!(graph.edges().len(), 1);
    let edge = graph.edges()[0];
    assert_eq!(edge.kind, ConflictKind::TypeMismatch);
    assert!(edge.is_unary());
    assert_eq!(edge.source, RequirementId(0));
    assert_eq!(graph.nodes(), BTreeSet::from([RequirementId(0)]));
}

#[test]
fn test_move_into_occupied_room() {
    let set = campus::three_section_schedule();
    let change = ProposedChange::move_assignment(2, 3, 0, 3);

    let graph = detector().detect(&set, &change).unwrap();
    assert_eq!(
        graph.edges(),
        &[ConflictEdge {
            kind: ConflictKind::Room,
            source: RequirementId(2),
            target: Some(RequirementId(0)),
            timeslot: Some(TimeslotId(0)),
        }]
    );
    assert_eq!(graph.roots(), &[RequirementId(2)]);
    assert_eq!(graph.pinned().unwrap().room, RoomId(3));
    assert_eq!(graph.kinds_of(RequirementId(0)), BTreeSet::from([ConflictKind::Room]));
    assert_eq!(
        graph.component_from(&[RequirementId(2)]),
        BTreeSet::from([RequirementId(0), RequirementId(2)])
    );
}

#[test]
fn test_move_into_small_room_is_unary_capacity() {
    let set = campus::three_section_schedule();
    let change = ProposedChange::move_assignment(0, 1, 1, 1);

    let graph = detector().detect(&set, &change).unwrap();
    assert_eq!(graph.edges().len(), 1);
    let edge = graph.edges()[0];
    assert_eq!(edge.kind, ConflictKind::Capacity);
    assert!(edge.is_unary());
    assert_eq!(graph.nodes(), BTreeSet::from([RequirementId(0)]));
}

#[test]
fn test_move_to_busy_faculty() {
    let set = campus::three_section_schedule();
    // Section 2 keeps its room but is handed to faculty 1, busy with section 1.
    let change = ProposedChange::move_assignment(1, 2, 0, 1);

    let graph = detector().detect(&set, &change).unwrap();
    assert_eq!(graph.kinds_of(RequirementId(1)), BTreeSet::from([ConflictKind::Faculty]));
    assert_eq!(graph.neighbours(RequirementId(1)), BTreeSet::from([RequirementId(0)]));
}

#[test]
fn test_move_into_lunch_breaks_shift() {
    let set = campus::three_section_schedule();
    // 12:00 on Monday is the 8-to-4 lunch hour.
    let change = ProposedChange::move_assignment(1, 2, 4, 2);

    let graph = detector().detect(&set, &change).unwrap();
    assert_eq!(graph.edges().len(), 1);
    assert_eq!(graph.edges()[0].kind, ConflictKind::ShiftWindow);
    assert_eq!(ConflictKind::ShiftWindow.code(), "SHIFT_WINDOW");
}

#[test]
fn test_move_to_free_placement_is_clean() {
    let set = campus::three_section_schedule();
    let change = ProposedChange::move_assignment(1, 2, 1, 2);

    let graph = detector().detect(&set, &change).unwrap();
    assert!(graph.is_empty());
    assert_eq!(graph.pinned().unwrap().timeslots, vec![TimeslotId(1)]);
}

#[test]
fn test_detection_leaves_the_set_alone() {
    let set = campus::three_section_schedule();
    let before = set.clone();
    detector()
        .detect(&set, &ProposedChange::move_assignment(2, 3, 0, 3))
        .unwrap();
    assert_eq!(set, before);
}

#[test]
fn test_room_removal_flags_its_sessions() {
    let set = campus::three_section_schedule();
    let graph = detector().detect(&set, &ProposedChange::remove_room(2)).unwrap();

    assert_eq!(graph.roots(), &[RequirementId(1)]);
    assert_eq!(graph.edges().len(), 1);
    assert!(graph.edges()[0].is_unary());
    assert_eq!(graph.edges()[0].kind, ConflictKind::Room);
    assert!(graph.pinned().is_none());
}

#[test]
fn test_blocked_faculty_window() {
    let set = campus::three_section_schedule();
    let detector = detector();

    let morning = ProposedChange::remove_faculty_availability(3, 0, TimeWindow::hours(8, 9));
    let graph = detector.detect(&set, &morning).unwrap();
    assert_eq!(graph.roots(), &[RequirementId(2)]);
    assert_eq!(graph.edges()[0].kind, ConflictKind::Faculty);

    let tuesday = ProposedChange::remove_faculty_availability(3, 1, TimeWindow::hours(8, 9));
    assert!(detector.detect(&set, &tuesday).unwrap().is_empty());
}

#[test]
fn test_rejects_unknown_references() {
    let set = campus::three_section_schedule();
    let detector = detector();

    assert!(matches!(
        detector.detect(&set, &ProposedChange::move_assignment(9, 1, 0, 1)),
        Err(TimeweaveError::UnknownAssignment(RequirementId(9)))
    ));
    assert!(matches!(
        detector.detect(&set, &ProposedChange::move_assignment(0, 42, 0, 1)),
        Err(TimeweaveError::UnknownEntity(_))
    ));
    assert!(matches!(
        detector.detect(&set, &ProposedChange::remove_room(42)),
        Err(TimeweaveError::UnknownEntity(_))
    ));
    assert!(matches!(
        detector.detect(&set, &ProposedChange::move_assignment(0, 3, 500, 1)),
        Err(TimeweaveError::InvalidChange(_))
    ));
}

#[test]
fn test_change_applies_to_snapshot() {
    let snapshot = campus::three_sections();

    let without = ProposedChange::remove_room(2).apply_to(&snapshot);
    assert!(without.room(RoomId(2)).is_none());
    assert!(snapshot.room(RoomId(2)).is_some());

    let blocked = ProposedChange::remove_faculty_availability(1, 0, TimeWindow::hours(8, 10))
        .apply_to(&snapshot);
    assert!(!blocked.faculty_available(1.into(), 0, &TimeWindow::hours(9, 10)));
    assert!(snapshot.faculty_available(1.into(), 0, &TimeWindow::hours(9, 10)));
}

#[test]
fn test_change_serializes_with_type_tag() {
    let change = ProposedChange::remove_room(2);
    let json = serde_json::to_value(&change).unwrap();
    assert_eq!(json["type"], "REMOVE_ROOM");
    let back: ProposedChange = serde_json::from_value(json).unwrap();
    assert_eq!(back, change);
}
