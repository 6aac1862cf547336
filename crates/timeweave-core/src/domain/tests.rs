use super::*;
use crate::score::ScheduleScore;

fn default_calendar() -> Calendar {
    Calendar::derive(&CalendarConfig::default()).unwrap()
}

fn assignment(req: u32, room: u32, slot: u32) -> Assignment {
    Assignment {
        requirement: RequirementId(req),
        section: SectionId(req),
        course: CourseId(1),
        faculty: FacultyId(1),
        room: RoomId(room),
        timeslots: vec![TimeslotId(slot)],
    }
}

#[test]
fn test_default_calendar_grid() {
    let calendar = default_calendar();
    // Monday to Friday, ten hourly periods from 08:00.
    assert_eq!(calendar.timeslots().len(), 50);

    let first = calendar.timeslot(TimeslotId(0)).unwrap();
    assert_eq!((first.day, first.period), (0, 0));
    assert_eq!(first.start, ClockTime::from_hm(8, 0));

    let last = calendar.timeslot(TimeslotId(49)).unwrap();
    assert_eq!(last.day, 4);
    assert_eq!(last.end, ClockTime::from_hm(18, 0));
}

#[test]
fn test_calendar_drops_partial_period() {
    let config = CalendarConfig::default()
        .with_working_days([0])
        .with_hours(ClockTime::from_hm(8, 0), ClockTime::from_hm(10, 30), 60);
    let calendar = Calendar::derive(&config).unwrap();
    assert_eq!(calendar.timeslots().len(), 2);
}

#[test]
fn test_calendar_rejects_bad_config() {
    let zero = CalendarConfig {
        period_minutes: 0,
        ..CalendarConfig::default()
    };
    assert!(Calendar::derive(&zero).is_err());

    let sunday_plus = CalendarConfig::default().with_working_days([7]);
    assert!(Calendar::derive(&sunday_plus).is_err());

    let shift = Shift::new("DUP", TimeWindow::hours(8, 12), TimeWindow::hours(10, 11));
    let duplicate = CalendarConfig::default().with_shifts(vec![shift.clone(), shift]);
    assert!(Calendar::derive(&duplicate).is_err());
}

#[test]
fn test_span_stays_within_one_day() {
    let calendar = default_calendar();
    assert_eq!(
        calendar.span(TimeslotId(3), 2),
        Some(vec![TimeslotId(3), TimeslotId(4)])
    );
    // Slot 9 is Monday 17:00; slot 10 is Tuesday 08:00.
    assert_eq!(calendar.span(TimeslotId(9), 2), None);
    assert_eq!(calendar.span(TimeslotId(0), 0), None);
}

#[test]
fn test_shift_excludes_lunch_and_outside_hours() {
    let calendar = default_calendar();
    let shift = calendar.shift("SHIFT_8_4").unwrap();

    let at = |id: u32| calendar.timeslot(TimeslotId(id)).unwrap();
    assert!(shift.admits(at(0))); // Mon 08:00
    assert!(!shift.admits(at(4))); // Mon 12:00 lunch
    assert!(shift.admits(at(7))); // Mon 15:00
    assert!(!shift.admits(at(8))); // Mon 16:00 after shift

    let late = calendar.shift("SHIFT_10_6").unwrap();
    assert!(!late.admits(at(0)));
    assert!(late.admits(at(4))); // 12:00 is fine for the late shift
    assert!(!late.admits(at(5))); // 13:00 lunch
}

#[test]
fn test_clock_time_parse() {
    assert_eq!("9:05".parse::<ClockTime>().unwrap(), ClockTime::from_hm(9, 5));
    assert!("25:00".parse::<ClockTime>().is_err());
    assert!("10:60".parse::<ClockTime>().is_err());
    assert!("noon".parse::<ClockTime>().is_err());
}

#[test]
fn test_derive_requirements_is_deterministic() {
    let mut courses = std::collections::BTreeMap::new();
    courses.insert(
        CourseId(1),
        Course::new(1, "CS101", "Programming", 2, RoomType::Lecture),
    );
    courses.insert(
        CourseId(2),
        Course::new(2, "CS101L", "Programming Lab", 1, RoomType::Lab).with_sessions(1, 2),
    );
    let sections = [
        Section::new(2, "B", 30, RoomType::Lecture, "SHIFT_8_4").with_course(1),
        Section::new(1, "A", 30, RoomType::Lecture, "SHIFT_8_4")
            .with_course(2)
            .with_course(1),
    ];

    let requirements = derive_requirements(sections.iter(), &courses);
    let summary: Vec<(u32, u32, u8, u8)> = requirements
        .iter()
        .map(|r| (r.section.get(), r.course.get(), r.session, r.periods))
        .collect();
    assert_eq!(
        summary,
        vec![(1, 2, 0, 2), (1, 1, 0, 1), (1, 1, 1, 1), (2, 1, 0, 1), (2, 1, 1, 1)]
    );
    assert_eq!(requirements[4].id, RequirementId(4));
    assert_eq!(requirements[0].room_type, RoomType::Lab);
}

#[test]
fn test_faculty_mapping_precedence() {
    let snapshot = EntitySnapshot::new(default_calendar())
        .with_mapping(FacultyCourseMapping::course_wide(5, 1))
        .with_mapping(FacultyCourseMapping::course_wide(3, 1))
        .with_mapping(FacultyCourseMapping::for_section(9, 1, 2));

    assert_eq!(
        snapshot.faculty_for(SectionId(1), CourseId(1)),
        Some(FacultyId(3))
    );
    assert_eq!(
        snapshot.faculty_for(SectionId(2), CourseId(1)),
        Some(FacultyId(9))
    );
    assert_eq!(snapshot.faculty_for(SectionId(1), CourseId(2)), None);
}

#[test]
fn test_faculty_unavailability() {
    let snapshot = EntitySnapshot::new(default_calendar()).with_unavailability(
        FacultyUnavailability::new(1, 0, TimeWindow::hours(9, 11)),
    );
    assert!(!snapshot.faculty_available(FacultyId(1), 0, &TimeWindow::hours(10, 11)));
    assert!(snapshot.faculty_available(FacultyId(1), 1, &TimeWindow::hours(10, 11)));
    assert!(snapshot.faculty_available(FacultyId(2), 0, &TimeWindow::hours(10, 11)));
    assert!(snapshot.faculty_available(FacultyId(1), 0, &TimeWindow::hours(11, 12)));
}

#[test]
fn test_assignment_set_replacement_keeps_original() {
    let original = AssignmentSet::new(
        vec![assignment(2, 1, 5), assignment(1, 1, 4)],
        ScheduleScore::ZERO,
    );
    assert_eq!(original.assignments()[0].requirement, RequirementId(1));

    let repaired = original.with_replacements(vec![assignment(2, 3, 6)], ScheduleScore::of_soft(-1));

    assert_eq!(original.get(RequirementId(2)).unwrap().room, RoomId(1));
    assert_eq!(repaired.get(RequirementId(2)).unwrap().room, RoomId(3));
    assert_eq!(repaired.len(), 2);
    assert_eq!(original.differing(&repaired), vec![RequirementId(2)]);
}

#[test]
fn test_assignment_set_serializes_identically() {
    let a = AssignmentSet::new(
        vec![assignment(2, 1, 5), assignment(1, 1, 4)],
        ScheduleScore::ZERO,
    );
    let b = AssignmentSet::new(
        vec![assignment(1, 1, 4), assignment(2, 1, 5)],
        ScheduleScore::ZERO,
    );
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_room_type_parse_any_case() {
    assert_eq!("LAB".parse::<RoomType>().unwrap(), RoomType::Lab);
    assert_eq!("lecture".parse::<RoomType>().unwrap(), RoomType::Lecture);
    assert!("studio".parse::<RoomType>().is_err());
}
