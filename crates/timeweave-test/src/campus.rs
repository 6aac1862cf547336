//! Ready-made campuses.
//!
//! All fixtures use the default calendar: Monday to Friday, 08:00 to 18:00
//! in hourly periods, so Monday 08:00 is `TimeslotId(0)` and each day holds
//! ten slots.

use timeweave_core::{
    Assignment, AssignmentSet, CourseId, EntitySnapshot, FacultyId, MeetingRequirement,
    RequirementId, RoomId, RoomType, ScheduleScore, SectionId, TimeWindow, TimeslotId,
};

use crate::builder::SnapshotBuilder;

/// Monday 08:00.
pub const MONDAY_8AM: TimeslotId = TimeslotId(0);

/// Two cohorts on different shifts sharing two lectures and a two-period
/// lab taught twice a week. Each cohort is a lecture section plus a lab
/// section.
///
/// Yields 14 requirements: lecture section 1 owns `req#0..=req#4`, lab
/// section 2 `req#5..=req#6`, lecture section 3 `req#7..=req#11` and lab
/// section 4 `req#12..=req#13`. Faculty 2 is away on Monday morning.
pub fn small_campus() -> EntitySnapshot {
    SnapshotBuilder::new()
        .faculty(1, "Ada")
        .faculty(2, "Grace")
        .faculty(3, "Alan")
        .lecture(10, "CS101", 3)
        .lecture(11, "MA101", 2)
        .lab(12, "CS101L", 2, 2)
        .room(1, "AB_101", RoomType::Lecture, 60)
        .room(2, "AB_102", RoomType::Lecture, 40)
        .room(3, "LAB_1", RoomType::Lab, 60)
        .section(1, "CSE_2A", 55, "SHIFT_8_4", &[10, 11])
        .lab_section(2, "CSE_2A_LAB", 55, "SHIFT_8_4", &[12])
        .section(3, "CSE_2B", 35, "SHIFT_10_6", &[10, 11])
        .lab_section(4, "CSE_2B_LAB", 35, "SHIFT_10_6", &[12])
        .teaches(1, 10)
        .teaches(2, 11)
        .teaches(1, 12)
        .teaches_section(3, 10, 3)
        .unavailable(2, 0, TimeWindow::hours(8, 10))
        .build()
}

/// One section of 60 and one lecture room seating exactly 60.
pub fn single_lecture() -> EntitySnapshot {
    SnapshotBuilder::new()
        .faculty(1, "Ada")
        .lecture(10, "CS101", 1)
        .room(1, "AB_101", RoomType::Lecture, 60)
        .section(1, "CSE_2A", 60, "SHIFT_8_4", &[10])
        .teaches(1, 10)
        .build()
}

/// Two sections that both need the only lab room at the only start either
/// of them allows.
pub fn lab_contention() -> EntitySnapshot {
    SnapshotBuilder::new()
        .faculty(1, "Ada")
        .faculty(2, "Grace")
        .lab(20, "PHY101L", 1, 1)
        .room(1, "AB_101", RoomType::Lecture, 60)
        .room(2, "LAB_1", RoomType::Lab, 40)
        .lab_section(1, "PHY_1A", 30, "SHIFT_8_4", &[20])
        .lab_section(2, "PHY_1B", 30, "SHIFT_8_4", &[20])
        .teaches_section(1, 20, 1)
        .teaches_section(2, 20, 2)
        .requirement(
            MeetingRequirement::new(0, 1, 20, RoomType::Lab).with_allowed_timeslots([MONDAY_8AM]),
        )
        .requirement(
            MeetingRequirement::new(1, 2, 20, RoomType::Lab).with_allowed_timeslots([MONDAY_8AM]),
        )
        .build()
}

fn three_section_campus() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .faculty(1, "Ada")
        .faculty(2, "Grace")
        .faculty(3, "Alan")
        .lecture(30, "GEN101", 1)
        .room(1, "ROOM_101", RoomType::Lecture, 30)
        .room(2, "ROOM_102", RoomType::Lecture, 50)
        .room(3, "ROOM_103", RoomType::Lecture, 80)
        .section(1, "GEN_A", 80, "SHIFT_8_4", &[30])
        .section(2, "GEN_B", 45, "SHIFT_8_4", &[30])
        .section(3, "GEN_C", 25, "SHIFT_8_4", &[30])
        .teaches_section(1, 30, 1)
        .teaches_section(2, 30, 2)
        .teaches_section(3, 30, 3)
}

/// Three sections of 80, 45, and 25 with rooms seating 30, 50, and 80.
///
/// Section `n` owns `req#(n-1)` and is taught by faculty `n`. Only room 3
/// seats section 1; section 2 fits rooms 2 and 3.
pub fn three_sections() -> EntitySnapshot {
    three_section_campus().build()
}

/// [`three_sections`] with every requirement restricted to Monday 08:00.
pub fn three_sections_single_slot() -> EntitySnapshot {
    (0..3u32)
        .fold(three_section_campus(), |builder, n| {
            builder.requirement(
                MeetingRequirement::new(n, n + 1, 30, RoomType::Lecture)
                    .with_allowed_timeslots([MONDAY_8AM]),
            )
        })
        .build()
}

/// A feasible schedule for [`three_sections`]: every section meets on
/// Monday at 08:00, section `n` in room `4 - n`.
///
/// The set is not scored.
pub fn three_section_schedule() -> AssignmentSet {
    let assignments = (1..=3u32)
        .map(|n| Assignment {
            requirement: RequirementId(n - 1),
            section: SectionId(n),
            course: CourseId(30),
            faculty: FacultyId(n),
            room: RoomId(4 - n),
            timeslots: vec![MONDAY_8AM],
        })
        .collect();
    AssignmentSet::new(assignments, ScheduleScore::ZERO)
}
