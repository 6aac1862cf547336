//! Snapshot builder for tests.
//!
//! # Example
//!
//! ```
//! use timeweave_core::RoomType;
//! use timeweave_test::SnapshotBuilder;
//!
//! let snapshot = SnapshotBuilder::new()
//!     .faculty(1, "Ada")
//!     .lecture(10, "CS101", 2)
//!     .room(1, "AB_101", RoomType::Lecture, 60)
//!     .section(1, "CSE_2A", 60, "SHIFT_8_4", &[10])
//!     .teaches(1, 10)
//!     .build();
//!
//! assert_eq!(snapshot.requirements().len(), 2);
//! ```

use timeweave_core::{
    Calendar, CalendarConfig, Course, EntitySnapshot, Faculty, FacultyCourseMapping,
    FacultyUnavailability, MeetingRequirement, Room, RoomType, Section, TimeWindow,
};

/// Collects entities and builds an [`EntitySnapshot`].
///
/// Requirements are derived from sections and courses unless at least one
/// is added explicitly with [`SnapshotBuilder::requirement`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    calendar: CalendarConfig,
    faculty: Vec<Faculty>,
    courses: Vec<Course>,
    rooms: Vec<Room>,
    sections: Vec<Section>,
    mappings: Vec<FacultyCourseMapping>,
    unavailability: Vec<FacultyUnavailability>,
    requirements: Vec<MeetingRequirement>,
}

impl SnapshotBuilder {
    /// Starts from the default calendar (Mon-Fri, hourly, two shifts).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, calendar: CalendarConfig) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn faculty(mut self, id: u32, name: &str) -> Self {
        let email = format!("{}@college.edu", name.to_ascii_lowercase());
        self.faculty.push(Faculty::new(id, name, email));
        self
    }

    pub fn course(mut self, course: Course) -> Self {
        self.courses.push(course);
        self
    }

    /// A lecture course meeting once per credit for one period.
    pub fn lecture(self, id: u32, code: &str, credits: u8) -> Self {
        self.course(Course::new(id, code, code, credits, RoomType::Lecture))
    }

    /// A lab course meeting `sessions` times a week for `periods` periods.
    pub fn lab(self, id: u32, code: &str, sessions: u8, periods: u8) -> Self {
        self.course(Course::new(id, code, code, sessions, RoomType::Lab).with_sessions(sessions, periods))
    }

    pub fn room(mut self, id: u32, code: &str, room_type: RoomType, capacity: u32) -> Self {
        self.rooms.push(Room::new(id, code, room_type, capacity));
        self
    }

    /// A lecture-room section taking `courses` in order.
    pub fn section(self, id: u32, code: &str, students: u32, shift: &str, courses: &[u32]) -> Self {
        self.typed_section(id, code, students, RoomType::Lecture, shift, courses)
    }

    /// A lab-room section taking `courses` in order.
    pub fn lab_section(self, id: u32, code: &str, students: u32, shift: &str, courses: &[u32]) -> Self {
        self.typed_section(id, code, students, RoomType::Lab, shift, courses)
    }

    fn typed_section(
        mut self,
        id: u32,
        code: &str,
        students: u32,
        room_type: RoomType,
        shift: &str,
        courses: &[u32],
    ) -> Self {
        let section = courses.iter().fold(
            Section::new(id, code, students, room_type, shift),
            |section, course| section.with_course(*course),
        );
        self.sections.push(section);
        self
    }

    pub fn teaches(mut self, faculty: u32, course: u32) -> Self {
        self.mappings
            .push(FacultyCourseMapping::course_wide(faculty, course));
        self
    }

    pub fn teaches_section(mut self, faculty: u32, course: u32, section: u32) -> Self {
        self.mappings
            .push(FacultyCourseMapping::for_section(faculty, course, section));
        self
    }

    pub fn unavailable(mut self, faculty: u32, day: u8, window: TimeWindow) -> Self {
        self.unavailability
            .push(FacultyUnavailability::new(faculty, day, window));
        self
    }

    pub fn requirement(mut self, requirement: MeetingRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// # Panics
    ///
    /// Panics if the calendar configuration does not derive.
    pub fn build(self) -> EntitySnapshot {
        let calendar = Calendar::derive(&self.calendar).expect("fixture calendar must derive");
        let mut snapshot = EntitySnapshot::new(calendar);
        for faculty in self.faculty {
            snapshot = snapshot.with_faculty(faculty);
        }
        for course in self.courses {
            snapshot = snapshot.with_course(course);
        }
        for room in self.rooms {
            snapshot = snapshot.with_room(room);
        }
        for section in self.sections {
            snapshot = snapshot.with_section(section);
        }
        for mapping in self.mappings {
            snapshot = snapshot.with_mapping(mapping);
        }
        for window in self.unavailability {
            snapshot = snapshot.with_unavailability(window);
        }
        if self.requirements.is_empty() {
            return snapshot.with_derived_requirements();
        }
        self.requirements
            .into_iter()
            .fold(snapshot, |snapshot, r| snapshot.with_requirement(r))
    }
}
