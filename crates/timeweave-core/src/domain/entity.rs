//! Entity records supplied by the ingestion layer.
//!
//! These are read-only to the scheduling core; referential consistency is
//! guaranteed upstream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::calendar::TimeWindow;
use super::ids::{CourseId, FacultyId, RoomId, SectionId};

/// Kind of room a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Lecture,
    Lab,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomType::Lecture => write!(f, "Lecture"),
            RoomType::Lab => write!(f, "Lab"),
        }
    }
}

impl FromStr for RoomType {
    type Err = String;

    /// Accepts any casing (`"LAB"`, `"Lab"`, `"lab"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecture" => Ok(RoomType::Lecture),
            "lab" => Ok(RoomType::Lab),
            other => Err(format!("unknown room type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub name: String,
    pub email: String,
}

impl Faculty {
    pub fn new(id: impl Into<FacultyId>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A course, with the weekly meeting pattern its sections follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    pub credits: u8,
    pub room_type: RoomType,
    /// Sessions per week.
    pub weekly_sessions: u8,
    /// Consecutive periods per session.
    pub session_periods: u8,
}

impl Course {
    /// Creates a course meeting once per credit, one period at a time.
    pub fn new(
        id: impl Into<CourseId>,
        code: impl Into<String>,
        name: impl Into<String>,
        credits: u8,
        room_type: RoomType,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            credits,
            room_type,
            weekly_sessions: credits.max(1),
            session_periods: 1,
        }
    }

    pub fn with_sessions(mut self, weekly_sessions: u8, session_periods: u8) -> Self {
        self.weekly_sessions = weekly_sessions;
        self.session_periods = session_periods.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub room_type: RoomType,
    pub capacity: u32,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, code: impl Into<String>, room_type: RoomType, capacity: u32) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            room_type,
            capacity,
        }
    }
}

/// A student group taking a list of courses within one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub code: String,
    pub student_count: u32,
    pub required_room_type: RoomType,
    /// Shift code resolved against the calendar.
    pub shift: String,
    pub courses: Vec<CourseId>,
}

impl Section {
    pub fn new(
        id: impl Into<SectionId>,
        code: impl Into<String>,
        student_count: u32,
        required_room_type: RoomType,
        shift: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            student_count: student_count.max(1),
            required_room_type,
            shift: shift.into(),
            courses: Vec::new(),
        }
    }

    pub fn with_course(mut self, course: impl Into<CourseId>) -> Self {
        self.courses.push(course.into());
        self
    }
}

/// A window during which a faculty member cannot teach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacultyUnavailability {
    pub faculty: FacultyId,
    pub day: u8,
    pub window: TimeWindow,
}

impl FacultyUnavailability {
    pub fn new(faculty: impl Into<FacultyId>, day: u8, window: TimeWindow) -> Self {
        Self {
            faculty: faculty.into(),
            day,
            window,
        }
    }

    /// Returns true if a session on `day` covering `window` collides with this block.
    pub fn blocks(&self, day: u8, window: &TimeWindow) -> bool {
        self.day == day && self.window.overlaps(window)
    }
}

/// Who teaches a course, optionally narrowed to one section.
///
/// Section-specific entries take precedence over course-wide ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacultyCourseMapping {
    pub faculty: FacultyId,
    pub course: CourseId,
    #[serde(default)]
    pub section: Option<SectionId>,
}

impl FacultyCourseMapping {
    pub fn course_wide(faculty: impl Into<FacultyId>, course: impl Into<CourseId>) -> Self {
        Self {
            faculty: faculty.into(),
            course: course.into(),
            section: None,
        }
    }

    pub fn for_section(
        faculty: impl Into<FacultyId>,
        course: impl Into<CourseId>,
        section: impl Into<SectionId>,
    ) -> Self {
        Self {
            faculty: faculty.into(),
            course: course.into(),
            section: Some(section.into()),
        }
    }
}
