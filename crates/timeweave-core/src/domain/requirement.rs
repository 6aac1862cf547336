//! Meeting requirements: one weekly session a section needs for a course.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::{Course, RoomType, Section};
use super::ids::{CourseId, RequirementId, SectionId, TimeslotId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequirement {
    pub id: RequirementId,
    pub section: SectionId,
    pub course: CourseId,
    /// Index of this session among the course's weekly sessions.
    pub session: u8,
    /// Consecutive periods the session occupies.
    pub periods: u8,
    pub room_type: RoomType,
    /// Optional whitelist of start timeslots; `None` admits any.
    #[serde(default)]
    pub allowed_timeslots: Option<Vec<TimeslotId>>,
}

impl MeetingRequirement {
    pub fn new(
        id: impl Into<RequirementId>,
        section: impl Into<SectionId>,
        course: impl Into<CourseId>,
        room_type: RoomType,
    ) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
            course: course.into(),
            session: 0,
            periods: 1,
            room_type,
            allowed_timeslots: None,
        }
    }

    pub fn with_session(mut self, session: u8) -> Self {
        self.session = session;
        self
    }

    pub fn with_periods(mut self, periods: u8) -> Self {
        self.periods = periods.max(1);
        self
    }

    pub fn with_allowed_timeslots(mut self, slots: impl IntoIterator<Item = TimeslotId>) -> Self {
        self.allowed_timeslots = Some(slots.into_iter().collect());
        self
    }

    /// Returns true if `start` passes the whitelist.
    pub fn allows_start(&self, start: TimeslotId) -> bool {
        self.allowed_timeslots
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&start))
    }
}

/// Derives requirements deterministically from sections and their courses.
///
/// Sections are visited in id order and courses in the order each section
/// lists them; every course contributes `weekly_sessions` requirements.
/// Course references that do not resolve are skipped (ingestion guarantees
/// consistency).
pub fn derive_requirements<'a>(
    sections: impl IntoIterator<Item = &'a Section>,
    courses: &BTreeMap<CourseId, Course>,
) -> Vec<MeetingRequirement> {
    let mut sections: Vec<&Section> = sections.into_iter().collect();
    sections.sort_by_key(|s| s.id);

    let mut requirements = Vec::new();
    for section in sections {
        for course_id in &section.courses {
            let Some(course) = courses.get(course_id) else {
                continue;
            };
            for session in 0..course.weekly_sessions {
                requirements.push(
                    MeetingRequirement::new(
                        RequirementId(requirements.len() as u32),
                        section.id,
                        course.id,
                        course.room_type,
                    )
                    .with_session(session)
                    .with_periods(course.session_periods),
                );
            }
        }
    }
    requirements
}
