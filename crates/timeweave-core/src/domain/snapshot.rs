//! Read-only entity snapshot consumed by the scheduling core.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::calendar::{Calendar, Shift, TimeWindow};
use super::entity::{Course, Faculty, FacultyCourseMapping, FacultyUnavailability, Room, Section};
use super::ids::{CourseId, FacultyId, RequirementId, RoomId, SectionId};
use super::requirement::{derive_requirements, MeetingRequirement};

/// A normalized, referentially consistent view of every entity one solve
/// or repair needs.
///
/// Snapshots are assembled with the consuming `with_*` methods and then
/// shared behind an `Arc`; nothing mutates a snapshot in place afterwards.
///
/// # Examples
///
/// ```
/// use timeweave_core::{
///     Calendar, CalendarConfig, Course, EntitySnapshot, Faculty, FacultyCourseMapping, Room,
///     RoomType, Section,
/// };
///
/// let calendar = Calendar::derive(&CalendarConfig::default()).unwrap();
/// let snapshot = EntitySnapshot::new(calendar)
///     .with_faculty(Faculty::new(1, "Ada", "ada@college.edu"))
///     .with_course(Course::new(10, "CS101", "Programming", 3, RoomType::Lecture))
///     .with_room(Room::new(1, "AB_101", RoomType::Lecture, 60))
///     .with_section(Section::new(1, "CSE_2A", 60, RoomType::Lecture, "SHIFT_8_4").with_course(10))
///     .with_mapping(FacultyCourseMapping::course_wide(1, 10))
///     .with_derived_requirements();
///
/// assert_eq!(snapshot.requirements().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    calendar: Calendar,
    faculty: BTreeMap<FacultyId, Faculty>,
    courses: BTreeMap<CourseId, Course>,
    rooms: BTreeMap<RoomId, Room>,
    sections: BTreeMap<SectionId, Section>,
    mappings: Vec<FacultyCourseMapping>,
    unavailability: Vec<FacultyUnavailability>,
    requirements: Vec<MeetingRequirement>,
}

impl EntitySnapshot {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            calendar,
            faculty: BTreeMap::new(),
            courses: BTreeMap::new(),
            rooms: BTreeMap::new(),
            sections: BTreeMap::new(),
            mappings: Vec::new(),
            unavailability: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn with_faculty(mut self, faculty: Faculty) -> Self {
        self.faculty.insert(faculty.id, faculty);
        self
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.insert(course.id, course);
        self
    }

    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.insert(room.id, room);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.insert(section.id, section);
        self
    }

    pub fn with_mapping(mut self, mapping: FacultyCourseMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_unavailability(mut self, window: FacultyUnavailability) -> Self {
        self.unavailability.push(window);
        self
    }

    pub fn with_requirement(mut self, requirement: MeetingRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Replaces the requirement list with one derived from sections and courses.
    pub fn with_derived_requirements(mut self) -> Self {
        self.requirements = derive_requirements(self.sections.values(), &self.courses);
        self
    }

    /// A copy of this snapshot without the given room.
    pub fn without_room(&self, room: RoomId) -> Self {
        let mut next = self.clone();
        next.rooms.remove(&room);
        next
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn faculty(&self, id: FacultyId) -> Option<&Faculty> {
        self.faculty.get(&id)
    }

    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.get(&id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id)
    }

    pub fn faculty_members(&self) -> impl Iterator<Item = &Faculty> {
        self.faculty.values()
    }

    pub fn courses(&self) -> &BTreeMap<CourseId, Course> {
        &self.courses
    }

    /// Rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Sections in id order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn mappings(&self) -> &[FacultyCourseMapping] {
        &self.mappings
    }

    pub fn unavailability(&self) -> &[FacultyUnavailability] {
        &self.unavailability
    }

    pub fn requirements(&self) -> &[MeetingRequirement] {
        &self.requirements
    }

    pub fn requirement(&self, id: RequirementId) -> Option<&MeetingRequirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    /// The shift a section is taught in.
    pub fn shift_of(&self, section: SectionId) -> Option<&Shift> {
        let section = self.sections.get(&section)?;
        self.calendar.shift(&section.shift)
    }

    /// Resolves who teaches `course` for `section`.
    ///
    /// A section-specific mapping wins over a course-wide one; among equals
    /// the lowest faculty id is chosen.
    pub fn faculty_for(&self, section: SectionId, course: CourseId) -> Option<FacultyId> {
        let specific = self
            .mappings
            .iter()
            .filter(|m| m.course == course && m.section == Some(section))
            .map(|m| m.faculty)
            .min();
        specific.or_else(|| {
            self.mappings
                .iter()
                .filter(|m| m.course == course && m.section.is_none())
                .map(|m| m.faculty)
                .min()
        })
    }

    /// Returns true if no unavailability block covers the session window.
    pub fn faculty_available(&self, faculty: FacultyId, day: u8, window: &TimeWindow) -> bool {
        !self
            .unavailability
            .iter()
            .any(|u| u.faculty == faculty && u.blocks(day, window))
    }
}
