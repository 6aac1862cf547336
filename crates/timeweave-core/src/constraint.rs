//! The constraint catalogue.
//!
//! Every rule the scheduler knows about is named here with its natural
//! level. Medium rules are governed by a [`ConstraintMode`] chosen in
//! configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::score::ScoreLevel;

/// A scheduling rule.
///
/// # Example
///
/// ```
/// use timeweave_core::{ConstraintKind, ScoreLevel};
///
/// assert_eq!(ConstraintKind::RoomOccupancy.level(), ScoreLevel::Hard);
/// assert_eq!(ConstraintKind::LabContiguity.name(), "lab_contiguity");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// No two sessions share a room in the same timeslot.
    RoomOccupancy,
    /// No faculty member teaches two sessions in the same timeslot.
    FacultyOccupancy,
    /// No section attends two sessions in the same timeslot.
    SectionOccupancy,
    /// The room seats the whole section.
    RoomCapacity,
    /// The room is of the type the session requires.
    RoomType,
    /// The session lies inside the section's shift, outside lunch, on a working day.
    ShiftWindow,
    /// The faculty member is not blocked during the session.
    FacultyAvailability,
    /// Sessions of one lab course for one section sit back to back on a day.
    LabContiguity,
    /// A faculty member teaches at most the configured periods per day.
    FacultyDailyLoad,
    /// Sessions avoid recess windows.
    Recess,
    /// Idle periods between a faculty member's first and last session of a day.
    FacultyIdleGap,
    /// Extra rooms a section moves through on one day.
    SectionRoomChange,
    /// Spread between a section's busiest and quietest working day.
    DailyLoadBalance,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 13] = [
        ConstraintKind::RoomOccupancy,
        ConstraintKind::FacultyOccupancy,
        ConstraintKind::SectionOccupancy,
        ConstraintKind::RoomCapacity,
        ConstraintKind::RoomType,
        ConstraintKind::ShiftWindow,
        ConstraintKind::FacultyAvailability,
        ConstraintKind::LabContiguity,
        ConstraintKind::FacultyDailyLoad,
        ConstraintKind::Recess,
        ConstraintKind::FacultyIdleGap,
        ConstraintKind::SectionRoomChange,
        ConstraintKind::DailyLoadBalance,
    ];

    /// The natural level of the rule.
    pub fn level(&self) -> ScoreLevel {
        match self {
            ConstraintKind::RoomOccupancy
            | ConstraintKind::FacultyOccupancy
            | ConstraintKind::SectionOccupancy
            | ConstraintKind::RoomCapacity
            | ConstraintKind::RoomType
            | ConstraintKind::ShiftWindow
            | ConstraintKind::FacultyAvailability => ScoreLevel::Hard,
            ConstraintKind::LabContiguity
            | ConstraintKind::FacultyDailyLoad
            | ConstraintKind::Recess => ScoreLevel::Medium,
            ConstraintKind::FacultyIdleGap
            | ConstraintKind::SectionRoomChange
            | ConstraintKind::DailyLoadBalance => ScoreLevel::Soft,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::RoomOccupancy => "room_occupancy",
            ConstraintKind::FacultyOccupancy => "faculty_occupancy",
            ConstraintKind::SectionOccupancy => "section_occupancy",
            ConstraintKind::RoomCapacity => "room_capacity",
            ConstraintKind::RoomType => "room_type",
            ConstraintKind::ShiftWindow => "shift_window",
            ConstraintKind::FacultyAvailability => "faculty_availability",
            ConstraintKind::LabContiguity => "lab_contiguity",
            ConstraintKind::FacultyDailyLoad => "faculty_daily_load",
            ConstraintKind::Recess => "recess",
            ConstraintKind::FacultyIdleGap => "faculty_idle_gap",
            ConstraintKind::SectionRoomChange => "section_room_change",
            ConstraintKind::DailyLoadBalance => "daily_load_balance",
        }
    }

    pub fn is_medium(&self) -> bool {
        self.level() == ScoreLevel::Medium
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a medium rule takes part in solving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMode {
    /// Enforced during search like a hard rule; violating values are skipped.
    Hard,
    /// Violating values are tried last and the violation is scored.
    #[default]
    Soft,
    /// Ignored entirely.
    Off,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_levels() {
        let medium: Vec<_> = ConstraintKind::ALL
            .iter()
            .filter(|k| k.is_medium())
            .collect();
        assert_eq!(medium.len(), 3);
        assert_eq!(ConstraintKind::DailyLoadBalance.level(), ScoreLevel::Soft);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = ConstraintKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ConstraintKind::ALL.len());
    }

    #[test]
    fn test_default_mode_is_soft() {
        assert_eq!(ConstraintMode::default(), ConstraintMode::Soft);
    }
}
