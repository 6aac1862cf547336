//! Typed identifiers.
//!
//! Identifiers order numerically; every deterministic tie-break in the
//! solver ultimately falls back to this ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident => $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn get(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a faculty member.
    FacultyId => "faculty#"
);
define_id!(
    /// Identifies a course.
    CourseId => "course#"
);
define_id!(
    /// Identifies a room.
    RoomId => "room#"
);
define_id!(
    /// Identifies a section (student group).
    SectionId => "section#"
);
define_id!(
    /// Identifies a timeslot; ids follow (day, start) order within a calendar.
    TimeslotId => "slot#"
);
define_id!(
    /// Identifies a meeting requirement, the unit the solver assigns.
    RequirementId => "req#"
);
