//! Schedule score: hard, medium, and soft levels.
//!
//! Hard penalties mark an invalid schedule. Medium penalties come from the
//! tunable institutional rules (lab contiguity, daily load, recess) when they
//! are scored rather than enforced. Soft penalties measure preference quality.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Score level representing different constraint priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    /// Must be satisfied for the schedule to be valid.
    Hard,
    /// Institutional rules scored ahead of preferences.
    Medium,
    /// Preferences optimised after feasibility.
    Soft,
}

/// A score with hard, medium, and soft levels, compared lexicographically.
///
/// All penalties are non-positive; higher is better.
///
/// # Examples
///
/// ```
/// use timeweave_core::ScheduleScore;
///
/// let tidy = ScheduleScore::of(0, -1, -40);
/// let messy = ScheduleScore::of(0, -2, 0);
///
/// // A better medium level wins regardless of soft penalties.
/// assert!(tidy > messy);
/// assert_eq!(tidy.to_string(), "0hard/-1medium/-40soft");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScheduleScore {
    hard: i64,
    medium: i64,
    soft: i64,
}

impl ScheduleScore {
    pub const ZERO: ScheduleScore = ScheduleScore::of(0, 0, 0);

    #[inline]
    pub const fn of(hard: i64, medium: i64, soft: i64) -> Self {
        ScheduleScore { hard, medium, soft }
    }

    #[inline]
    pub const fn of_hard(hard: i64) -> Self {
        Self::of(hard, 0, 0)
    }

    #[inline]
    pub const fn of_medium(medium: i64) -> Self {
        Self::of(0, medium, 0)
    }

    #[inline]
    pub const fn of_soft(soft: i64) -> Self {
        Self::of(0, 0, soft)
    }

    /// A penalty of `amount` at the given level.
    pub fn penalty(level: ScoreLevel, amount: i64) -> Self {
        match level {
            ScoreLevel::Hard => Self::of_hard(-amount),
            ScoreLevel::Medium => Self::of_medium(-amount),
            ScoreLevel::Soft => Self::of_soft(-amount),
        }
    }

    #[inline]
    pub const fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub const fn medium(&self) -> i64 {
        self.medium
    }

    #[inline]
    pub const fn soft(&self) -> i64 {
        self.soft
    }

    /// A schedule is feasible when no hard penalty remains.
    #[inline]
    pub const fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    pub fn level(&self, level: ScoreLevel) -> i64 {
        match level {
            ScoreLevel::Hard => self.hard,
            ScoreLevel::Medium => self.medium,
            ScoreLevel::Soft => self.soft,
        }
    }
}

impl Ord for ScheduleScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard
            .cmp(&other.hard)
            .then(self.medium.cmp(&other.medium))
            .then(self.soft.cmp(&other.soft))
    }
}

impl PartialOrd for ScheduleScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for ScheduleScore {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::of(
            self.hard + other.hard,
            self.medium + other.medium,
            self.soft + other.soft,
        )
    }
}

impl AddAssign for ScheduleScore {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for ScheduleScore {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::of(
            self.hard - other.hard,
            self.medium - other.medium,
            self.soft - other.soft,
        )
    }
}

impl Neg for ScheduleScore {
    type Output = Self;

    fn neg(self) -> Self {
        Self::of(-self.hard, -self.medium, -self.soft)
    }
}

impl Sum for ScheduleScore {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Debug for ScheduleScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScheduleScore({}, {}, {})",
            self.hard, self.medium, self.soft
        )
    }
}

impl fmt::Display for ScheduleScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}hard/{}medium/{}soft",
            self.hard, self.medium, self.soft
        )
    }
}

/// Error when parsing a score from its `"Xhard/Ymedium/Zsoft"` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse score '{input}': {reason}")]
pub struct ScoreParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for ScheduleScore {
    type Err = ScoreParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| ScoreParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 3 {
            return Err(fail("expected three '/'-separated levels"));
        }

        let mut levels = [0i64; 3];
        for ((slot, part), suffix) in levels
            .iter_mut()
            .zip(&parts)
            .zip(["hard", "medium", "soft"])
        {
            let number = part
                .strip_suffix(suffix)
                .ok_or_else(|| fail(&format!("missing '{}' suffix", suffix)))?;
            *slot = number
                .parse()
                .map_err(|_| fail(&format!("invalid {} level '{}'", suffix, number)))?;
        }
        Ok(Self::of(levels[0], levels[1], levels[2]))
    }
}
