//! Calendar derivation: working days x period grid, shifts with lunch exclusion.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::TimeslotId;
use crate::error::{Result, TimeweaveError};

/// Short weekday labels, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A wall-clock time of day with minute resolution.
///
/// Serialized as `"HH:MM"`.
///
/// # Examples
///
/// ```
/// use timeweave_core::ClockTime;
///
/// let t: ClockTime = "08:30".parse().unwrap();
/// assert_eq!(t, ClockTime::from_hm(8, 30));
/// assert_eq!(t.to_string(), "08:30");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Midnight.
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    #[inline]
    pub const fn from_hm(hour: u16, minute: u16) -> Self {
        ClockTime(hour * 60 + minute)
    }

    #[inline]
    pub const fn from_minutes(minutes: u16) -> Self {
        ClockTime(minutes)
    }

    /// Minutes since midnight.
    #[inline]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    #[inline]
    pub const fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Adds minutes, returning `None` past the end of the day.
    pub fn checked_add(self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        (total <= MINUTES_PER_DAY).then_some(ClockTime(total))
    }
}

/// Error returned when a clock time string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid clock time '{0}', expected HH:MM")]
pub struct ParseTimeError(String);

impl FromStr for ClockTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        if minute >= 60 || hour > 24 || hour * 60 + minute > MINUTES_PER_DAY {
            return Err(err());
        }
        Ok(ClockTime::from_hm(hour, minute))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseTimeError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Half-open interval `[start, end)` within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub const fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Convenience constructor from whole hours.
    pub const fn hours(start: u16, end: u16) -> Self {
        Self::new(ClockTime::from_hm(start, 0), ClockTime::from_hm(end, 0))
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Returns true if `other` lies entirely inside this window.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two windows share any instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One period of the weekly grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: TimeslotId,
    /// 0 = Monday, 6 = Sunday.
    pub day: u8,
    /// Position within the day's grid, starting at 0.
    pub period: u16,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl Timeslot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    pub fn day_name(&self) -> &'static str {
        WEEKDAY_NAMES[usize::from(self.day) % 7]
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.day_name(), self.start, self.end)
    }
}

/// A section's working window: the days and hours it may be taught,
/// minus one lunch exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub code: String,
    pub window: TimeWindow,
    pub lunch: TimeWindow,
    #[serde(default = "default_working_days")]
    pub working_days: Vec<u8>,
}

impl Shift {
    pub fn new(code: impl Into<String>, window: TimeWindow, lunch: TimeWindow) -> Self {
        Self {
            code: code.into(),
            window,
            lunch,
            working_days: default_working_days(),
        }
    }

    pub fn with_working_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.working_days = days.into_iter().collect();
        self
    }

    /// Returns true if a session occupying `window` on `day` fits this shift.
    pub fn admits_window(&self, day: u8, window: &TimeWindow) -> bool {
        self.working_days.contains(&day)
            && self.window.contains(window)
            && !self.lunch.overlaps(window)
    }

    pub fn admits(&self, slot: &Timeslot) -> bool {
        self.admits_window(slot.day, &slot.window())
    }
}

fn default_working_days() -> Vec<u8> {
    (0..5).collect()
}

fn default_day_start() -> ClockTime {
    ClockTime::from_hm(8, 0)
}

fn default_day_end() -> ClockTime {
    ClockTime::from_hm(18, 0)
}

fn default_period_minutes() -> u16 {
    60
}

fn default_shifts() -> Vec<Shift> {
    vec![
        Shift::new("SHIFT_8_4", TimeWindow::hours(8, 16), TimeWindow::hours(12, 13)),
        Shift::new("SHIFT_10_6", TimeWindow::hours(10, 18), TimeWindow::hours(13, 14)),
    ]
}

/// Shape of the weekly grid.
///
/// The default is Monday to Friday, 08:00 to 18:00 in hourly periods, with
/// an 8-to-4 shift (lunch 12:00) and a 10-to-6 shift (lunch 13:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CalendarConfig {
    #[serde(default = "default_working_days")]
    pub working_days: Vec<u8>,
    #[serde(default = "default_day_start")]
    pub day_start: ClockTime,
    #[serde(default = "default_day_end")]
    pub day_end: ClockTime,
    #[serde(default = "default_period_minutes")]
    pub period_minutes: u16,
    #[serde(default = "default_shifts")]
    pub shifts: Vec<Shift>,
    /// Short breaks that sessions should avoid (scored, not forbidden).
    #[serde(default)]
    pub recesses: Vec<TimeWindow>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            working_days: default_working_days(),
            day_start: default_day_start(),
            day_end: default_day_end(),
            period_minutes: default_period_minutes(),
            shifts: default_shifts(),
            recesses: Vec::new(),
        }
    }
}

impl CalendarConfig {
    pub fn with_working_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.working_days = days.into_iter().collect();
        self
    }

    pub fn with_hours(mut self, start: ClockTime, end: ClockTime, period_minutes: u16) -> Self {
        self.day_start = start;
        self.day_end = end;
        self.period_minutes = period_minutes;
        self
    }

    pub fn with_shifts(mut self, shifts: Vec<Shift>) -> Self {
        self.shifts = shifts;
        self
    }

    pub fn with_recess(mut self, recess: TimeWindow) -> Self {
        self.recesses.push(recess);
        self
    }
}

/// The derived weekly grid plus its shift and recess definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    timeslots: Vec<Timeslot>,
    shifts: BTreeMap<String, Shift>,
    recesses: Vec<TimeWindow>,
    period_minutes: u16,
}

impl Calendar {
    /// Derives timeslots from the configuration.
    ///
    /// Timeslot ids are dense and follow (day, start) order. A trailing
    /// period that would run past `day_end` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TimeweaveError::Config`] for an empty period length, an
    /// inverted day, an out-of-range weekday, or duplicate shift codes.
    pub fn derive(config: &CalendarConfig) -> Result<Self> {
        if config.period_minutes == 0 {
            return Err(TimeweaveError::Config(
                "period_minutes must be positive".to_string(),
            ));
        }
        if config.day_end <= config.day_start {
            return Err(TimeweaveError::Config(format!(
                "day_end {} must be after day_start {}",
                config.day_end, config.day_start
            )));
        }

        let mut days = config.working_days.clone();
        days.sort_unstable();
        days.dedup();
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(TimeweaveError::Config(format!(
                "working day {} is outside 0..=6",
                bad
            )));
        }

        let mut shifts = BTreeMap::new();
        for shift in &config.shifts {
            if shift.window.is_empty() {
                return Err(TimeweaveError::Config(format!(
                    "shift {} has an empty window",
                    shift.code
                )));
            }
            if shifts.insert(shift.code.clone(), shift.clone()).is_some() {
                return Err(TimeweaveError::Config(format!(
                    "duplicate shift code {}",
                    shift.code
                )));
            }
        }

        let mut timeslots = Vec::new();
        for &day in &days {
            let mut start = config.day_start;
            let mut period = 0;
            while let Some(end) = start.checked_add(config.period_minutes) {
                if end > config.day_end {
                    break;
                }
                timeslots.push(Timeslot {
                    id: TimeslotId(timeslots.len() as u32),
                    day,
                    period,
                    start,
                    end,
                });
                start = end;
                period += 1;
            }
        }

        Ok(Self {
            timeslots,
            shifts,
            recesses: config.recesses.clone(),
            period_minutes: config.period_minutes,
        })
    }

    pub fn timeslots(&self) -> &[Timeslot] {
        &self.timeslots
    }

    pub fn timeslot(&self, id: TimeslotId) -> Option<&Timeslot> {
        self.timeslots.get(id.index())
    }

    pub fn shift(&self, code: &str) -> Option<&Shift> {
        self.shifts.get(code)
    }

    pub fn shifts(&self) -> impl Iterator<Item = &Shift> {
        self.shifts.values()
    }

    pub fn recesses(&self) -> &[TimeWindow] {
        &self.recesses
    }

    pub fn period_minutes(&self) -> u16 {
        self.period_minutes
    }

    /// Returns `periods` back-to-back timeslots on one day starting at `start`.
    ///
    /// Returns `None` if the run would cross a day boundary or a gap in the grid.
    pub fn span(&self, start: TimeslotId, periods: u8) -> Option<Vec<TimeslotId>> {
        if periods == 0 {
            return None;
        }
        let first = self.timeslot(start)?;
        let mut run = Vec::with_capacity(usize::from(periods));
        run.push(first.id);
        let mut prev = first;
        for offset in 1..usize::from(periods) {
            let next = self.timeslots.get(start.index() + offset)?;
            if next.day != prev.day || next.start != prev.end {
                return None;
            }
            run.push(next.id);
            prev = next;
        }
        Some(run)
    }

    /// The window covered by a span of timeslots (first start to last end).
    pub fn span_window(&self, span: &[TimeslotId]) -> Option<(u8, TimeWindow)> {
        let first = self.timeslot(*span.first()?)?;
        let last = self.timeslot(*span.last()?)?;
        Some((first.day, TimeWindow::new(first.start, last.end)))
    }
}
