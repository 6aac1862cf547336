//! Search statistics collection.

use std::time::{Duration, Instant};

use serde::Serialize;
use timeweave_core::ScheduleScore;

/// Record of a better schedule found during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreImprovement {
    /// Time since the search started.
    pub time_offset: Duration,
    /// Nodes expanded when the improvement was found.
    pub nodes: u64,
    pub score: ScheduleScore,
}

/// Counters for one search run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchStatistics {
    /// Values tried (node expansions).
    pub nodes: u64,
    /// Times a variable ran out of values and the search stepped back.
    pub backtracks: u64,
    /// Complete schedules reached.
    pub solutions: u64,
    /// Branches cut by the score bound.
    pub pruned: u64,
    pub duration: Duration,
    pub improvements: Vec<ScoreImprovement>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl Default for SearchStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchStatistics {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            backtracks: 0,
            solutions: 0,
            pruned: 0,
            duration: Duration::ZERO,
            improvements: Vec::new(),
            started: None,
        }
    }

    /// Starts the clock.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stops the clock and records the duration.
    pub fn finish(&mut self) {
        self.duration = self.elapsed();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map_or(self.duration, |s| s.elapsed())
    }

    pub fn record_improvement(&mut self, score: ScheduleScore) {
        self.improvements.push(ScoreImprovement {
            time_offset: self.elapsed(),
            nodes: self.nodes,
            score,
        });
    }

    /// The best score seen, if any schedule was completed.
    pub fn best_score(&self) -> Option<ScheduleScore> {
        self.improvements.last().map(|i| i.score)
    }

    /// Node expansions per second over the recorded duration.
    pub fn nodes_per_second(&self) -> u64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.nodes as f64 / secs) as u64
        } else {
            0
        }
    }

    /// Adds another run's counters to these (used when merging repair attempts).
    pub fn absorb(&mut self, other: &SearchStatistics) {
        self.nodes += other.nodes;
        self.backtracks += other.backtracks;
        self.solutions += other.solutions;
        self.pruned += other.pruned;
        self.duration = self.duration.max(other.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvements_track_best() {
        let mut stats = SearchStatistics::new();
        stats.start();
        assert_eq!(stats.best_score(), None);

        stats.nodes = 10;
        stats.record_improvement(ScheduleScore::of(0, -2, -5));
        stats.nodes = 40;
        stats.record_improvement(ScheduleScore::of(0, -1, -9));

        assert_eq!(stats.best_score(), Some(ScheduleScore::of(0, -1, -9)));
        assert_eq!(stats.improvements[0].nodes, 10);
    }

    #[test]
    fn test_absorb() {
        let mut a = SearchStatistics::new();
        a.nodes = 5;
        a.backtracks = 1;
        let mut b = SearchStatistics::new();
        b.nodes = 7;
        b.solutions = 2;
        b.duration = Duration::from_millis(30);

        a.absorb(&b);
        assert_eq!(a.nodes, 12);
        assert_eq!(a.backtracks, 1);
        assert_eq!(a.solutions, 2);
        assert_eq!(a.duration, Duration::from_millis(30));
    }

    #[test]
    fn test_nodes_per_second_without_duration() {
        assert_eq!(SearchStatistics::new().nodes_per_second(), 0);
    }
}
