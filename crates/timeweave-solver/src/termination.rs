//! Termination conditions checked at every node expansion.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::statistics::SearchStatistics;

/// Decides when a search must stop.
pub trait Termination: Send + Sync + Debug {
    /// Returns true if the search should stop now.
    fn is_terminated(&self, statistics: &SearchStatistics) -> bool;
}

/// A wall-clock cut-off.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use timeweave_solver::Deadline;
///
/// let deadline = Deadline::after(Duration::from_secs(30));
/// assert!(!deadline.is_expired());
/// assert!(!Deadline::none().is_expired());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn after(limit: Duration) -> Self {
        Self::at(Instant::now() + limit)
    }

    /// `after(limit)` when a limit is given, otherwise no deadline.
    pub fn from_limit(limit: Option<Duration>) -> Self {
        limit.map_or_else(Self::none, Self::after)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// The earlier of two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        match (self.at, other.at) {
            (Some(a), Some(b)) => Deadline::at(a.min(b)),
            (Some(_), None) => self,
            (None, _) => other,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

impl Termination for Deadline {
    fn is_terminated(&self, _statistics: &SearchStatistics) -> bool {
        self.is_expired()
    }
}

/// Stops after a number of node expansions.
#[derive(Debug, Clone, Copy)]
pub struct NodeCountTermination {
    limit: u64,
}

impl NodeCountTermination {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl Termination for NodeCountTermination {
    fn is_terminated(&self, statistics: &SearchStatistics) -> bool {
        statistics.nodes >= self.limit
    }
}

/// Stops when an external flag is raised.
#[derive(Debug, Clone)]
pub struct ExternalTermination {
    flag: Arc<AtomicBool>,
}

impl ExternalTermination {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl Termination for ExternalTermination {
    fn is_terminated(&self, _statistics: &SearchStatistics) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Stops when any child stops.
#[derive(Debug, Default)]
pub struct OrTermination {
    children: Vec<Box<dyn Termination>>,
}

impl OrTermination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, termination: impl Termination + 'static) -> Self {
        self.children.push(Box::new(termination));
        self
    }

    pub fn push(&mut self, termination: impl Termination + 'static) {
        self.children.push(Box::new(termination));
    }
}

impl Termination for OrTermination {
    fn is_terminated(&self, statistics: &SearchStatistics) -> bool {
        self.children.iter().any(|t| t.is_terminated(statistics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_min() {
        let soon = Deadline::after(Duration::from_millis(10));
        let later = Deadline::after(Duration::from_secs(60));
        assert_eq!(soon.min(later), soon);
        assert_eq!(Deadline::none().min(later), later);
        assert_eq!(later.min(Deadline::none()), later);
    }

    #[test]
    fn test_expired_deadline() {
        let past = Deadline::at(Instant::now());
        assert!(past.is_expired());
        assert_eq!(past.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_node_count() {
        let term = NodeCountTermination::new(3);
        let mut stats = SearchStatistics::new();
        assert!(!term.is_terminated(&stats));
        stats.nodes = 3;
        assert!(term.is_terminated(&stats));
    }

    #[test]
    fn test_or_with_external_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let term = OrTermination::new()
            .with(NodeCountTermination::new(1_000))
            .with(ExternalTermination::new(flag.clone()));
        let stats = SearchStatistics::new();
        assert!(!term.is_terminated(&stats));
        flag.store(true, Ordering::SeqCst);
        assert!(term.is_terminated(&stats));
    }
}
