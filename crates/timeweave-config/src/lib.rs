//! Configuration system for timeweave.
//!
//! Load scheduler configuration from TOML or YAML to control deadlines,
//! strategy selection, the medium-constraint policy, scoring weights, and
//! repair behaviour without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use timeweave_config::{SchedulerConfig, StrategyType};
//! use timeweave_core::ConstraintMode;
//! use std::time::Duration;
//!
//! let config = SchedulerConfig::from_toml_str(r#"
//!     strategy = "backtracking"
//!
//!     [termination]
//!     seconds_spent_limit = 30
//!
//!     [policy]
//!     lab_contiguity = "hard"
//!     max_daily_periods = 5
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(config.strategy, StrategyType::Backtracking);
//! assert_eq!(config.policy.lab_contiguity, ConstraintMode::Hard);
//! ```
//!
//! Use the default config when the file is missing:
//!
//! ```
//! use timeweave_config::SchedulerConfig;
//!
//! let config = SchedulerConfig::load("timeweave.toml").unwrap_or_default();
//! assert_eq!(config.random_seed, 42);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeweave_core::{CalendarConfig, ConstraintKind, ConstraintMode};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main scheduler configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Seed for repair tie-break perturbation.
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    /// Termination configuration.
    #[serde(default)]
    pub termination: TerminationConfig,

    /// Which strategy solves the model.
    #[serde(default)]
    pub strategy: StrategyType,

    /// Exact strategy limits.
    #[serde(default)]
    pub exact: ExactConfig,

    /// Post-feasibility optimisation.
    #[serde(default)]
    pub optimization: OptimizationConfig,

    /// Medium-constraint policy.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Penalty weights per scored rule.
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Incremental repair settings.
    #[serde(default)]
    pub repair: RepairConfig,

    /// Calendar grid and shift definitions.
    #[serde(default)]
    pub calendar: CalendarConfig,
}

fn default_seed() -> u64 {
    42
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            random_seed: default_seed(),
            termination: TerminationConfig::default(),
            strategy: StrategyType::default(),
            exact: ExactConfig::default(),
            optimization: OptimizationConfig::default(),
            policy: PolicyConfig::default(),
            weights: WeightsConfig::default(),
            repair: RepairConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the termination time limit.
    pub fn with_termination_seconds(mut self, seconds: u64) -> Self {
        self.termination.seconds_spent_limit = Some(seconds);
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyType) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarConfig) -> Self {
        self.calendar = calendar;
        self
    }

    /// Disables post-feasibility optimisation.
    pub fn without_optimization(mut self) -> Self {
        self.optimization.enabled = false;
        self
    }

    /// Returns the termination time limit, if configured.
    pub fn time_limit(&self) -> Option<Duration> {
        self.termination.time_limit()
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.max_daily_periods == 0 {
            return Err(ConfigError::Invalid(
                "policy.max_daily_periods must be positive".to_string(),
            ));
        }
        if self.repair.attempts == 0 {
            return Err(ConfigError::Invalid(
                "repair.attempts must be at least 1".to_string(),
            ));
        }
        if self.repair.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "repair.max_candidates must be at least 1".to_string(),
            ));
        }
        if self.calendar.period_minutes == 0 {
            return Err(ConfigError::Invalid(
                "calendar.period_minutes must be positive".to_string(),
            ));
        }
        if self.weights.iter().any(|(_, weight)| weight < 0) {
            return Err(ConfigError::Invalid(
                "weights must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Termination configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TerminationConfig {
    /// Maximum seconds to spend solving.
    pub seconds_spent_limit: Option<u64>,

    /// Maximum milliseconds to spend solving (added to the seconds limit).
    pub millis_spent_limit: Option<u64>,

    /// Maximum search-tree nodes to expand.
    pub node_limit: Option<u64>,
}

impl TerminationConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        let millis =
            self.seconds_spent_limit.unwrap_or(0) * 1000 + self.millis_spent_limit.unwrap_or(0);
        if millis > 0 {
            Some(Duration::from_millis(millis))
        } else {
            None
        }
    }
}

/// Solver strategy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Exact strategy when available, backtracking otherwise.
    #[default]
    Auto,

    /// Always the exact branch-and-bound backend.
    Exact,

    /// Always the fail-first backtracking search.
    Backtracking,
}

/// Limits under which the exact backend reports itself available.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ExactConfig {
    /// Models with more requirements than this go to the fallback.
    pub max_requirements: usize,

    /// Nodes the exact search may expand.
    pub node_limit: u64,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            max_requirements: 40,
            node_limit: 200_000,
        }
    }
}

/// Optimisation after the first feasible schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct OptimizationConfig {
    pub enabled: bool,

    /// Wall-clock budget for improvement once feasible. Off by default:
    /// when it fires, the result depends on machine speed.
    pub time_budget_millis: Option<u64>,

    /// Nodes explored while improving; keeps results reproducible.
    pub node_limit: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_budget_millis: None,
            node_limit: 5_000,
        }
    }
}

impl OptimizationConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_millis.map(Duration::from_millis)
    }
}

/// How each medium rule participates in solving.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PolicyConfig {
    pub lab_contiguity: ConstraintMode,
    pub faculty_daily_load: ConstraintMode,
    pub recess: ConstraintMode,

    /// Daily teaching ceiling per faculty member, in periods.
    pub max_daily_periods: u8,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            lab_contiguity: ConstraintMode::Soft,
            faculty_daily_load: ConstraintMode::Soft,
            recess: ConstraintMode::Soft,
            max_daily_periods: 6,
        }
    }
}

impl PolicyConfig {
    /// Returns the mode for a medium rule; other rules report `Off`.
    pub fn mode(&self, kind: ConstraintKind) -> ConstraintMode {
        match kind {
            ConstraintKind::LabContiguity => self.lab_contiguity,
            ConstraintKind::FacultyDailyLoad => self.faculty_daily_load,
            ConstraintKind::Recess => self.recess,
            _ => ConstraintMode::Off,
        }
    }

    /// Every medium rule in the same mode.
    pub fn uniform(mode: ConstraintMode) -> Self {
        Self {
            lab_contiguity: mode,
            faculty_daily_load: mode,
            recess: mode,
            ..Self::default()
        }
    }
}

/// Penalty weight per scored rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct WeightsConfig {
    pub lab_contiguity: i64,
    pub faculty_daily_load: i64,
    pub recess: i64,
    pub faculty_idle_gap: i64,
    pub section_room_change: i64,
    pub daily_load_balance: i64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            lab_contiguity: 1,
            faculty_daily_load: 1,
            recess: 1,
            faculty_idle_gap: 1,
            section_room_change: 1,
            daily_load_balance: 1,
        }
    }
}

impl WeightsConfig {
    /// Weight of a rule; hard rules weigh 1.
    pub fn weight(&self, kind: ConstraintKind) -> i64 {
        match kind {
            ConstraintKind::LabContiguity => self.lab_contiguity,
            ConstraintKind::FacultyDailyLoad => self.faculty_daily_load,
            ConstraintKind::Recess => self.recess,
            ConstraintKind::FacultyIdleGap => self.faculty_idle_gap,
            ConstraintKind::SectionRoomChange => self.section_room_change,
            ConstraintKind::DailyLoadBalance => self.daily_load_balance,
            _ => 1,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (ConstraintKind, i64)> + '_ {
        ConstraintKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.weight(kind)))
    }
}

/// Incremental repair settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RepairConfig {
    /// Blast-radius budget used when the caller does not pass one.
    pub default_change_budget: usize,

    /// Sub-solves per repair: the canonical one plus perturbed retries.
    pub attempts: usize,

    /// Candidates returned at most.
    pub max_candidates: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            default_change_budget: 3,
            attempts: 4,
            max_candidates: 5,
        }
    }
}
