//! Error types for timeweave

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CourseId, RequirementId, SectionId};

/// Main error type for timeweave operations.
///
/// Search outcomes (infeasible, timed out, budget exceeded) are not errors;
/// they are reported as values by the solver and repair engine.
#[derive(Debug, Error)]
pub enum TimeweaveError {
    /// One or more requirements could not be compiled into a solvable model.
    #[error("Model compilation failed: {0}")]
    Compile(CompileErrors),

    /// Error in scheduler or calendar configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A change or repair referenced an assignment that is not in the set.
    #[error("Unknown assignment for requirement {0}")]
    UnknownAssignment(RequirementId),

    /// A change referenced an entity that is not in the snapshot.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The proposed change is malformed.
    #[error("Invalid change: {0}")]
    InvalidChange(String),
}

/// Result type alias for timeweave operations
pub type Result<T> = std::result::Result<T, TimeweaveError>;

impl From<CompileErrors> for TimeweaveError {
    fn from(errors: CompileErrors) -> Self {
        TimeweaveError::Compile(errors)
    }
}

/// Classification of a compile-time diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompileErrorKind {
    /// No (room, timeslot) pair survives the domain filters.
    UnsatisfiableDomain,
    /// No faculty member is mapped to teach the requirement.
    MissingFacultyMapping,
}

impl CompileErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorKind::UnsatisfiableDomain => "UNSATISFIABLE_DOMAIN",
            CompileErrorKind::MissingFacultyMapping => "MISSING_FACULTY_MAPPING",
        }
    }
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A diagnostic naming the requirement that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub requirement: RequirementId,
    pub section: SectionId,
    pub course: CourseId,
    pub detail: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {} ({} / {}): {}",
            self.kind, self.requirement, self.section, self.course, self.detail
        )
    }
}

/// Every diagnostic produced by one compilation, in requirement order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileErrors {
    errors: Vec<CompileError>,
}

impl CompileErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }

    /// Returns the requirements reported with the given kind.
    pub fn requirements_of(&self, kind: CompileErrorKind) -> Vec<RequirementId> {
        self.errors
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.requirement)
            .collect()
    }

    /// Converts into a `Result`, failing when any diagnostic was recorded.
    pub fn into_result(self) -> std::result::Result<(), CompileErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requirement(s) rejected", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl IntoIterator for CompileErrors {
    type Item = CompileError;
    type IntoIter = std::vec::IntoIter<CompileError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(kind: CompileErrorKind, requirement: u32) -> CompileError {
        CompileError {
            kind,
            requirement: RequirementId(requirement),
            section: SectionId(1),
            course: CourseId(7),
            detail: "no rooms of type Lab".to_string(),
        }
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            CompileErrorKind::UnsatisfiableDomain.code(),
            "UNSATISFIABLE_DOMAIN"
        );
        assert_eq!(
            CompileErrorKind::MissingFacultyMapping.to_string(),
            "MISSING_FACULTY_MAPPING"
        );
    }

    #[test]
    fn test_errors_are_reported_together() {
        let mut errors = CompileErrors::new();
        errors.push(diagnostic(CompileErrorKind::UnsatisfiableDomain, 3));
        errors.push(diagnostic(CompileErrorKind::MissingFacultyMapping, 4));
        errors.push(diagnostic(CompileErrorKind::UnsatisfiableDomain, 9));

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.requirements_of(CompileErrorKind::UnsatisfiableDomain),
            vec![RequirementId(3), RequirementId(9)]
        );

        let message = TimeweaveError::from(errors).to_string();
        assert!(message.contains("3 requirement(s) rejected"));
        assert!(message.contains("req#4"));
    }

    #[test]
    fn test_empty_errors_into_ok() {
        assert!(CompileErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_kind_serializes_as_code() {
        let json = serde_json::to_string(&CompileErrorKind::MissingFacultyMapping).unwrap();
        assert_eq!(json, "\"MISSING_FACULTY_MAPPING\"");
    }
}
