//! Compiles an entity snapshot into a [`Model`].
//!
//! Domains only carry values that satisfy the static hard rules: room type,
//! capacity, shift window (working day, hours, lunch), faculty availability,
//! the requirement's start whitelist, and a contiguous span for multi-period
//! sessions. Occupancy rules are left to the search. Every requirement that
//! cannot be compiled is reported; compilation never stops at the first.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use timeweave_core::{
    Assignment, CompileError, CompileErrorKind, CompileErrors, EntitySnapshot, MeetingRequirement,
    RequirementId, Room, TimeWindow, Timeslot,
};

use crate::model::{DomainValue, Model, Span, Variable};

/// Compiles every requirement in the snapshot.
///
/// # Errors
///
/// Returns all diagnostics when any requirement has no faculty mapping or
/// an empty domain.
pub fn compile(snapshot: Arc<EntitySnapshot>) -> Result<Model, CompileErrors> {
    ModelCompiler::new(snapshot).compile()
}

/// Builder for full and partial models.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use timeweave_solver::ModelCompiler;
/// use timeweave_test::campus;
///
/// let snapshot = Arc::new(campus::small_campus());
/// let model = ModelCompiler::new(snapshot.clone()).compile().unwrap();
/// assert_eq!(model.len(), snapshot.requirements().len());
/// ```
#[derive(Debug, Clone)]
pub struct ModelCompiler {
    snapshot: Arc<EntitySnapshot>,
    only: Option<BTreeSet<RequirementId>>,
    fixed: Vec<Assignment>,
}

impl ModelCompiler {
    pub fn new(snapshot: Arc<EntitySnapshot>) -> Self {
        Self {
            snapshot,
            only: None,
            fixed: Vec::new(),
        }
    }

    /// Restricts the model to the given requirements.
    pub fn with_requirements(mut self, requirements: impl IntoIterator<Item = RequirementId>) -> Self {
        self.only = Some(requirements.into_iter().collect());
        self
    }

    /// Assignments that stay where they are and occupy their resources.
    pub fn with_fixed(mut self, fixed: impl IntoIterator<Item = Assignment>) -> Self {
        self.fixed.extend(fixed);
        self
    }

    pub fn compile(self) -> Result<Model, CompileErrors> {
        let mut errors = CompileErrors::new();
        let mut variables = Vec::new();

        let mut requirements: Vec<&MeetingRequirement> = self
            .snapshot
            .requirements()
            .iter()
            .filter(|r| self.only.as_ref().map_or(true, |only| only.contains(&r.id)))
            .collect();
        requirements.sort_by_key(|r| r.id);

        for requirement in requirements {
            match self.compile_requirement(requirement) {
                Ok(variable) => variables.push(variable),
                Err(diagnostics) => {
                    for diagnostic in diagnostics {
                        errors.push(diagnostic);
                    }
                }
            }
        }

        errors.into_result()?;

        let fixed_ids: BTreeSet<RequirementId> = variables.iter().map(|v| v.requirement).collect();
        let mut fixed: Vec<Assignment> = self
            .fixed
            .into_iter()
            .filter(|a| !fixed_ids.contains(&a.requirement))
            .collect();
        fixed.sort_by_key(|a| a.requirement);

        debug!(
            variables = variables.len(),
            fixed = fixed.len(),
            domain_size = variables.iter().map(|v| v.domain.len()).sum::<usize>(),
            "Model compiled"
        );
        Ok(Model::new(self.snapshot, variables, fixed))
    }

    fn compile_requirement(
        &self,
        requirement: &MeetingRequirement,
    ) -> Result<Variable, Vec<CompileError>> {
        let snapshot = &*self.snapshot;
        let diagnostic = |kind, detail: String| CompileError {
            kind,
            requirement: requirement.id,
            section: requirement.section,
            course: requirement.course,
            detail,
        };
        let unsatisfiable = |detail: String| {
            vec![diagnostic(CompileErrorKind::UnsatisfiableDomain, detail)]
        };

        let Some(section) = snapshot.section(requirement.section) else {
            return Err(unsatisfiable(format!(
                "{} is not in the snapshot",
                requirement.section
            )));
        };
        let Some(shift) = snapshot.calendar().shift(&section.shift) else {
            return Err(unsatisfiable(format!(
                "shift {} is not defined",
                section.shift
            )));
        };

        let mut diagnostics = Vec::new();
        let faculty = snapshot.faculty_for(requirement.section, requirement.course);
        if faculty.is_none() {
            diagnostics.push(diagnostic(
                CompileErrorKind::MissingFacultyMapping,
                format!(
                    "no faculty mapped to {} for {}",
                    requirement.course, section.code
                ),
            ));
        }

        // A room must satisfy both the course's and the section's room type.
        let types_agree = section.required_room_type == requirement.room_type;
        let of_type: Vec<&Room> = snapshot
            .rooms()
            .filter(|r| types_agree && r.room_type == requirement.room_type)
            .collect();
        let mut rooms: Vec<&Room> = of_type
            .iter()
            .copied()
            .filter(|r| r.capacity >= section.student_count)
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));

        let calendar = snapshot.calendar();
        let mut whitelisted = 0usize;
        let mut in_shift = 0usize;
        let mut starts: Vec<(&Timeslot, Span, TimeWindow)> = Vec::new();
        for slot in calendar.timeslots() {
            if !requirement.allows_start(slot.id) {
                continue;
            }
            whitelisted += 1;
            let Some(span) = calendar.span(slot.id, requirement.periods) else {
                continue;
            };
            let Some((day, window)) = calendar.span_window(&span) else {
                continue;
            };
            if !shift.admits_window(day, &window) {
                continue;
            }
            in_shift += 1;
            if let Some(faculty) = faculty {
                if !snapshot.faculty_available(faculty, day, &window) {
                    continue;
                }
            }
            starts.push((slot, Span::from_vec(span), window));
        }
        starts.sort_by(|a, b| {
            a.0.start
                .cmp(&b.0.start)
                .then(a.0.day.cmp(&b.0.day))
                .then(a.0.id.cmp(&b.0.id))
        });

        let empty_reason = if !types_agree {
            Some(format!(
                "{} requires a {} room but {} needs a {} room",
                section.code, section.required_room_type, requirement.course, requirement.room_type
            ))
        } else if of_type.is_empty() {
            Some(format!("no {} room exists", requirement.room_type))
        } else if rooms.is_empty() {
            Some(format!(
                "no {} room seats {} students",
                requirement.room_type, section.student_count
            ))
        } else if whitelisted == 0 {
            Some("no allowed start timeslot exists".to_string())
        } else if in_shift == 0 {
            Some(format!(
                "no {}-period session fits shift {}",
                requirement.periods, shift.code
            ))
        } else if starts.is_empty() {
            Some("faculty is unavailable at every timeslot the shift admits".to_string())
        } else {
            None
        };
        if let Some(reason) = empty_reason {
            diagnostics.push(diagnostic(CompileErrorKind::UnsatisfiableDomain, reason));
        }

        let Some(faculty) = faculty.filter(|_| diagnostics.is_empty()) else {
            return Err(diagnostics);
        };

        let mut domain = Vec::with_capacity(rooms.len() * starts.len());
        for room in &rooms {
            for (slot, span, window) in &starts {
                let last_period = slot.period + span.len() as u16 - 1;
                domain.push(DomainValue {
                    room: room.id,
                    slots: span.clone(),
                    day: slot.day,
                    first_period: slot.period,
                    last_period,
                    window: *window,
                });
            }
        }

        Ok(Variable {
            requirement: requirement.id,
            section: requirement.section,
            course: requirement.course,
            faculty,
            room_type: requirement.room_type,
            periods: requirement.periods,
            domain,
        })
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
