//! Pure validation predicates over candidate grade data.
//!
//! # Responsibility
//! - Check grade value bounds, weight bounds and the weight budget.
//! - Check the grade count limit.
//! - Render failures as human-readable messages for UI callers.
//!
//! # Invariants
//! - Validators never mutate input and never panic.
//! - `NaN` and infinite numbers are always rejected.
//! - Weight sums tolerate floating point noise below `WEIGHT_EPSILON`.

use crate::config::GradebookConfig;
use crate::model::grade::Grade;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Slack for accumulated floating point error in weight sums.
pub const WEIGHT_EPSILON: f64 = 1e-9;

static DEFAULT_CONFIG: Lazy<GradebookConfig> = Lazy::new(GradebookConfig::default);

/// Reason a candidate grade failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Grade value outside the configured scale.
    ValueOutOfRange { value: f64, min: f64, max: f64 },
    /// Weight outside `[0, budget]`.
    WeightOutOfRange { weight: f64, max: f64 },
    /// Adding the weight would exceed the budget.
    WeightBudgetExceeded { requested: f64, remaining: f64 },
    /// Collection already holds the maximum number of grades.
    GradeLimitReached { limit: usize },
    /// Grade name is blank after trim.
    BlankName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValueOutOfRange { value, min, max } => write!(
                f,
                "grade value {value} must be between {min:.1} and {max:.1}"
            ),
            Self::WeightOutOfRange { weight, max } => {
                write!(f, "weight {weight} must be between 0 and {max}")
            }
            Self::WeightBudgetExceeded {
                requested,
                remaining,
            } => write!(
                f,
                "weight {requested}% exceeds the remaining budget of {remaining}%"
            ),
            Self::GradeLimitReached { limit } => {
                write!(f, "grade limit of {limit} reached")
            }
            Self::BlankName => write!(f, "grade name must not be blank"),
        }
    }
}

impl Error for ValidationError {}

impl ValidationError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValueOutOfRange { .. } => "value_out_of_range",
            Self::WeightOutOfRange { .. } => "weight_out_of_range",
            Self::WeightBudgetExceeded { .. } => "weight_budget_exceeded",
            Self::GradeLimitReached { .. } => "grade_limit_reached",
            Self::BlankName => "blank_name",
        }
    }
}

/// Tagged `{valid, message}` form of a validation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Empty when `valid`.
    pub message: String,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn invalid(error: &ValidationError) -> Self {
        Self {
            valid: false,
            message: error.to_string(),
        }
    }
}

/// Converts a single check into its tagged form.
pub fn report(result: Result<(), ValidationError>) -> ValidationReport {
    match result {
        Ok(()) => ValidationReport::ok(),
        Err(err) => ValidationReport::invalid(&err),
    }
}

/// Valid iff `1.0 <= value <= 7.0`.
pub fn validate_value(value: f64) -> Result<(), ValidationError> {
    validate_value_with(&DEFAULT_CONFIG, value)
}

pub fn validate_value_with(config: &GradebookConfig, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= config.min_value && value <= config.max_value {
        return Ok(());
    }
    Err(ValidationError::ValueOutOfRange {
        value,
        min: config.min_value,
        max: config.max_value,
    })
}

/// Valid iff `0 <= weight <= 100`.
pub fn validate_weight(weight: f64) -> Result<(), ValidationError> {
    validate_weight_with(&DEFAULT_CONFIG, weight)
}

pub fn validate_weight_with(config: &GradebookConfig, weight: f64) -> Result<(), ValidationError> {
    if weight.is_finite() && weight >= 0.0 && weight <= config.weight_budget {
        return Ok(());
    }
    Err(ValidationError::WeightOutOfRange {
        weight,
        max: config.weight_budget,
    })
}

/// Valid iff `sum(existing.weight) + candidate_weight <= 100`.
///
/// The error reports the budget still available so callers can render a
/// precise message.
pub fn validate_weight_budget(
    candidate_weight: f64,
    existing: &[Grade],
) -> Result<(), ValidationError> {
    validate_weight_budget_with(&DEFAULT_CONFIG, candidate_weight, existing.iter())
}

pub fn validate_weight_budget_with<'a>(
    config: &GradebookConfig,
    candidate_weight: f64,
    existing: impl IntoIterator<Item = &'a Grade>,
) -> Result<(), ValidationError> {
    let used = total_weight(existing);
    if used + candidate_weight <= config.weight_budget + WEIGHT_EPSILON {
        return Ok(());
    }
    Err(ValidationError::WeightBudgetExceeded {
        requested: candidate_weight,
        remaining: (config.weight_budget - used).max(0.0),
    })
}

/// Valid iff fewer than 10 grades exist.
pub fn validate_grade_count(existing: &[Grade]) -> Result<(), ValidationError> {
    validate_grade_count_with(&DEFAULT_CONFIG, existing.len())
}

pub fn validate_grade_count_with(
    config: &GradebookConfig,
    existing_count: usize,
) -> Result<(), ValidationError> {
    if existing_count < config.max_grades {
        return Ok(());
    }
    Err(ValidationError::GradeLimitReached {
        limit: config.max_grades,
    })
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::BlankName);
    }
    Ok(())
}

/// Checks all field-level rules of one grade.
pub fn validate_grade_fields(
    config: &GradebookConfig,
    grade: &Grade,
) -> Result<(), ValidationError> {
    validate_name(&grade.name)?;
    validate_value_with(config, grade.value)?;
    validate_weight_with(config, grade.weight)?;
    Ok(())
}

/// Whole-collection check: total weight first, then value bounds.
///
/// The first failing rule wins.
pub fn validate_grades(grades: &[Grade]) -> ValidationReport {
    validate_grades_with(&DEFAULT_CONFIG, grades)
}

pub fn validate_grades_with(config: &GradebookConfig, grades: &[Grade]) -> ValidationReport {
    let total = total_weight(grades);
    if total > config.weight_budget + WEIGHT_EPSILON {
        return ValidationReport {
            valid: false,
            message: format!(
                "total weight {total}% exceeds the budget of {}%",
                config.weight_budget
            ),
        };
    }

    let invalid = grades
        .iter()
        .find(|grade| validate_value_with(config, grade.value).is_err());
    if let Some(grade) = invalid {
        return report(validate_value_with(config, grade.value));
    }

    ValidationReport::ok()
}

pub(crate) fn total_weight<'a>(grades: impl IntoIterator<Item = &'a Grade>) -> f64 {
    grades.into_iter().map(|grade| grade.weight).sum()
}
