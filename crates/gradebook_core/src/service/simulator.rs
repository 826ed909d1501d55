//! What-if calculations over recorded grades.
//!
//! # Responsibility
//! - Solve for the grade needed on the remaining weight to hit a target.
//! - Recompute the weighted average with one hypothetical grade added.
//!
//! # Invariants
//! - Functions are pure; the store is never mutated by a simulation.
//! - `required_grade` results are clamped to the value scale.
//! - No remaining weight is reported as `NoRemainingWeight`, not a number.
//! - Non-finite averages are rejected; a result is never NaN.

use crate::config::GradebookConfig;
use crate::model::grade::Grade;
use crate::stats::round2;
use crate::validation::{validate_value_with, ValidationError, WEIGHT_EPSILON};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static DEFAULT_CONFIG: Lazy<GradebookConfig> = Lazy::new(GradebookConfig::default);

/// Grade that is evaluated but never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypotheticalGrade {
    pub subject: String,
    pub value: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The budget is fully used; nothing is left to simulate against.
    NoRemainingWeight,
    /// Hypothetical weight does not fit in the remaining budget.
    WeightBudgetExceeded { requested: f64, remaining: f64 },
    /// A value or average is outside the grade scale or not finite.
    ValueOutOfRange { value: f64, min: f64, max: f64 },
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRemainingWeight => write!(f, "no percentage left to simulate"),
            Self::WeightBudgetExceeded {
                requested,
                remaining,
            } => write!(
                f,
                "total weight cannot exceed the budget: {requested}% requested, {remaining}% left"
            ),
            Self::ValueOutOfRange { value, min, max } => write!(
                f,
                "grade value {value} must be between {min:.1} and {max:.1}"
            ),
        }
    }
}

impl Error for SimulationError {}

/// Grade needed on `remaining_weight` to reach `target_average` overall.
///
/// `clamp((target*100 - current*(100-remaining)) / remaining, 1.0, 7.0)`
pub fn required_grade(
    target_average: f64,
    current_average: f64,
    remaining_weight: f64,
) -> Result<f64, SimulationError> {
    required_grade_with(
        &DEFAULT_CONFIG,
        target_average,
        current_average,
        remaining_weight,
    )
}

pub fn required_grade_with(
    config: &GradebookConfig,
    target_average: f64,
    current_average: f64,
    remaining_weight: f64,
) -> Result<f64, SimulationError> {
    if remaining_weight.is_nan() || remaining_weight <= 0.0 {
        return Err(SimulationError::NoRemainingWeight);
    }
    for value in [target_average, current_average, remaining_weight] {
        if !value.is_finite() {
            return Err(SimulationError::ValueOutOfRange {
                value,
                min: config.min_value,
                max: config.max_value,
            });
        }
    }
    let budget = config.weight_budget;
    let raw = (target_average * budget - current_average * (budget - remaining_weight))
        / remaining_weight;
    Ok(raw.clamp(config.min_value, config.max_value))
}

/// Weighted average of `existing` plus `hypothetical`, rounded to 2 decimals.
///
/// The weight budget is checked before the value, and the sum of all
/// weights in `existing` counts against it.
pub fn simulated_average(
    existing: &[Grade],
    hypothetical: &HypotheticalGrade,
) -> Result<f64, SimulationError> {
    simulated_average_with(&DEFAULT_CONFIG, existing.iter(), hypothetical)
}

pub fn simulated_average_with<'a>(
    config: &GradebookConfig,
    existing: impl IntoIterator<Item = &'a Grade>,
    hypothetical: &HypotheticalGrade,
) -> Result<f64, SimulationError> {
    let (used, weighted_sum) = existing
        .into_iter()
        .fold((0.0, 0.0), |(weight, sum), grade| {
            (weight + grade.weight, sum + grade.value * grade.weight)
        });

    if !hypothetical.weight.is_finite()
        || hypothetical.weight < 0.0
        || used + hypothetical.weight > config.weight_budget + WEIGHT_EPSILON
    {
        return Err(SimulationError::WeightBudgetExceeded {
            requested: hypothetical.weight,
            remaining: (config.weight_budget - used).max(0.0),
        });
    }
    validate_value_with(config, hypothetical.value).map_err(|err| match err {
        ValidationError::ValueOutOfRange { value, min, max } => {
            SimulationError::ValueOutOfRange { value, min, max }
        }
        _ => SimulationError::ValueOutOfRange {
            value: hypothetical.value,
            min: config.min_value,
            max: config.max_value,
        },
    })?;

    let total = used + hypothetical.weight;
    if total == 0.0 {
        return Ok(0.0);
    }
    Ok(round2(
        (weighted_sum + hypothetical.value * hypothetical.weight) / total,
    ))
}
