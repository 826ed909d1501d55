//! Derived statistics over grade collections.
//!
//! # Responsibility
//! - Compute weighted averages and per-subject summaries.
//! - Provide chart-ready aggregates (distribution, trend, ranking).
//!
//! # Invariants
//! - All functions are pure and accept any slice, including empty ones.
//! - Empty inputs and zero total weight yield `0.0` averages, never `NaN`.

pub mod analysis;

use crate::model::grade::{Grade, GradeStats};

/// Rounds to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Unrounded `sum(value * weight) / sum(weight)`.
///
/// Returns `0.0` when the set is empty or carries no weight.
pub fn weighted_mean<'a>(grades: impl IntoIterator<Item = &'a Grade>) -> f64 {
    let (weighted_sum, total_weight) = grades
        .into_iter()
        .fold((0.0, 0.0), |(sum, weight), grade| {
            (sum + grade.value * grade.weight, weight + grade.weight)
        });
    if total_weight == 0.0 {
        0.0
    } else {
        weighted_sum / total_weight
    }
}

/// Weighted average rounded to 2 decimals, optionally filtered by subject.
pub fn weighted_average(grades: &[Grade], subject: Option<&str>) -> f64 {
    let filtered = grades
        .iter()
        .filter(|grade| subject.map_or(true, |name| grade.subject == name));
    round2(weighted_mean(filtered))
}

/// Summary for one subject; all zeros when it has no grades.
pub fn subject_stats(grades: &[Grade], subject: &str) -> GradeStats {
    let values = grades
        .iter()
        .filter(|grade| grade.subject == subject)
        .map(|grade| grade.value)
        .collect::<Vec<_>>();

    if values.is_empty() {
        return GradeStats::default();
    }

    GradeStats {
        average: weighted_average(grades, Some(subject)),
        highest: values.iter().copied().fold(f64::MIN, f64::max),
        lowest: values.iter().copied().fold(f64::MAX, f64::min),
        count: values.len(),
    }
}
