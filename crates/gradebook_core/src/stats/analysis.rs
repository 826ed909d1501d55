//! Chart-oriented aggregates over grades.
//!
//! # Responsibility
//! - Bucket grade values into fixed score bands.
//! - Produce date-ordered series and moving-average trends.
//! - Rank subjects by weighted average with a performance tier.
//!
//! # Invariants
//! - Every in-range value lands in exactly one band.
//! - Date ordering is stable: grades sharing a date keep insertion order.

use crate::model::grade::{Grade, GradeStats};
use crate::stats::{round2, subject_stats};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default window for `moving_average_trend`.
pub const DEFAULT_TREND_WINDOW: usize = 3;

/// `(label, upper bound)` of each score band, ascending.
const SCORE_BANDS: &[(&str, f64)] = &[
    ("1.0-2.0", 2.0),
    ("2.1-3.0", 3.0),
    ("3.1-4.0", 4.0),
    ("4.1-5.0", 5.0),
    ("5.1-6.0", 6.0),
    ("6.1-7.0", 7.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub label: String,
    pub count: usize,
    /// Share of all grades, in percent with one decimal.
    pub percentage: f64,
}

/// Counts grades per score band.
///
/// A value belongs to the first band whose upper bound is `>=` the value,
/// so values between published band labels (e.g. `2.05`) are never dropped.
pub fn grade_distribution(grades: &[Grade]) -> Vec<DistributionBucket> {
    let mut counts = vec![0usize; SCORE_BANDS.len()];
    for grade in grades {
        if let Some(index) = SCORE_BANDS
            .iter()
            .position(|(_, upper)| grade.value <= *upper)
        {
            counts[index] += 1;
        }
    }

    let total = grades.len();
    SCORE_BANDS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| DistributionBucket {
            label: (*label).to_string(),
            count,
            percentage: if total == 0 {
                0.0
            } else {
                (count as f64 / total as f64 * 1000.0).round() / 10.0
            },
        })
        .collect()
}

/// Grades in chronological order, optionally restricted to one subject.
pub fn grades_by_date<'a>(grades: &'a [Grade], subject: Option<&str>) -> Vec<&'a Grade> {
    let mut series = grades
        .iter()
        .filter(|grade| subject.map_or(true, |name| grade.subject == name))
        .collect::<Vec<_>>();
    series.sort_by_key(|grade| grade.date);
    series
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Simple moving average of values over date-ordered grades.
///
/// The first points average over however many grades exist so far.
/// A `window` of 0 is treated as 1.
pub fn moving_average_trend(grades: &[Grade], window: usize) -> Vec<TrendPoint> {
    let window = window.max(1);
    let ordered = grades_by_date(grades, None);

    ordered
        .iter()
        .enumerate()
        .map(|(index, grade)| {
            let start = (index + 1).saturating_sub(window);
            let slice = &ordered[start..=index];
            let sum: f64 = slice.iter().map(|g| g.value).sum();
            TrendPoint {
                date: grade.date,
                value: round2(sum / slice.len() as f64),
            }
        })
        .collect()
}

/// Coarse label for a subject average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Sufficient,
    AtRisk,
}

impl PerformanceTier {
    pub fn from_average(average: f64) -> Self {
        if average >= 6.0 {
            Self::Excellent
        } else if average >= 5.0 {
            Self::Good
        } else if average >= 4.0 {
            Self::Sufficient
        } else {
            Self::AtRisk
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Sufficient => "sufficient",
            Self::AtRisk => "at_risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRanking {
    pub subject: String,
    pub stats: GradeStats,
    pub tier: PerformanceTier,
}

/// Per-subject stats sorted by average, best first.
///
/// Subjects with equal averages keep the order of `subjects`.
pub fn subject_ranking(grades: &[Grade], subjects: &[String]) -> Vec<SubjectRanking> {
    let mut ranking = subjects
        .iter()
        .map(|subject| {
            let stats = subject_stats(grades, subject);
            SubjectRanking {
                subject: subject.clone(),
                tier: PerformanceTier::from_average(stats.average),
                stats,
            }
        })
        .collect::<Vec<_>>();
    ranking.sort_by(|a, b| b.stats.average.total_cmp(&a.stats.average));
    ranking
}
