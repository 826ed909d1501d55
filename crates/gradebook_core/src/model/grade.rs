//! Grade domain model.
//!
//! # Responsibility
//! - Define the canonical grade record and its create/patch inputs.
//! - Define derived statistics and the persisted snapshot shape.
//!
//! # Invariants
//! - `id` is stable and never reused for another grade.
//! - `value` stays within `[1.0, 7.0]` and `weight` within `[0, 100]`.
//! - Snapshot JSON keys are exactly `grades` and `subjects`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a recorded grade.
pub type GradeId = Uuid;

/// Subject every fresh store starts with.
pub const DEFAULT_SUBJECT: &str = "General";

/// One scored evaluation contributing to a subject average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: GradeId,
    /// Human label, e.g. "Midterm".
    pub name: String,
    /// Score on the 1.0 - 7.0 scale.
    pub value: f64,
    /// Percentage points this grade contributes.
    pub weight: f64,
    /// Owning subject name.
    pub subject: String,
    /// Serialized as ISO-8601 `YYYY-MM-DD`.
    pub date: NaiveDate,
}

/// Grade input without identity, used by create paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDraft {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub subject: String,
    pub date: NaiveDate,
}

impl GradeDraft {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        weight: f64,
        subject: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            weight,
            subject: subject.into(),
            date,
        }
    }

    /// Materializes the draft into a grade with a freshly generated ID.
    pub fn into_grade(self) -> Grade {
        self.into_grade_with_id(Uuid::new_v4())
    }

    /// Materializes the draft with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists.
    pub fn into_grade_with_id(self, id: GradeId) -> Grade {
        Grade {
            id,
            name: self.name,
            value: self.value,
            weight: self.weight,
            subject: self.subject,
            date: self.date,
        }
    }
}

/// Partial update for an existing grade. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradePatch {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub weight: Option<f64>,
    pub subject: Option<String>,
    pub date: Option<NaiveDate>,
}

impl GradePatch {
    /// Returns whether the patch carries no field changes.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.value.is_none()
            && self.weight.is_none()
            && self.subject.is_none()
            && self.date.is_none()
    }
}

impl Grade {
    /// Returns a copy of this grade with `patch` merged in.
    pub fn patched(&self, patch: &GradePatch) -> Grade {
        Grade {
            id: self.id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            value: patch.value.unwrap_or(self.value),
            weight: patch.weight.unwrap_or(self.weight),
            subject: patch
                .subject
                .clone()
                .unwrap_or_else(|| self.subject.clone()),
            date: patch.date.unwrap_or(self.date),
        }
    }
}

/// Derived per-subject statistics. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeStats {
    /// Weighted average rounded to 2 decimals.
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub count: usize,
}

/// Full persisted/exported state of a gradebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradebookSnapshot {
    pub grades: Vec<Grade>,
    pub subjects: Vec<String>,
}

impl Default for GradebookSnapshot {
    fn default() -> Self {
        Self {
            grades: Vec::new(),
            subjects: vec![DEFAULT_SUBJECT.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Grade, GradeDraft, GradePatch, GradebookSnapshot, DEFAULT_SUBJECT};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn default_snapshot_contains_general_subject() {
        let snapshot = GradebookSnapshot::default();
        assert!(snapshot.grades.is_empty());
        assert_eq!(snapshot.subjects, vec![DEFAULT_SUBJECT.to_string()]);
    }

    #[test]
    fn patched_only_overrides_present_fields() {
        let grade: Grade =
            GradeDraft::new("Quiz", 5.0, 20.0, "Math", date(2024, 3, 1)).into_grade();
        let patch = GradePatch {
            value: Some(6.5),
            ..GradePatch::default()
        };

        let merged = grade.patched(&patch);
        assert_eq!(merged.id, grade.id);
        assert_eq!(merged.value, 6.5);
        assert_eq!(merged.weight, 20.0);
        assert_eq!(merged.name, "Quiz");
        assert!(!patch.is_empty());
        assert!(GradePatch::default().is_empty());
    }

    #[test]
    fn grade_serializes_date_as_iso_string() {
        let grade = GradeDraft::new("Essay", 4.0, 30.0, "History", date(2024, 11, 5)).into_grade();
        let json = serde_json::to_value(&grade).expect("grade should serialize");
        assert_eq!(json["date"], "2024-11-05");
        assert_eq!(json["subject"], "History");
        assert!(json["id"].is_string());
    }
}
