//! Grade store use-case service.
//!
//! # Responsibility
//! - Own the authoritative grade and subject collections.
//! - Validate every mutation against the configured limits.
//! - Persist the full snapshot after each successful mutation.
//!
//! # Invariants
//! - Weight sums within the budget scope never exceed `weight_budget`.
//! - At most `max_grades` grades exist; `add_grade` enforces it itself.
//! - Every grade references a subject present in `subjects`.
//! - Snapshots are persisted before in-memory state changes, so a failed
//!   write leaves the store untouched.

use crate::config::{BudgetScope, ConfigError, GradebookConfig};
use crate::model::grade::{
    Grade, GradeDraft, GradeId, GradePatch, GradeStats, GradebookSnapshot, DEFAULT_SUBJECT,
};
use crate::repo::snapshot_repo::{RepoError, SnapshotRepository};
use crate::service::simulator::{
    required_grade_with, simulated_average_with, HypotheticalGrade, SimulationError,
};
use crate::stats::analysis::{subject_ranking, SubjectRanking};
use crate::stats::{round2, subject_stats, weighted_average, weighted_mean};
use crate::validation::{
    total_weight, validate_grade_count_with, validate_grade_fields, validate_name,
    validate_value_with, validate_weight_budget_with, validate_weight_with, ValidationError,
    WEIGHT_EPSILON,
};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from grade store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Candidate data violates a validation rule.
    Validation(ValidationError),
    /// Target grade does not exist.
    GradeNotFound(GradeId),
    /// Grade references a subject that is not registered.
    UnknownSubject(String),
    /// Subject name is blank after trim.
    InvalidSubjectName,
    /// Target subject does not exist.
    SubjectNotFound(String),
    /// The default subject cannot be deleted.
    DefaultSubjectProtected,
    /// Import payload could not be parsed or breaks an invariant.
    MalformedImport(String),
    /// Store limits are inconsistent.
    Config(ConfigError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::GradeNotFound(id) => write!(f, "grade not found: {id}"),
            Self::UnknownSubject(name) => write!(f, "unknown subject: `{name}`"),
            Self::InvalidSubjectName => write!(f, "subject name must not be blank"),
            Self::SubjectNotFound(name) => write!(f, "subject not found: `{name}`"),
            Self::DefaultSubjectProtected => {
                write!(f, "the default subject `{DEFAULT_SUBJECT}` cannot be deleted")
            }
            Self::MalformedImport(details) => write!(f, "malformed import data: {details}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl StoreError {
    /// Stable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.code(),
            Self::GradeNotFound(_) => "grade_not_found",
            Self::UnknownSubject(_) => "unknown_subject",
            Self::InvalidSubjectName => "invalid_subject_name",
            Self::SubjectNotFound(_) => "subject_not_found",
            Self::DefaultSubjectProtected => "default_subject_protected",
            Self::MalformedImport(_) => "malformed_import",
            Self::Config(_) => "invalid_config",
            Self::Repo(_) => "repo_error",
        }
    }
}

/// Owned grade state backed by a snapshot repository.
pub struct GradeStore<R: SnapshotRepository> {
    repo: R,
    config: GradebookConfig,
    state: GradebookSnapshot,
}

impl<R: SnapshotRepository> GradeStore<R> {
    /// Opens the store, loading the snapshot saved under the configured key.
    ///
    /// A missing snapshot yields an empty store with the default subject.
    ///
    /// # Errors
    /// - `Config` when limits are inconsistent.
    /// - `Repo` when the persisted snapshot cannot be read or breaks an
    ///   invariant under the current limits.
    pub fn open(repo: R, config: GradebookConfig) -> StoreResult<Self> {
        config.validate()?;
        let state = match repo.load_snapshot(&config.storage_key)? {
            Some(snapshot) => check_snapshot(&config, snapshot)
                .map_err(|details| StoreError::Repo(RepoError::InvalidData(details)))?,
            None => GradebookSnapshot::default(),
        };

        info!(
            "event=store_open module=store status=ok grades={} subjects={} scope={:?}",
            state.grades.len(),
            state.subjects.len(),
            config.budget_scope
        );
        Ok(Self {
            repo,
            config,
            state,
        })
    }

    /// Opens the store with default limits.
    pub fn open_default(repo: R) -> StoreResult<Self> {
        Self::open(repo, GradebookConfig::default())
    }

    pub fn config(&self) -> &GradebookConfig {
        &self.config
    }

    /// Grades in insertion order.
    pub fn grades(&self) -> &[Grade] {
        &self.state.grades
    }

    pub fn subjects(&self) -> &[String] {
        &self.state.subjects
    }

    pub fn grade(&self, id: GradeId) -> Option<&Grade> {
        self.state.grades.iter().find(|grade| grade.id == id)
    }

    pub fn snapshot(&self) -> &GradebookSnapshot {
        &self.state
    }

    /// Validates and appends a new grade with a fresh ID.
    ///
    /// # Errors
    /// - `Validation` for count limit, blank name, value, weight or budget.
    /// - `UnknownSubject` when `draft.subject` is not registered.
    /// - `Repo` when persistence fails; state is unchanged.
    pub fn add_grade(&mut self, draft: GradeDraft) -> StoreResult<Grade> {
        let result = self.try_add_grade(draft);
        match &result {
            Ok(grade) => info!(
                "event=grade_add module=store status=ok grade_id={} total_weight={}",
                grade.id,
                self.total_percentage()
            ),
            Err(err) => warn!(
                "event=grade_add module=store status=rejected reason={}",
                err.code()
            ),
        }
        result
    }

    fn try_add_grade(&mut self, mut draft: GradeDraft) -> StoreResult<Grade> {
        validate_grade_count_with(&self.config, self.state.grades.len())?;
        draft.name = draft.name.trim().to_string();
        validate_name(&draft.name)?;
        validate_value_with(&self.config, draft.value)?;
        validate_weight_with(&self.config, draft.weight)?;
        self.ensure_subject_exists(&draft.subject)?;
        validate_weight_budget_with(
            &self.config,
            draft.weight,
            self.budget_peers(&draft.subject, None),
        )?;

        let grade = draft.into_grade();
        let mut next = self.state.clone();
        next.grades.push(grade.clone());
        self.commit(next)?;
        Ok(grade)
    }

    /// Merges `patch` into the grade with `id` after re-validation.
    ///
    /// The weight budget is checked against the other grades in scope,
    /// excluding the grade being updated. An empty patch is a no-op.
    pub fn update_grade(&mut self, id: GradeId, patch: GradePatch) -> StoreResult<Grade> {
        let result = self.try_update_grade(id, patch);
        match &result {
            Ok(grade) => info!(
                "event=grade_update module=store status=ok grade_id={}",
                grade.id
            ),
            Err(err) => warn!(
                "event=grade_update module=store status=rejected grade_id={} reason={}",
                id,
                err.code()
            ),
        }
        result
    }

    fn try_update_grade(&mut self, id: GradeId, mut patch: GradePatch) -> StoreResult<Grade> {
        let index = self
            .state
            .grades
            .iter()
            .position(|grade| grade.id == id)
            .ok_or(StoreError::GradeNotFound(id))?;

        if patch.is_empty() {
            return Ok(self.state.grades[index].clone());
        }

        if let Some(name) = patch.name.as_mut() {
            *name = name.trim().to_string();
            validate_name(name)?;
        }
        if let Some(value) = patch.value {
            validate_value_with(&self.config, value)?;
        }
        if let Some(weight) = patch.weight {
            validate_weight_with(&self.config, weight)?;
        }
        if let Some(subject) = patch.subject.as_deref() {
            self.ensure_subject_exists(subject)?;
        }

        let merged = self.state.grades[index].patched(&patch);
        let moves_scope =
            patch.subject.is_some() && self.config.budget_scope == BudgetScope::PerSubject;
        if patch.weight.is_some() || moves_scope {
            validate_weight_budget_with(
                &self.config,
                merged.weight,
                self.budget_peers(&merged.subject, Some(id)),
            )?;
        }

        let mut next = self.state.clone();
        next.grades[index] = merged.clone();
        self.commit(next)?;
        Ok(merged)
    }

    /// Removes the grade with `id`.
    ///
    /// Returns `Ok(false)` without writing when the grade does not exist.
    pub fn delete_grade(&mut self, id: GradeId) -> StoreResult<bool> {
        if self.grade(id).is_none() {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.grades.retain(|grade| grade.id != id);
        self.commit(next)?;
        info!("event=grade_delete module=store status=ok grade_id={id}");
        Ok(true)
    }

    /// Registers a subject. Duplicate names are suppressed.
    ///
    /// Returns `Ok(false)` without writing when the subject already exists.
    pub fn add_subject(&mut self, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidSubjectName);
        }
        if self.has_subject(name) {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.subjects.push(name.to_string());
        self.commit(next)?;
        info!(
            "event=subject_add module=store status=ok subjects={}",
            self.state.subjects.len()
        );
        Ok(true)
    }

    /// Removes a subject and every grade that references it.
    ///
    /// `name` is trimmed like in [`Self::add_subject`].
    /// Returns the number of grades removed by the cascade.
    pub fn delete_subject(&mut self, name: &str) -> StoreResult<usize> {
        let name = name.trim();
        if name == DEFAULT_SUBJECT {
            return Err(StoreError::DefaultSubjectProtected);
        }
        if !self.has_subject(name) {
            return Err(StoreError::SubjectNotFound(name.to_string()));
        }

        let mut next = self.state.clone();
        next.subjects.retain(|subject| subject != name);
        let before = next.grades.len();
        next.grades.retain(|grade| grade.subject != name);
        let removed = before - next.grades.len();
        self.commit(next)?;

        info!("event=subject_delete module=store status=ok cascaded_grades={removed}");
        Ok(removed)
    }

    /// Weighted average rounded to 2 decimals; `0.0` when nothing matches.
    pub fn calculate_average(&self, subject: Option<&str>) -> f64 {
        weighted_average(&self.state.grades, subject)
    }

    pub fn subject_stats(&self, subject: &str) -> GradeStats {
        subject_stats(&self.state.grades, subject)
    }

    /// Per-subject stats for every registered subject, best average first.
    pub fn subject_ranking(&self) -> Vec<SubjectRanking> {
        subject_ranking(&self.state.grades, &self.state.subjects)
    }

    /// Sum of weights across all grades.
    pub fn total_percentage(&self) -> f64 {
        total_weight(&self.state.grades)
    }

    /// `weight_budget - total_percentage()`.
    pub fn remaining_percentage(&self) -> f64 {
        self.config.weight_budget - self.total_percentage()
    }

    pub fn subject_percentage(&self, subject: &str) -> f64 {
        total_weight(
            self.state
                .grades
                .iter()
                .filter(|grade| grade.subject == subject),
        )
    }

    pub fn subject_remaining_percentage(&self, subject: &str) -> f64 {
        self.config.weight_budget - self.subject_percentage(subject)
    }

    /// Budget still available for a new grade in `subject`, honoring scope.
    pub fn remaining_budget_for(&self, subject: &str) -> f64 {
        self.config.weight_budget - total_weight(self.budget_peers(subject, None))
    }

    pub fn can_add_grade(&self) -> bool {
        self.state.grades.len() < self.config.max_grades
    }

    /// Grade needed on the remaining budget of `subject`'s scope to reach
    /// `target_average`.
    pub fn required_grade_for(
        &self,
        target_average: f64,
        subject: &str,
    ) -> Result<f64, SimulationError> {
        let current = round2(weighted_mean(self.budget_peers(subject, None)));
        let remaining = self.remaining_budget_for(subject);
        required_grade_with(&self.config, target_average, current, remaining)
    }

    /// Weighted average of the hypothetical grade's scope with it added.
    pub fn simulate(&self, hypothetical: &HypotheticalGrade) -> Result<f64, SimulationError> {
        simulated_average_with(
            &self.config,
            self.budget_peers(&hypothetical.subject, None),
            hypothetical,
        )
    }

    /// Serializes `{grades, subjects}` as JSON.
    pub fn export_data(&self) -> StoreResult<String> {
        serde_json::to_string(&self.state)
            .map_err(|err| StoreError::Repo(RepoError::Serialization(err)))
    }

    /// Replaces the whole state with a previously exported snapshot.
    ///
    /// Payloads that fail to parse or break an invariant are rejected and
    /// logged; prior state stays intact.
    pub fn import_data(&mut self, serialized: &str) -> StoreResult<()> {
        let parsed = serde_json::from_str::<GradebookSnapshot>(serialized)
            .map_err(|err| err.to_string())
            .and_then(|snapshot| check_snapshot(&self.config, snapshot));

        let next = match parsed {
            Ok(next) => next,
            Err(details) => {
                warn!(
                    "event=data_import module=store status=rejected reason=malformed_import payload_len={}",
                    serialized.len()
                );
                return Err(StoreError::MalformedImport(details));
            }
        };

        self.commit(next)?;
        info!(
            "event=data_import module=store status=ok grades={} subjects={}",
            self.state.grades.len(),
            self.state.subjects.len()
        );
        Ok(())
    }

    fn has_subject(&self, name: &str) -> bool {
        self.state.subjects.iter().any(|subject| subject == name)
    }

    fn ensure_subject_exists(&self, name: &str) -> StoreResult<()> {
        if self.has_subject(name) {
            Ok(())
        } else {
            Err(StoreError::UnknownSubject(name.to_string()))
        }
    }

    /// Grades sharing a weight budget with a grade in `subject`.
    fn budget_peers<'a>(
        &'a self,
        subject: &'a str,
        exclude: Option<GradeId>,
    ) -> impl Iterator<Item = &'a Grade> + 'a {
        let scope = self.config.budget_scope;
        self.state.grades.iter().filter(move |grade| {
            Some(grade.id) != exclude
                && (scope == BudgetScope::Global || grade.subject == subject)
        })
    }

    fn commit(&mut self, next: GradebookSnapshot) -> StoreResult<()> {
        if let Err(err) = self.repo.save_snapshot(&self.config.storage_key, &next) {
            warn!("event=store_persist module=store status=error error={err}");
            return Err(err.into());
        }
        self.state = next;
        Ok(())
    }
}

/// Validates a whole snapshot against `config` and normalizes it.
///
/// The default subject is re-added at the front when missing.
fn check_snapshot(
    config: &GradebookConfig,
    mut snapshot: GradebookSnapshot,
) -> Result<GradebookSnapshot, String> {
    let mut seen_subjects = HashSet::new();
    for subject in &snapshot.subjects {
        if subject.trim().is_empty() {
            return Err("subject names must not be blank".to_string());
        }
        if !seen_subjects.insert(subject.as_str()) {
            return Err(format!("duplicate subject `{subject}`"));
        }
    }
    if !seen_subjects.contains(DEFAULT_SUBJECT) {
        snapshot.subjects.insert(0, DEFAULT_SUBJECT.to_string());
    }

    if snapshot.grades.len() > config.max_grades {
        return Err(format!(
            "{} grades exceed the limit of {}",
            snapshot.grades.len(),
            config.max_grades
        ));
    }

    let mut seen_ids = HashSet::new();
    for grade in &snapshot.grades {
        if !seen_ids.insert(grade.id) {
            return Err(format!("duplicate grade id {}", grade.id));
        }
        validate_grade_fields(config, grade).map_err(|err| format!("grade {}: {err}", grade.id))?;
        if !snapshot.subjects.iter().any(|subject| *subject == grade.subject) {
            return Err(format!(
                "grade {} references unknown subject `{}`",
                grade.id, grade.subject
            ));
        }
    }

    let over_budget = match config.budget_scope {
        BudgetScope::Global => {
            total_weight(&snapshot.grades) > config.weight_budget + WEIGHT_EPSILON
        }
        BudgetScope::PerSubject => snapshot.subjects.iter().any(|subject| {
            let used = total_weight(
                snapshot
                    .grades
                    .iter()
                    .filter(|grade| grade.subject == *subject),
            );
            used > config.weight_budget + WEIGHT_EPSILON
        }),
    };
    if over_budget {
        return Err(format!(
            "total weight exceeds the budget of {}%",
            config.weight_budget
        ));
    }

    Ok(snapshot)
}
