//! Store configuration.
//!
//! # Responsibility
//! - Hold the limits the store and validators enforce.
//! - Load overrides from TOML with defaults for every missing key.
//!
//! # Invariants
//! - `min_value < max_value`, `weight_budget > 0`, `max_grades > 0`.
//! - `storage_key` is never blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Fixed key the snapshot is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "grade-storage";
pub const DEFAULT_MAX_GRADES: usize = 10;
pub const DEFAULT_WEIGHT_BUDGET: f64 = 100.0;
pub const DEFAULT_MIN_VALUE: f64 = 1.0;
pub const DEFAULT_MAX_VALUE: f64 = 7.0;

/// Which grades share one weight budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// One budget across every grade regardless of subject.
    #[default]
    Global,
    /// Each subject owns an independent budget.
    PerSubject,
}

/// Limits applied by validation and the grade store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradebookConfig {
    pub storage_key: String,
    pub max_grades: usize,
    pub weight_budget: f64,
    pub budget_scope: BudgetScope,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for GradebookConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_grades: DEFAULT_MAX_GRADES,
            weight_budget: DEFAULT_WEIGHT_BUDGET,
            budget_scope: BudgetScope::Global,
            min_value: DEFAULT_MIN_VALUE,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl GradebookConfig {
    /// Same limits with a per-subject weight budget.
    pub fn per_subject() -> Self {
        Self {
            budget_scope: BudgetScope::PerSubject,
            ..Self::default()
        }
    }

    /// Parses TOML, filling missing keys from defaults.
    ///
    /// # Errors
    /// - Returns `Parse` for malformed TOML.
    /// - Returns `Invalid` when limits are inconsistent.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Checks limit consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage_key must not be blank".to_string(),
            ));
        }
        if self.max_grades == 0 {
            return Err(ConfigError::Invalid(
                "max_grades must be greater than 0".to_string(),
            ));
        }
        if !(self.weight_budget.is_finite() && self.weight_budget > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "weight_budget must be a positive number, got {}",
                self.weight_budget
            )));
        }
        if !(self.min_value.is_finite()
            && self.max_value.is_finite()
            && self.min_value < self.max_value)
        {
            return Err(ConfigError::Invalid(format!(
                "value range [{}, {}] is empty",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }
}
