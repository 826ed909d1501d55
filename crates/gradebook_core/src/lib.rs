//! Core domain logic for the gradebook.
//! This crate is the single source of truth for grade invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod service;
pub mod stats;
pub mod validation;

pub use config::{BudgetScope, ConfigError, GradebookConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::grade::{
    Grade, GradeDraft, GradeId, GradePatch, GradeStats, GradebookSnapshot, DEFAULT_SUBJECT,
};
pub use report::render_text_report;
pub use repo::snapshot_repo::{
    RepoError, RepoResult, SnapshotRepository, SqliteSnapshotRepository,
};
pub use service::grade_store::{GradeStore, StoreError, StoreResult};
pub use service::simulator::{
    required_grade, simulated_average, HypotheticalGrade, SimulationError,
};
pub use stats::analysis::{
    grade_distribution, grades_by_date, moving_average_trend, DistributionBucket,
    PerformanceTier, SubjectRanking, TrendPoint, DEFAULT_TREND_WINDOW,
};
pub use validation::{ValidationError, ValidationReport};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
