//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose grade store use-cases to Dart via FRB.
//! - Flatten core errors into envelopes with a human-readable message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call opens its own connection; no store state outlives a call.
//! - Dates cross the boundary as `YYYY-MM-DD` strings, IDs as UUID strings.
//! - Store limits come from the TOML file named by `GRADEBOOK_CONFIG_PATH`,
//!   or from defaults when it is unset.

use chrono::NaiveDate;
use gradebook_core::db::open_db;
use gradebook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    grade_distribution, moving_average_trend, render_text_report, Grade, GradeDraft, GradeId,
    GradePatch, GradeStore, GradebookConfig, HypotheticalGrade, SqliteSnapshotRepository,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const STORE_DB_FILE_NAME: &str = "gradebook.sqlite3";
const DB_PATH_ENV: &str = "GRADEBOOK_DB_PATH";
const CONFIG_PATH_ENV: &str = "GRADEBOOK_CONFIG_PATH";
static STORE_LOCATION: OnceLock<StoreLocation> = OnceLock::new();

/// Where a call finds its database and, optionally, its TOML limits.
#[derive(Debug, Clone)]
struct StoreLocation {
    db_path: PathBuf,
    /// `None` opens the store with default limits.
    config_path: Option<PathBuf>,
}

type Store<'conn> = GradeStore<SqliteSnapshotRepository<'conn>>;

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Grade projection for Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeItem {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub weight: f64,
    pub subject: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// List envelope for grades and subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeListResponse {
    pub ok: bool,
    pub items: Vec<GradeItem>,
    pub subjects: Vec<String>,
    pub message: String,
}

/// Registered subjects, default subject first.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectListResponse {
    pub ok: bool,
    pub items: Vec<String>,
    pub message: String,
}

/// Generic mutation envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeActionResponse {
    pub ok: bool,
    /// Affected grade, when the action produces one.
    pub grade: Option<GradeItem>,
    pub message: String,
}

impl GradeActionResponse {
    fn success(message: impl Into<String>, grade: Option<GradeItem>) -> Self {
        Self {
            ok: true,
            grade,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            grade: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStatsItem {
    pub subject: String,
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub count: u32,
    /// `excellent|good|sufficient|at_risk`.
    pub tier: String,
}

/// Dashboard numbers in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsOverviewResponse {
    pub ok: bool,
    pub average: f64,
    pub total_percentage: f64,
    pub remaining_percentage: f64,
    pub can_add_grade: bool,
    /// Best average first.
    pub subjects: Vec<SubjectStatsItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionBucketItem {
    /// Score band such as `4.1-5.0`.
    pub label: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionResponse {
    pub ok: bool,
    /// Ascending score bands, empty bands included.
    pub buckets: Vec<DistributionBucketItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPointItem {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub value: f64,
}

/// Moving-average series in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendResponse {
    pub ok: bool,
    pub points: Vec<TrendPointItem>,
    pub message: String,
}

/// Numeric result of a what-if calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResponse {
    pub ok: bool,
    pub value: Option<f64>,
    pub message: String,
}

/// Text payload (export JSON or report).
#[derive(Debug, Clone, PartialEq)]
pub struct TextResponse {
    pub ok: bool,
    pub payload: Option<String>,
    pub message: String,
}

#[flutter_rust_bridge::frb(sync)]
pub fn grades_list() -> GradeListResponse {
    grades_list_at(resolve_store_location())
}

#[flutter_rust_bridge::frb(sync)]
pub fn grade_add(
    name: String,
    value: f64,
    weight: f64,
    subject: String,
    date: String,
) -> GradeActionResponse {
    grade_add_at(resolve_store_location(), name, value, weight, subject, date)
}

/// Applies a partial update; `None` fields are left untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn grade_update(
    grade_id: String,
    name: Option<String>,
    value: Option<f64>,
    weight: Option<f64>,
    subject: Option<String>,
    date: Option<String>,
) -> GradeActionResponse {
    let patch = GradePatchInput {
        name,
        value,
        weight,
        subject,
        date,
    };
    grade_update_at(resolve_store_location(), grade_id, patch)
}

#[flutter_rust_bridge::frb(sync)]
pub fn grade_delete(grade_id: String) -> GradeActionResponse {
    grade_delete_at(resolve_store_location(), grade_id)
}

#[flutter_rust_bridge::frb(sync)]
pub fn subjects_list() -> SubjectListResponse {
    subjects_list_at(resolve_store_location())
}

#[flutter_rust_bridge::frb(sync)]
pub fn subject_add(name: String) -> GradeActionResponse {
    subject_add_at(resolve_store_location(), name)
}

/// Deletes a subject and all of its grades.
#[flutter_rust_bridge::frb(sync)]
pub fn subject_delete(name: String) -> GradeActionResponse {
    subject_delete_at(resolve_store_location(), name)
}

#[flutter_rust_bridge::frb(sync)]
pub fn stats_overview() -> StatsOverviewResponse {
    stats_overview_at(resolve_store_location())
}

/// Grade counts per score band, optionally for one subject.
#[flutter_rust_bridge::frb(sync)]
pub fn stats_distribution(subject: Option<String>) -> DistributionResponse {
    stats_distribution_at(resolve_store_location(), subject)
}

/// Moving average over `window` grades (0 behaves as 1), optionally for one subject.
#[flutter_rust_bridge::frb(sync)]
pub fn stats_trend(window: u32, subject: Option<String>) -> TrendResponse {
    stats_trend_at(resolve_store_location(), window, subject)
}

/// Grade needed on the remaining budget of `subject` to reach `target_average`.
#[flutter_rust_bridge::frb(sync)]
pub fn simulate_required(target_average: f64, subject: String) -> SimulationResponse {
    simulate_required_at(resolve_store_location(), target_average, subject)
}

#[flutter_rust_bridge::frb(sync)]
pub fn simulate_average(subject: String, value: f64, weight: f64) -> SimulationResponse {
    let hypothetical = HypotheticalGrade {
        subject,
        value,
        weight,
    };
    simulate_average_at(resolve_store_location(), &hypothetical)
}

#[flutter_rust_bridge::frb(sync)]
pub fn data_export() -> TextResponse {
    data_export_at(resolve_store_location())
}

/// Replaces all data with an exported payload. Invalid payloads change nothing.
#[flutter_rust_bridge::frb(sync)]
pub fn data_import(payload: String) -> GradeActionResponse {
    data_import_at(resolve_store_location(), payload)
}

#[flutter_rust_bridge::frb(sync)]
pub fn report_text() -> TextResponse {
    report_text_at(resolve_store_location())
}

#[derive(Debug, Default)]
struct GradePatchInput {
    name: Option<String>,
    value: Option<f64>,
    weight: Option<f64>,
    subject: Option<String>,
    date: Option<String>,
}

fn grades_list_at(location: &StoreLocation) -> GradeListResponse {
    match with_store(location, |store| {
        Ok((
            store.grades().iter().map(to_grade_item).collect::<Vec<_>>(),
            store.subjects().to_vec(),
        ))
    }) {
        Ok((items, subjects)) => GradeListResponse {
            ok: true,
            message: format!("Loaded {} grade(s).", items.len()),
            items,
            subjects,
        },
        Err(err) => GradeListResponse {
            ok: false,
            items: Vec::new(),
            subjects: Vec::new(),
            message: format!("grades_list failed: {err}"),
        },
    }
}

fn subjects_list_at(location: &StoreLocation) -> SubjectListResponse {
    match with_store(location, |store| Ok(store.subjects().to_vec())) {
        Ok(items) => SubjectListResponse {
            ok: true,
            message: format!("Loaded {} subject(s).", items.len()),
            items,
        },
        Err(err) => SubjectListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("subjects_list failed: {err}"),
        },
    }
}

fn grade_add_at(
    location: &StoreLocation,
    name: String,
    value: f64,
    weight: f64,
    subject: String,
    date: String,
) -> GradeActionResponse {
    let result = parse_date(&date).and_then(|date| {
        let draft = GradeDraft::new(name, value, weight, subject.trim(), date);
        with_store(location, |store| {
            store.add_grade(draft).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(grade) => GradeActionResponse::success("Grade added.", Some(to_grade_item(&grade))),
        Err(err) => GradeActionResponse::failure(format!("grade_add failed: {err}")),
    }
}

fn grade_update_at(
    location: &StoreLocation,
    grade_id: String,
    input: GradePatchInput,
) -> GradeActionResponse {
    let result = parse_grade_id(&grade_id).and_then(|id| {
        let date = input.date.as_deref().map(parse_date).transpose()?;
        let patch = GradePatch {
            name: input.name,
            value: input.value,
            weight: input.weight,
            subject: input.subject.map(|subject| subject.trim().to_string()),
            date,
        };
        with_store(location, |store| {
            store.update_grade(id, patch).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(grade) => GradeActionResponse::success("Grade updated.", Some(to_grade_item(&grade))),
        Err(err) => GradeActionResponse::failure(format!("grade_update failed: {err}")),
    }
}

fn grade_delete_at(location: &StoreLocation, grade_id: String) -> GradeActionResponse {
    let result = parse_grade_id(&grade_id).and_then(|id| {
        with_store(location, |store| {
            store.delete_grade(id).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(true) => GradeActionResponse::success("Grade deleted.", None),
        Ok(false) => GradeActionResponse::success("Grade already absent.", None),
        Err(err) => GradeActionResponse::failure(format!("grade_delete failed: {err}")),
    }
}

fn subject_add_at(location: &StoreLocation, name: String) -> GradeActionResponse {
    match with_store(location, |store| {
        store.add_subject(&name).map_err(|err| err.to_string())
    }) {
        Ok(true) => GradeActionResponse::success("Subject added.", None),
        Ok(false) => GradeActionResponse::success("Subject already exists.", None),
        Err(err) => GradeActionResponse::failure(format!("subject_add failed: {err}")),
    }
}

fn subject_delete_at(location: &StoreLocation, name: String) -> GradeActionResponse {
    match with_store(location, |store| {
        store.delete_subject(&name).map_err(|err| err.to_string())
    }) {
        Ok(removed) => GradeActionResponse::success(
            format!("Subject deleted with {removed} grade(s)."),
            None,
        ),
        Err(err) => GradeActionResponse::failure(format!("subject_delete failed: {err}")),
    }
}

fn stats_overview_at(location: &StoreLocation) -> StatsOverviewResponse {
    let result = with_store(location, |store| {
        let subjects = store
            .subject_ranking()
            .into_iter()
            .map(|ranking| SubjectStatsItem {
                subject: ranking.subject,
                average: ranking.stats.average,
                highest: ranking.stats.highest,
                lowest: ranking.stats.lowest,
                count: u32::try_from(ranking.stats.count).unwrap_or(u32::MAX),
                tier: ranking.tier.as_str().to_string(),
            })
            .collect::<Vec<_>>();
        Ok(StatsOverviewResponse {
            ok: true,
            average: store.calculate_average(None),
            total_percentage: store.total_percentage(),
            remaining_percentage: store.remaining_percentage(),
            can_add_grade: store.can_add_grade(),
            subjects,
            message: String::new(),
        })
    });
    result.unwrap_or_else(|err| StatsOverviewResponse {
        ok: false,
        average: 0.0,
        total_percentage: 0.0,
        remaining_percentage: 0.0,
        can_add_grade: false,
        subjects: Vec::new(),
        message: format!("stats_overview failed: {err}"),
    })
}

fn stats_distribution_at(
    location: &StoreLocation,
    subject: Option<String>,
) -> DistributionResponse {
    let result = with_store(location, |store| {
        let grades = grades_in(store.grades(), subject.as_deref());
        Ok(grade_distribution(&grades)
            .into_iter()
            .map(|bucket| DistributionBucketItem {
                label: bucket.label,
                count: u32::try_from(bucket.count).unwrap_or(u32::MAX),
                percentage: bucket.percentage,
            })
            .collect::<Vec<_>>())
    });
    match result {
        Ok(buckets) => DistributionResponse {
            ok: true,
            buckets,
            message: String::new(),
        },
        Err(err) => DistributionResponse {
            ok: false,
            buckets: Vec::new(),
            message: format!("stats_distribution failed: {err}"),
        },
    }
}

fn stats_trend_at(location: &StoreLocation, window: u32, subject: Option<String>) -> TrendResponse {
    let result = with_store(location, |store| {
        let grades = grades_in(store.grades(), subject.as_deref());
        let window = usize::try_from(window).unwrap_or(usize::MAX);
        Ok(moving_average_trend(&grades, window)
            .into_iter()
            .map(|point| TrendPointItem {
                date: point.date.format("%Y-%m-%d").to_string(),
                value: point.value,
            })
            .collect::<Vec<_>>())
    });
    match result {
        Ok(points) => TrendResponse {
            ok: true,
            message: format!("{} point(s).", points.len()),
            points,
        },
        Err(err) => TrendResponse {
            ok: false,
            points: Vec::new(),
            message: format!("stats_trend failed: {err}"),
        },
    }
}

fn simulate_required_at(
    location: &StoreLocation,
    target_average: f64,
    subject: String,
) -> SimulationResponse {
    to_simulation_response(with_store(location, |store| {
        store
            .required_grade_for(target_average, subject.trim())
            .map_err(|err| err.to_string())
    }))
}

fn simulate_average_at(
    location: &StoreLocation,
    hypothetical: &HypotheticalGrade,
) -> SimulationResponse {
    to_simulation_response(with_store(location, |store| {
        store.simulate(hypothetical).map_err(|err| err.to_string())
    }))
}

fn data_export_at(location: &StoreLocation) -> TextResponse {
    to_text_response(with_store(location, |store| {
        store.export_data().map_err(|err| err.to_string())
    }))
}

fn data_import_at(location: &StoreLocation, payload: String) -> GradeActionResponse {
    match with_store(location, |store| {
        store.import_data(&payload).map_err(|err| err.to_string())
    }) {
        Ok(()) => GradeActionResponse::success("Data imported.", None),
        Err(err) => GradeActionResponse::failure(format!("data_import failed: {err}")),
    }
}

fn report_text_at(location: &StoreLocation) -> TextResponse {
    to_text_response(with_store(location, |store| {
        Ok(render_text_report(store.grades()))
    }))
}

fn grades_in(grades: &[Grade], subject: Option<&str>) -> Vec<Grade> {
    let subject = subject.map(str::trim).filter(|name| !name.is_empty());
    grades
        .iter()
        .filter(|grade| subject.map_or(true, |name| grade.subject == name))
        .cloned()
        .collect()
}

fn to_simulation_response(result: Result<f64, String>) -> SimulationResponse {
    match result {
        Ok(value) => SimulationResponse {
            ok: true,
            value: Some(value),
            message: format!("{value:.1}"),
        },
        Err(message) => SimulationResponse {
            ok: false,
            value: None,
            message,
        },
    }
}

fn to_text_response(result: Result<String, String>) -> TextResponse {
    match result {
        Ok(payload) => TextResponse {
            ok: true,
            payload: Some(payload),
            message: String::new(),
        },
        Err(message) => TextResponse {
            ok: false,
            payload: None,
            message,
        },
    }
}

fn resolve_store_location() -> &'static StoreLocation {
    STORE_LOCATION.get_or_init(|| StoreLocation {
        db_path: env_path(DB_PATH_ENV)
            .unwrap_or_else(|| std::env::temp_dir().join(STORE_DB_FILE_NAME)),
        config_path: env_path(CONFIG_PATH_ENV),
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn load_config(location: &StoreLocation) -> Result<GradebookConfig, String> {
    match &location.config_path {
        Some(path) => GradebookConfig::load(path).map_err(|err| {
            warn!("event=ffi_config_load module=ffi status=error error={err}");
            format!("config `{}` invalid: {err}", path.display())
        }),
        None => Ok(GradebookConfig::default()),
    }
}

fn with_store<T>(
    location: &StoreLocation,
    f: impl FnOnce(&mut Store<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let config = load_config(location)?;
    let conn =
        open_db(&location.db_path).map_err(|err| format!("store DB open failed: {err}"))?;
    let repo = SqliteSnapshotRepository::try_new(&conn)
        .map_err(|err| format!("store repo init failed: {err}"))?;
    let mut store = GradeStore::open(repo, config).map_err(|err| {
        warn!("event=ffi_store_open module=ffi status=error error={err}");
        format!("store open failed: {err}")
    })?;
    f(&mut store)
}

fn parse_grade_id(raw: &str) -> Result<GradeId, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid grade id `{raw}`"))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    raw.trim()
        .parse::<NaiveDate>()
        .map_err(|_| format!("invalid date `{raw}`; expected YYYY-MM-DD"))
}

fn to_grade_item(grade: &Grade) -> GradeItem {
    GradeItem {
        id: grade.id.to_string(),
        name: grade.name.clone(),
        value: grade.value,
        weight: grade.weight,
        subject: grade.subject.clone(),
        date: grade.date.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, data_export_at, data_import_at, grade_add_at, grade_delete_at,
        grade_update_at, grades_list_at, init_logging, ping, report_text_at,
        simulate_average_at, simulate_required_at, stats_distribution_at, stats_overview_at,
        stats_trend_at, subject_add_at, subject_delete_at, subjects_list_at, GradePatchInput,
        StoreLocation,
    };
    use gradebook_core::HypotheticalGrade;
    use rusqlite::Connection;

    fn temp_db() -> (tempfile::TempDir, StoreLocation) {
        let dir = tempfile::tempdir().expect("tempdir");
        let location = StoreLocation {
            db_path: dir.path().join("gradebook.sqlite3"),
            config_path: None,
        };
        (dir, location)
    }

    fn temp_db_with_config(toml: &str) -> (tempfile::TempDir, StoreLocation) {
        let (dir, mut location) = temp_db();
        let config_path = dir.path().join("gradebook.toml");
        std::fs::write(&config_path, toml).expect("write config");
        location.config_path = Some(config_path);
        (dir, location)
    }

    fn add(
        location: &StoreLocation,
        name: &str,
        value: f64,
        weight: f64,
        subject: &str,
        date: &str,
    ) {
        let response = grade_add_at(
            location,
            name.to_string(),
            value,
            weight,
            subject.to_string(),
            date.to_string(),
        );
        assert!(response.ok, "{}", response.message);
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_dir_and_bad_level() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn grade_add_persists_and_lists() {
        let (_dir, path) = temp_db();
        let added = grade_add_at(
            &path,
            "Midterm".to_string(),
            5.5,
            40.0,
            "General".to_string(),
            "2024-04-01".to_string(),
        );
        assert!(added.ok, "{}", added.message);
        let item = added.grade.expect("added grade");
        assert_eq!(item.date, "2024-04-01");

        let listed = grades_list_at(&path);
        assert_eq!(listed.items, vec![item]);
        assert_eq!(listed.subjects, vec!["General".to_string()]);

        let conn = Connection::open(&path.db_path).expect("open db");
        let payload: String = conn
            .query_row(
                "SELECT payload FROM app_state WHERE storage_key = 'grade-storage'",
                [],
                |row| row.get(0),
            )
            .expect("stored snapshot");
        assert!(payload.contains("Midterm"));
    }

    #[test]
    fn grade_add_rejects_bad_date_and_over_budget() {
        let (_dir, path) = temp_db();
        let bad_date = grade_add_at(
            &path,
            "Quiz".to_string(),
            5.0,
            10.0,
            "General".to_string(),
            "04/01/2024".to_string(),
        );
        assert!(!bad_date.ok);
        assert!(bad_date.message.contains("YYYY-MM-DD"));

        let heavy = grade_add_at(
            &path,
            "Final".to_string(),
            5.0,
            101.0,
            "General".to_string(),
            "2024-04-01".to_string(),
        );
        assert!(!heavy.ok);
        assert!(grades_list_at(&path).items.is_empty());
    }

    #[test]
    fn grade_update_and_delete_round_trip() {
        let (_dir, path) = temp_db();
        let added = grade_add_at(
            &path,
            "Lab".to_string(),
            4.0,
            20.0,
            "General".to_string(),
            "2024-04-02".to_string(),
        );
        let id = added.grade.expect("added grade").id;

        let patch = GradePatchInput {
            value: Some(6.0),
            date: Some("2024-05-02".to_string()),
            ..GradePatchInput::default()
        };
        let updated = grade_update_at(&path, id.clone(), patch);
        assert!(updated.ok, "{}", updated.message);
        let item = updated.grade.expect("updated grade");
        assert_eq!(item.value, 6.0);
        assert_eq!(item.date, "2024-05-02");

        let deleted = grade_delete_at(&path, id.clone());
        assert!(deleted.ok);
        assert_eq!(grade_delete_at(&path, id).message, "Grade already absent.");
        assert!(!grade_delete_at(&path, "not-a-uuid".to_string()).ok);
    }

    #[test]
    fn subject_delete_cascades_and_protects_default() {
        let (_dir, path) = temp_db();
        assert!(subject_add_at(&path, "Math".to_string()).ok);
        assert_eq!(
            subject_add_at(&path, "Math".to_string()).message,
            "Subject already exists."
        );
        grade_add_at(
            &path,
            "Quiz".to_string(),
            5.0,
            10.0,
            "Math".to_string(),
            "2024-04-03".to_string(),
        );

        let deleted = subject_delete_at(&path, "Math".to_string());
        assert!(deleted.ok);
        assert_eq!(deleted.message, "Subject deleted with 1 grade(s).");
        assert!(!subject_delete_at(&path, "General".to_string()).ok);

        assert!(subject_add_at(&path, "Art".to_string()).ok);
        let padded = subject_delete_at(&path, " Art ".to_string());
        assert!(padded.ok, "{}", padded.message);

        let subjects = subjects_list_at(&path);
        assert!(subjects.ok);
        assert_eq!(subjects.items, vec!["General".to_string()]);
    }

    #[test]
    fn stats_and_simulation_reflect_store() {
        let (_dir, path) = temp_db();
        grade_add_at(
            &path,
            "A".to_string(),
            4.0,
            50.0,
            "General".to_string(),
            "2024-04-04".to_string(),
        );

        let stats = stats_overview_at(&path);
        assert!(stats.ok);
        assert_eq!(stats.average, 4.0);
        assert_eq!(stats.remaining_percentage, 50.0);
        assert!(stats.can_add_grade);
        assert_eq!(stats.subjects[0].tier, "sufficient");

        let required = simulate_required_at(&path, 5.0, "General".to_string());
        assert_eq!(required.value, Some(6.0));
        assert_eq!(required.message, "6.0");

        let hypothetical = HypotheticalGrade {
            subject: "General".to_string(),
            value: 7.0,
            weight: 60.0,
        };
        let simulated = simulate_average_at(&path, &hypothetical);
        assert!(!simulated.ok);
        assert!(simulated.value.is_none());
    }

    #[test]
    fn export_import_and_report() {
        let (_dir, source) = temp_db();
        grade_add_at(
            &source,
            "Essay".to_string(),
            6.0,
            30.0,
            "General".to_string(),
            "2024-04-05".to_string(),
        );
        let exported = data_export_at(&source).payload.expect("export payload");

        let (_other_dir, target) = temp_db();
        assert!(data_import_at(&target, exported).ok);
        assert_eq!(grades_list_at(&target).items.len(), 1);
        assert!(!data_import_at(&target, "garbage".to_string()).ok);
        assert_eq!(grades_list_at(&target).items.len(), 1);

        let report = report_text_at(&target).payload.expect("report payload");
        assert!(report.contains("Essay: 6 (30%)"));
    }

    #[test]
    fn distribution_and_trend_cover_store_grades() {
        let (_dir, path) = temp_db();
        assert!(subject_add_at(&path, "Math".to_string()).ok);
        add(&path, "Essay", 3.5, 20.0, "General", "2024-05-01");
        add(&path, "Lab", 5.0, 20.0, "Math", "2024-05-02");
        add(&path, "Quiz", 6.5, 20.0, "Math", "2024-05-03");

        let distribution = stats_distribution_at(&path, None);
        assert!(distribution.ok);
        assert_eq!(distribution.buckets.len(), 6);
        assert_eq!(distribution.buckets.iter().map(|b| b.count).sum::<u32>(), 3);
        let math_only = stats_distribution_at(&path, Some("Math".to_string()));
        assert_eq!(math_only.buckets.iter().map(|b| b.count).sum::<u32>(), 2);

        let trend = stats_trend_at(&path, 3, None);
        assert!(trend.ok);
        assert_eq!(
            trend.points.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![3.5, 4.25, 5.0]
        );
        assert_eq!(trend.points[0].date, "2024-05-01");

        let math_trend = stats_trend_at(&path, 0, Some(" Math ".to_string()));
        assert_eq!(
            math_trend.points.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![5.0, 6.5]
        );
    }

    #[test]
    fn config_file_selects_per_subject_budget() {
        let (_dir, path) = temp_db_with_config("budget_scope = \"per_subject\"\n");
        assert!(subject_add_at(&path, "Math".to_string()).ok);
        add(&path, "G", 5.0, 100.0, "General", "2024-06-01");
        add(&path, "M", 5.0, 100.0, "Math", "2024-06-02");

        let stats = stats_overview_at(&path);
        assert!(stats.ok);
        assert_eq!(stats.total_percentage, 200.0);

        let (_default_dir, default_path) = temp_db();
        add(&default_path, "G", 5.0, 100.0, "General", "2024-06-01");
        assert!(subject_add_at(&default_path, "Math".to_string()).ok);
        let rejected = grade_add_at(
            &default_path,
            "M".to_string(),
            5.0,
            1.0,
            "Math".to_string(),
            "2024-06-02".to_string(),
        );
        assert!(!rejected.ok);
    }

    #[test]
    fn invalid_config_file_fails_every_call_without_panicking() {
        let (_dir, path) = temp_db_with_config("max_grades = 0\n");
        let listed = grades_list_at(&path);
        assert!(!listed.ok);
        assert!(listed.message.contains("config"));
        assert!(!stats_trend_at(&path, 3, None).ok);
    }

    #[test]
    fn non_finite_target_is_rejected() {
        let (_dir, path) = temp_db();
        add(&path, "A", 4.0, 50.0, "General", "2024-04-04");

        let response = simulate_required_at(&path, f64::NAN, "General".to_string());
        assert!(!response.ok);
        assert!(response.value.is_none());
    }
}
