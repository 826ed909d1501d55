use chrono::NaiveDate;
use gradebook_core::db::open_db_in_memory;
use gradebook_core::{
    GradeDraft, GradeStore, SqliteSnapshotRepository, StoreError, DEFAULT_SUBJECT,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn open_store(conn: &Connection) -> GradeStore<SqliteSnapshotRepository<'_>> {
    let repo = SqliteSnapshotRepository::try_new(conn).unwrap();
    GradeStore::open_default(repo).unwrap()
}

fn draft(name: &str, value: f64, weight: f64, subject: &str) -> GradeDraft {
    let date = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
    GradeDraft::new(name, value, weight, subject, date)
}

#[test]
fn add_subject_suppresses_duplicates() {
    let conn = setup();
    let mut store = open_store(&conn);

    assert!(store.add_subject("Math").unwrap());
    assert!(!store.add_subject("Math").unwrap());
    assert!(!store.add_subject("  Math ").unwrap());
    assert!(!store.add_subject(DEFAULT_SUBJECT).unwrap());
    assert_eq!(store.subjects(), ["General".to_string(), "Math".to_string()]);
}

#[test]
fn add_subject_rejects_blank_names() {
    let conn = setup();
    let mut store = open_store(&conn);

    let err = store.add_subject("   ").unwrap_err();
    assert!(matches!(err, StoreError::InvalidSubjectName));
}

#[test]
fn delete_subject_cascades_to_grades() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_subject("Math").unwrap();
    store.add_grade(draft("M1", 5.0, 20.0, "Math")).unwrap();
    store.add_grade(draft("M2", 6.0, 20.0, "Math")).unwrap();
    store.add_grade(draft("G1", 4.0, 20.0, "General")).unwrap();

    let removed = store.delete_subject("Math").unwrap();
    assert_eq!(removed, 2);
    assert!(store.grades().iter().all(|grade| grade.subject != "Math"));
    assert!(!store.subjects().contains(&"Math".to_string()));
    assert_eq!(store.grades().len(), 1);

    let reopened = open_store(&conn);
    assert_eq!(reopened.subjects(), [DEFAULT_SUBJECT.to_string()]);
}

#[test]
fn default_subject_cannot_be_deleted() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_grade(draft("G1", 4.0, 20.0, "General")).unwrap();

    let err = store.delete_subject(DEFAULT_SUBJECT).unwrap_err();
    assert!(matches!(err, StoreError::DefaultSubjectProtected));
    assert_eq!(store.grades().len(), 1);
}

#[test]
fn delete_subject_trims_name_like_add_subject() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_subject("Math").unwrap();
    store.add_grade(draft("M1", 5.0, 20.0, "Math")).unwrap();

    assert_eq!(store.delete_subject("  Math ").unwrap(), 1);
    assert_eq!(store.subjects(), [DEFAULT_SUBJECT.to_string()]);
    assert!(matches!(
        store.delete_subject(" General "),
        Err(StoreError::DefaultSubjectProtected)
    ));
}

#[test]
fn delete_unknown_subject_returns_not_found() {
    let conn = setup();
    let mut store = open_store(&conn);

    let err = store.delete_subject("Chemistry").unwrap_err();
    assert!(matches!(err, StoreError::SubjectNotFound(name) if name == "Chemistry"));
}

#[test]
fn export_then_import_reproduces_state() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_subject("Math").unwrap();
    store.add_grade(draft("M1", 5.5, 30.0, "Math")).unwrap();
    store.add_grade(draft("G1", 4.5, 20.0, "General")).unwrap();
    let exported = store.export_data().unwrap();
    let original = store.snapshot().clone();

    let other_conn = setup();
    let mut other = open_store(&other_conn);
    other.import_data(&exported).unwrap();
    assert_eq!(other.snapshot(), &original);

    let reopened = open_store(&other_conn);
    assert_eq!(reopened.snapshot(), &original);
}

#[test]
fn export_then_import_keeps_full_precision_floats() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_subject("Math").unwrap();
    let values = [
        1.0 + 6.0 * 0.123456789012345678,
        1.0 + 6.0 * 0.987654321098765432,
        7.0 / 3.0,
        2.0_f64.sqrt() * 3.0,
    ];
    for (index, value) in values.iter().enumerate() {
        let subject = if index % 2 == 0 { "Math" } else { "General" };
        store
            .add_grade(draft(&format!("G{index}"), *value, 100.0 / 7.0, subject))
            .unwrap();
    }
    let original = store.snapshot().clone();

    let other_conn = setup();
    let mut other = open_store(&other_conn);
    other.import_data(&store.export_data().unwrap()).unwrap();

    for (imported, expected) in other.grades().iter().zip(&original.grades) {
        assert_eq!(imported.value.to_bits(), expected.value.to_bits());
        assert_eq!(imported.weight.to_bits(), expected.weight.to_bits());
    }
    assert_eq!(other.snapshot(), &original);
}

#[test]
fn export_payload_has_grades_and_subjects_keys() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_grade(draft("G1", 4.5, 20.0, "General")).unwrap();

    let json: serde_json::Value = serde_json::from_str(&store.export_data().unwrap()).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(json["grades"][0]["date"], "2024-08-20");
    assert_eq!(json["subjects"][0], "General");
}

#[test]
fn malformed_import_leaves_state_intact() {
    let conn = setup();
    let mut store = open_store(&conn);
    store.add_grade(draft("Kept", 5.0, 50.0, "General")).unwrap();
    let before = store.snapshot().clone();

    let err = store.import_data("{\"grades\": [").unwrap_err();
    assert!(matches!(err, StoreError::MalformedImport(_)));
    assert_eq!(store.snapshot(), &before);
}

#[test]
fn import_rejects_snapshots_that_break_invariants() {
    let conn = setup();
    let mut store = open_store(&conn);
    let before = store.snapshot().clone();

    let over_budget = r#"{
        "grades": [
            {"id": "7d3c8d2e-2b8a-4c62-9a57-1d8f0c7c0b01", "name": "A", "value": 5.0,
             "weight": 70.0, "subject": "General", "date": "2024-01-10"},
            {"id": "7d3c8d2e-2b8a-4c62-9a57-1d8f0c7c0b02", "name": "B", "value": 5.0,
             "weight": 40.0, "subject": "General", "date": "2024-01-11"}
        ],
        "subjects": ["General"]
    }"#;
    assert!(matches!(
        store.import_data(over_budget),
        Err(StoreError::MalformedImport(_))
    ));

    let bad_value = r#"{
        "grades": [
            {"id": "7d3c8d2e-2b8a-4c62-9a57-1d8f0c7c0b03", "name": "A", "value": 8.0,
             "weight": 10.0, "subject": "General", "date": "2024-01-10"}
        ],
        "subjects": ["General"]
    }"#;
    assert!(store.import_data(bad_value).is_err());

    let unknown_subject = r#"{
        "grades": [
            {"id": "7d3c8d2e-2b8a-4c62-9a57-1d8f0c7c0b04", "name": "A", "value": 5.0,
             "weight": 10.0, "subject": "Ghost", "date": "2024-01-10"}
        ],
        "subjects": ["General"]
    }"#;
    assert!(store.import_data(unknown_subject).is_err());

    let duplicate_subjects = r#"{"grades": [], "subjects": ["General", "Math", "Math"]}"#;
    assert!(store.import_data(duplicate_subjects).is_err());

    assert_eq!(store.snapshot(), &before);
}

#[test]
fn import_restores_missing_default_subject() {
    let conn = setup();
    let mut store = open_store(&conn);

    store
        .import_data(r#"{"grades": [], "subjects": ["Math"]}"#)
        .unwrap();
    assert_eq!(store.subjects(), ["General".to_string(), "Math".to_string()]);
}
