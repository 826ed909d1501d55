//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `gradebook_core` linkage.
//! - Print the text report of an existing database when a path is given.

use gradebook_core::db::open_db;
use gradebook_core::{render_text_report, GradeStore, SqliteSnapshotRepository};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("gradebook_core ping={}", gradebook_core::ping());
    println!("gradebook_core version={}", gradebook_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match report_for(Path::new(&db_path)) {
        Ok(report) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("gradebook report failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn report_for(db_path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let repo = SqliteSnapshotRepository::try_new(&conn)?;
    let store = GradeStore::open_default(repo)?;
    Ok(render_text_report(store.grades()))
}
