//! Plain-text grade report.
//!
//! # Responsibility
//! - Render grades grouped by subject with a weighted average per group.
//!
//! # Invariants
//! - Subjects appear in order of their first grade.
//! - A subject whose weights sum to 0 reports an average of `0.00`.

use crate::model::grade::Grade;
use crate::stats::weighted_mean;

const REPORT_TITLE: &str = "Grade Report";
const SECTION_RULE: &str = "------------------------";

/// Renders the human-readable report exported by the dashboard.
pub fn render_text_report(grades: &[Grade]) -> String {
    let mut subjects: Vec<&str> = Vec::new();
    for grade in grades {
        if !subjects.contains(&grade.subject.as_str()) {
            subjects.push(grade.subject.as_str());
        }
    }

    let mut report = format!("{REPORT_TITLE}\n\n");
    for subject in subjects {
        let subject_grades = grades
            .iter()
            .filter(|grade| grade.subject == subject)
            .collect::<Vec<_>>();
        report.push_str(&render_section(subject, &subject_grades));
    }

    report
}

fn render_section(subject: &str, grades: &[&Grade]) -> String {
    let mut section = format!("{subject}\n{SECTION_RULE}\n");
    for grade in grades {
        section.push_str(&format!(
            "{}: {} ({}%)\n",
            grade.name, grade.value, grade.weight
        ));
    }
    section.push_str(&format!(
        "Average: {:.2}\n\n",
        weighted_mean(grades.iter().copied())
    ));
    section
}
