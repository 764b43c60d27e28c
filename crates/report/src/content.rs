//! CSV content builders for the daily report attachments.

use classtrack_db::models::report::{StudentProgressRow, SubjectBreakdownRow};

/// Quote a CSV field when it contains a comma, quote, or newline.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Two-decimal rendering for nullable averages; empty cell when absent.
fn fmt_avg(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Build the per-student progress report.
pub fn student_progress_csv(rows: &[StudentProgressRow]) -> String {
    let mut csv = String::from(
        "Student ID,Student Name,Branch,Total Assessments,Average Score,Average Percentage,Last Assessment\n",
    );
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.student_id,
            escape_csv(&row.student_name),
            escape_csv(row.branch.as_deref().unwrap_or("")),
            row.total_assessments,
            fmt_avg(row.average_score),
            fmt_avg(row.average_percentage),
            row.last_assessment
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ));
    }
    csv
}

/// Build the per-subject analytics report.
pub fn subject_breakdown_csv(rows: &[SubjectBreakdownRow]) -> String {
    let mut csv = String::from("Subject,Attempts,Average Score,Average Percentage\n");
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            escape_csv(&row.subject),
            row.attempts,
            fmt_avg(row.average_score),
            fmt_avg(row.average_percentage),
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    // -- escaping -------------------------------------------------------------

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(escape_csv("Mathematics"), "Mathematics");
    }

    #[test]
    fn commas_force_quoting() {
        assert_eq!(escape_csv("Reddy, Anil"), "\"Reddy, Anil\"");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(escape_csv("the \"best\""), "\"the \"\"best\"\"\"");
    }

    // -- student progress -----------------------------------------------------

    #[test]
    fn student_progress_includes_header_and_rows() {
        let rows = vec![StudentProgressRow {
            student_id: 7,
            student_name: "Priya Sharma".to_string(),
            branch: Some("CSE".to_string()),
            total_assessments: 4,
            average_score: Some(78.5),
            average_percentage: Some(78.5),
            last_assessment: NaiveDate::from_ymd_opt(2025, 6, 10),
        }];

        let csv = student_progress_csv(&rows);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Student ID,Student Name"));
        assert_eq!(lines.next().unwrap(), "7,Priya Sharma,CSE,4,78.50,78.50,2025-06-10");
    }

    #[test]
    fn student_without_marks_renders_empty_cells() {
        let rows = vec![StudentProgressRow {
            student_id: 9,
            student_name: "New Admit".to_string(),
            branch: None,
            total_assessments: 0,
            average_score: None,
            average_percentage: None,
            last_assessment: None,
        }];

        let csv = student_progress_csv(&rows);
        assert!(csv.lines().nth(1).unwrap().ends_with("0,,,"));
    }

    // -- subject breakdown ----------------------------------------------------

    #[test]
    fn subject_breakdown_includes_header_and_rows() {
        let rows = vec![SubjectBreakdownRow {
            subject: "Physics".to_string(),
            attempts: 12,
            average_score: Some(64.25),
            average_percentage: Some(64.25),
        }];

        let csv = subject_breakdown_csv(&rows);
        assert_eq!(
            csv,
            "Subject,Attempts,Average Score,Average Percentage\nPhysics,12,64.25,64.25\n"
        );
    }
}
