//! Markdown summary of vetted candidates. Written for people; never read
//! back.

use crate::error::CoreError;
use crate::error::Result;
use crate::vetting::IssueCandidate;
use chrono::DateTime;
use chrono::Utc;
use std::cmp::Reverse;
use std::fmt::Write as _;
use std::path::Path;

pub const REPORT_FILENAME: &str = "issue-report.md";

pub fn render_report(candidates: &[IssueCandidate], now: DateTime<Utc>) -> String {
    let mut rows: Vec<&IssueCandidate> = candidates.iter().collect();
    rows.sort_by(|a, b| {
        (Reverse(a.viability_score), &a.issue.url).cmp(&(Reverse(b.viability_score), &b.issue.url))
    });

    let mut out = String::new();
    let _ = writeln!(out, "# Issue candidates");
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated {}.", now.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);
    if rows.is_empty() {
        let _ = writeln!(out, "No candidates found.");
        return out;
    }
    let _ = writeln!(
        out,
        "| Score | Repository | Issue | Title | Labels | Updated | Recommendation |"
    );
    let _ = writeln!(out, "|---:|---|---|---|---|---|---|");
    for candidate in rows {
        let issue = &candidate.issue;
        let _ = writeln!(
            out,
            "| {} | {} | [#{}]({}) | {} | {} | {} | {} |",
            candidate.viability_score,
            issue.repo,
            issue.number,
            issue.url,
            escape_cell(&issue.title),
            escape_cell(&issue.labels.join(", ")),
            issue.updated_at.format("%Y-%m-%d"),
            candidate.recommendation.as_str(),
        );
    }
    out
}

pub fn write_report(path: &Path, candidates: &[IssueCandidate], now: DateTime<Utc>) -> Result<()> {
    let report_error = |source| CoreError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(report_error)?;
    }
    std::fs::write(path, render_report(candidates, now)).map_err(report_error)
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::candidate;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 30, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn rows_are_sorted_by_viability() {
        let low = candidate("octo/widgets", 1, 40);
        let mut high = candidate("acme/tools", 2, 90);
        high.issue.title = "Fix | pipe".to_string();
        let report = render_report(&[low, high], now());
        let rows: Vec<&str> = report.lines().filter(|line| line.starts_with("| 9") || line.starts_with("| 4")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("| 90 | acme/tools | [#2](https://github.com/acme/tools/issues/2) | Fix \\| pipe |"));
        assert!(rows[1].starts_with("| 40 | octo/widgets |"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = render_report(&[], now());
        assert!(report.contains("No candidates found."));
        assert!(report.starts_with("# Issue candidates\n\nGenerated 2026-09-01 08:30 UTC."));
    }

    #[test]
    fn write_report_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join(REPORT_FILENAME);
        write_report(&path, &[candidate("octo/widgets", 3, 70)], now()).expect("write");
        let written = std::fs::read_to_string(&path).expect("read");
        assert_eq!(written.lines().filter(|line| line.starts_with("| 70 ")).count(), 1);
    }
}
