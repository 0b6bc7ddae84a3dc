use ossmate_core::IssueCandidate;
use ossmate_core::ItemFailure;
use ossmate_core::Recommendation;
use ossmate_core::SearchReport;
use ossmate_core::SyncReport;
use ossmate_state::EventStats;
use ossmate_state::PrStatus;
use ossmate_state::RepoScore;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use supports_color::Stream;

pub(crate) fn stderr_supports_color() -> bool {
    supports_color::on_cached(Stream::Stderr).is_some()
}

fn stdout_supports_color() -> bool {
    supports_color::on_cached(Stream::Stdout).is_some()
}

/// Writes results to stdout as pretty JSON or as text.
pub(crate) struct Printer {
    json: bool,
}

impl Printer {
    pub(crate) fn new(json: bool) -> Self {
        Self { json }
    }

    pub(crate) fn print<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> anyhow::Result<()> {
        let rendered = if self.json {
            serde_json::to_string_pretty(value)?
        } else {
            text(value)
        };
        println!("{rendered}");
        Ok(())
    }
}

fn paint_status(status: PrStatus) -> String {
    let label = status.to_string();
    if !stdout_supports_color() {
        return label;
    }
    match status {
        PrStatus::NeedsResponse | PrStatus::FailingCi | PrStatus::MergeConflict => {
            label.red().to_string()
        }
        PrStatus::IncompleteChecklist
        | PrStatus::ApproachingDormant
        | PrStatus::Dormant => label.yellow().to_string(),
        PrStatus::Healthy | PrStatus::WaitingOnMaintainer => label.green().to_string(),
        _ => label,
    }
}

fn push_failures(out: &mut String, failures: &[ItemFailure]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{} failed:", failures.len());
    for failure in failures {
        let _ = writeln!(out, "  {}: {}", failure.url, failure.message);
    }
}

pub(crate) fn sync_report(report: &SyncReport) -> String {
    let mut out = String::new();
    if report.prs.is_empty() {
        let _ = writeln!(out, "No open pull requests.");
    }
    for pr in &report.prs {
        let _ = writeln!(
            out,
            "{:<22} {:>4}d  {}  {}",
            paint_status(pr.status),
            pr.days_since_activity,
            pr.url,
            pr.title
        );
        if let Some(comment) = &pr.last_maintainer_comment {
            let _ = writeln!(out, "{:<29}@{}: {}", "", comment.author, comment.body);
        }
    }
    for pr in &report.merged {
        let _ = writeln!(out, "merged  {}", pr.url);
    }
    for pr in &report.closed {
        let _ = writeln!(out, "closed  {}", pr.url);
    }
    push_failures(&mut out, &report.failures);
    out.trim_end().to_string()
}

pub(crate) fn candidate(candidate: &IssueCandidate) -> String {
    let mut out = String::new();
    let recommendation = match candidate.recommendation {
        Recommendation::Approve if stdout_supports_color() => "approve".green().to_string(),
        Recommendation::Skip if stdout_supports_color() => "skip".red().to_string(),
        other => other.as_str().to_string(),
    };
    let _ = writeln!(
        out,
        "{} ({}) score {}",
        candidate.issue.url, recommendation, candidate.viability_score
    );
    let _ = writeln!(out, "  {}", candidate.issue.title);
    for note in &candidate.vetting_result.notes {
        let _ = writeln!(out, "  - {note}");
    }
    out.trim_end().to_string()
}

pub(crate) fn search_report(report: &SearchReport) -> String {
    let mut out = String::new();
    if report.candidates.is_empty() {
        let _ = writeln!(out, "No candidates found.");
    }
    for found in &report.candidates {
        let _ = writeln!(
            out,
            "{:>3}  {:<12} {:<12} {}  {}",
            found.viability_score,
            found.recommendation.as_str(),
            found.search_priority.as_str(),
            found.issue.url,
            found.issue.title
        );
    }
    push_failures(&mut out, &report.failures);
    let _ = writeln!(out, "\nReport written to {}", report.report_path.display());
    out.trim_end().to_string()
}

pub(crate) fn repo_score(score: &RepoScore) -> String {
    format!(
        "{}: {}/10 ({} merged, {} closed without merge)",
        score.repo(),
        score.score(),
        score.merged_pr_count(),
        score.closed_without_merge_count()
    )
}

pub(crate) fn config_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "(unset)".to_string(),
        Value::Array(items) => items
            .iter()
            .map(config_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key} = {}", config_value(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub(crate) fn event_stats(stats: &EventStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} events", stats.total);
    for (event_type, count) in &stats.by_type {
        let _ = writeln!(out, "  {event_type:<20} {count}");
    }
    if let Some(rate) = stats.merge_rate {
        let _ = writeln!(
            out,
            "merge rate {:.0}% ({} merged, {} closed)",
            rate * 100.0,
            stats.merged,
            stats.closed
        );
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn config_values_render_plainly() {
        assert_eq!(config_value(&json!("octocat")), "octocat");
        assert_eq!(config_value(&json!(null)), "(unset)");
        assert_eq!(config_value(&json!(["rust", "go"])), "rust, go");
        assert_eq!(config_value(&json!(30)), "30");
        assert_eq!(
            config_value(&json!({ "labels": ["help wanted"], "maxIssueAgeDays": 90 })),
            "labels = help wanted\nmaxIssueAgeDays = 90"
        );
    }

    #[test]
    fn empty_stats_render_total_only() {
        assert_eq!(event_stats(&EventStats::default()), "0 events");
    }
}
