//! Collapses commit statuses and check runs into one [`CiStatus`].

use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::RepoRef;
use ossmate_github::types::CheckRun;
use ossmate_github::types::CombinedStatus;
use ossmate_github::types::CommitStatus;
use ossmate_state::CiStatus;

const FAILING_CONCLUSIONS: &[&str] = &[
    "failure",
    "timed_out",
    "cancelled",
    "action_required",
    "startup_failure",
];
const PASSING_CONCLUSIONS: &[&str] = &["success", "neutral", "skipped"];

/// Statuses that only wait on a maintainer approving a fork's workflow run.
const IGNORED_STATUS_DESCRIPTION: &str = "authorization required";

/// Fetches both CI sources for `sha` and aggregates whichever exist. Only
/// when both are not-found is the result [`CiStatus::Unknown`]; other
/// failures propagate.
pub async fn fetch_ci_status(
    host: &dyn GithubHost,
    repo: &RepoRef,
    sha: &str,
) -> Result<CiStatus, HostError> {
    let (combined, check_runs) = tokio::join!(
        host.get_combined_status(repo, sha),
        host.list_check_runs(repo, sha)
    );
    let combined = optional(combined)?;
    let check_runs = optional(check_runs)?;
    if combined.is_none() && check_runs.is_none() {
        return Ok(CiStatus::Unknown);
    }
    let statuses = combined.map(|combined| combined.statuses).unwrap_or_default();
    Ok(aggregate_sources(&statuses, &check_runs.unwrap_or_default()))
}

fn optional<T>(result: Result<T, HostError>) -> Result<Option<T>, HostError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Failing beats pending beats passing. Nothing to look at counts as passing.
pub fn aggregate_ci(combined: &CombinedStatus, check_runs: &[CheckRun]) -> CiStatus {
    aggregate_sources(&combined.statuses, check_runs)
}

fn aggregate_sources(statuses: &[CommitStatus], check_runs: &[CheckRun]) -> CiStatus {
    let states: Vec<CiStatus> = statuses
        .iter()
        .filter(|status| !is_ignored_status(status))
        .map(status_state)
        .chain(check_runs.iter().map(check_run_state))
        .collect();

    if states.is_empty() {
        return CiStatus::Passing;
    }
    [CiStatus::Failing, CiStatus::Pending, CiStatus::Passing]
        .into_iter()
        .find(|wanted| states.contains(wanted))
        .unwrap_or(CiStatus::Unknown)
}

fn is_ignored_status(status: &CommitStatus) -> bool {
    status
        .description
        .as_deref()
        .is_some_and(|description| {
            description
                .to_ascii_lowercase()
                .contains(IGNORED_STATUS_DESCRIPTION)
        })
}

fn status_state(status: &CommitStatus) -> CiStatus {
    match status.state.as_str() {
        "failure" | "error" => CiStatus::Failing,
        "pending" => CiStatus::Pending,
        "success" => CiStatus::Passing,
        _ => CiStatus::Unknown,
    }
}

fn check_run_state(run: &CheckRun) -> CiStatus {
    if run.status != "completed" {
        return CiStatus::Pending;
    }
    match run.conclusion.as_deref() {
        Some(conclusion) if FAILING_CONCLUSIONS.contains(&conclusion) => CiStatus::Failing,
        Some(conclusion) if PASSING_CONCLUSIONS.contains(&conclusion) => CiStatus::Passing,
        _ => CiStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;
    use pretty_assertions::assert_eq;

    fn combined(statuses: &[(&str, Option<&str>)]) -> CombinedStatus {
        CombinedStatus {
            state: "pending".to_string(),
            statuses: statuses
                .iter()
                .map(|(state, description)| CommitStatus {
                    state: (*state).to_string(),
                    context: "ci/test".to_string(),
                    description: description.map(str::to_string),
                })
                .collect(),
        }
    }

    fn run(status: &str, conclusion: Option<&str>) -> CheckRun {
        CheckRun {
            name: "build".to_string(),
            status: status.to_string(),
            conclusion: conclusion.map(str::to_string),
        }
    }

    #[test]
    fn empty_sources_are_passing() {
        assert_eq!(aggregate_ci(&combined(&[]), &[]), CiStatus::Passing);
    }

    #[test]
    fn single_failing_check_run_fails() {
        assert_eq!(
            aggregate_ci(&combined(&[]), &[run("completed", Some("failure"))]),
            CiStatus::Failing
        );
        assert_eq!(
            aggregate_ci(&combined(&[]), &[run("completed", Some("startup_failure"))]),
            CiStatus::Failing
        );
    }

    #[test]
    fn precedence_is_failing_then_pending_then_passing() {
        assert_eq!(
            aggregate_ci(
                &combined(&[("success", None)]),
                &[run("in_progress", None), run("completed", Some("timed_out"))]
            ),
            CiStatus::Failing
        );
        assert_eq!(
            aggregate_ci(
                &combined(&[("success", None)]),
                &[run("queued", None), run("completed", Some("skipped"))]
            ),
            CiStatus::Pending
        );
        assert_eq!(
            aggregate_ci(&combined(&[("success", None)]), &[run("completed", Some("neutral"))]),
            CiStatus::Passing
        );
        assert_eq!(
            aggregate_ci(&combined(&[]), &[run("completed", Some("stale"))]),
            CiStatus::Unknown
        );
    }

    #[test]
    fn authorization_required_statuses_are_ignored() {
        assert_eq!(
            aggregate_ci(
                &combined(&[("pending", Some("Authorization Required to run workflows"))]),
                &[]
            ),
            CiStatus::Passing
        );
    }

    fn missing(what: &str) -> HostError {
        HostError::NotFound(what.to_string())
    }

    #[tokio::test]
    async fn one_missing_source_still_reports_the_other() {
        let repo = RepoRef::new("octo", "widgets");
        let host = FakeHost::new()
            .with_ci(
                "octo/widgets",
                "abc",
                combined(&[]),
                vec![run("completed", Some("failure"))],
            )
            .fail("status:octo/widgets@abc", missing("status"));
        assert_eq!(
            fetch_ci_status(&host, &repo, "abc").await.expect("ci"),
            CiStatus::Failing
        );

        let host = FakeHost::new()
            .with_ci("octo/widgets", "abc", combined(&[("pending", None)]), Vec::new())
            .fail("check-runs:octo/widgets@abc", missing("check runs"));
        assert_eq!(
            fetch_ci_status(&host, &repo, "abc").await.expect("ci"),
            CiStatus::Pending
        );
    }

    #[tokio::test]
    async fn both_sources_missing_is_unknown_and_other_errors_propagate() {
        let repo = RepoRef::new("octo", "widgets");
        let host = FakeHost::new()
            .fail("status:octo/widgets@abc", missing("status"))
            .fail("check-runs:octo/widgets@abc", missing("check runs"));
        assert_eq!(
            fetch_ci_status(&host, &repo, "abc").await.expect("ci"),
            CiStatus::Unknown
        );

        let host = FakeHost::new().fail(
            "check-runs:octo/widgets@abc",
            HostError::Other("boom".to_string()),
        );
        assert!(fetch_ci_status(&host, &repo, "abc").await.is_err());
    }
}
