use crate::checklist::analyze_checklist;
use crate::ci::fetch_ci_status;
use crate::status::StatusInputs;
use crate::status::Thresholds;
use crate::status::decide_status;
use crate::timeline::action_hints;
use crate::timeline::find_unresponded;
use crate::timeline::review_decision;
use chrono::DateTime;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::IssueRef;
use ossmate_github::types::IssueComment;
use ossmate_github::types::PullRequest;
use ossmate_github::types::Review;
use ossmate_state::CiStatus;
use ossmate_state::TrackedPr;

/// Remote signals gathered for one pull request.
#[derive(Debug, Clone)]
pub struct PrSignals {
    pub pull_request: PullRequest,
    pub reviews: Vec<Review>,
    pub comments: Vec<IssueComment>,
    pub ci: CiStatus,
}

pub async fn fetch_signals(host: &dyn GithubHost, pr: &IssueRef) -> Result<PrSignals, HostError> {
    let pull_request = host.get_pull_request(&pr.repo, pr.number).await?;
    let (reviews, comments, ci) = tokio::join!(
        host.list_pull_reviews(&pr.repo, pr.number),
        host.list_issue_comments(&pr.repo, pr.number),
        fetch_ci_status(host, &pr.repo, &pull_request.head.sha)
    );
    Ok(PrSignals {
        pull_request,
        reviews: reviews?,
        comments: comments?,
        ci: ci?,
    })
}

/// Fetches and classifies one pull request authored by `username`.
pub async fn fetch_and_classify(
    host: &dyn GithubHost,
    pr: &IssueRef,
    username: &str,
    thresholds: Thresholds,
    now: DateTime<Utc>,
) -> Result<TrackedPr, HostError> {
    let signals = fetch_signals(host, pr).await?;
    Ok(classify_pull_request(&signals, username, thresholds, now))
}

/// Pure classification of already-fetched signals.
pub fn classify_pull_request(
    signals: &PrSignals,
    username: &str,
    thresholds: Thresholds,
    now: DateTime<Utc>,
) -> TrackedPr {
    let pr = &signals.pull_request;
    let unresponded = find_unresponded(username, &signals.comments, &signals.reviews);
    let decision = review_decision(&signals.reviews);
    let checklist = analyze_checklist(pr.body.as_deref().unwrap_or_default());
    let days_since_activity = days_between(pr.updated_at, now);

    let inputs = StatusInputs {
        ci: signals.ci,
        has_merge_conflict: pr.has_merge_conflict(),
        has_unresponded_comment: unresponded.has_any(),
        checklist_incomplete: checklist.is_incomplete(),
        review_decision: decision,
        days_since_activity,
    };

    TrackedPr {
        url: pr.html_url.clone(),
        repo: repo_of(pr),
        number: pr.number,
        title: pr.title.clone(),
        status: decide_status(&inputs, &thresholds),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        ci_status: signals.ci,
        has_merge_conflict: inputs.has_merge_conflict,
        review_decision: decision,
        has_unresponded_comment: inputs.has_unresponded_comment,
        last_maintainer_comment: unresponded.latest().cloned(),
        checklist,
        maintainer_action_hints: action_hints(&unresponded, decision),
        days_since_activity,
        last_checked_at: Some(now),
        merged_at: pr.merged_at,
        closed_at: pr.closed_at,
    }
}

/// Whole days from `from` to `now`, never negative.
pub fn days_between(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - from).num_days().max(0)
}

fn repo_of(pr: &PullRequest) -> String {
    IssueRef::parse_url(&pr.html_url)
        .map(|parsed| parsed.repo.full_name())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::comment;
    use crate::test_support::pull_request;
    use chrono::TimeZone;
    use ossmate_state::PrStatus;
    use ossmate_state::ReviewDecision;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 10, 12, 0, 0)
            .single()
            .expect("valid time")
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            dormant_days: 30,
            approaching_dormant_days: 25,
        }
    }

    fn signals(ci: CiStatus) -> PrSignals {
        PrSignals {
            pull_request: pull_request("octo/widgets", 7, "me", now() - chrono::Duration::days(2)),
            reviews: Vec::new(),
            comments: Vec::new(),
            ci,
        }
    }

    #[test]
    fn comment_after_user_needs_response() {
        let mut signals = signals(CiStatus::Passing);
        signals.comments = vec![
            comment("me", "Ready for review", now() - chrono::Duration::days(3)),
            comment("maintainer", "Please add tests for the parser", now() - chrono::Duration::days(1)),
        ];
        let tracked = classify_pull_request(&signals, "me", thresholds(), now());
        assert_eq!(tracked.status, PrStatus::NeedsResponse);
        assert_eq!(tracked.repo, "octo/widgets");
        assert_eq!(tracked.days_since_activity, 2);
        assert_eq!(
            tracked.last_maintainer_comment.map(|c| c.author),
            Some("maintainer".to_string())
        );
        assert_eq!(
            tracked.maintainer_action_hints,
            vec![ossmate_state::MaintainerActionHint::NeedsTests]
        );
    }

    #[test]
    fn failing_ci_is_reported() {
        let tracked = classify_pull_request(&signals(CiStatus::Failing), "me", thresholds(), now());
        assert_eq!(tracked.status, PrStatus::FailingCi);
        assert_eq!(tracked.review_decision, ReviewDecision::NoReview);
    }

    #[test]
    fn stale_prs_go_dormant() {
        let mut signals = signals(CiStatus::Passing);
        signals.pull_request.updated_at = now() - chrono::Duration::days(45);
        let tracked = classify_pull_request(&signals, "me", thresholds(), now());
        assert_eq!(tracked.status, PrStatus::Dormant);
        assert_eq!(tracked.days_since_activity, 45);
    }

    #[test]
    fn unchecked_boxes_mark_checklist_incomplete() {
        let mut signals = signals(CiStatus::Passing);
        signals.pull_request.body = Some("- [x] tests\n- [ ] docs".to_string());
        let tracked = classify_pull_request(&signals, "me", thresholds(), now());
        assert_eq!(tracked.status, PrStatus::IncompleteChecklist);
        assert_eq!(tracked.checklist.total, 2);
    }
}
