use assert_matches::assert_matches;
use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;
use ossmate_core::CoreError;
use ossmate_core::IssueVetter;
use ossmate_core::Recommendation;
use ossmate_core::SearchPriority;
use ossmate_core::test_support::FakeHost;
use ossmate_core::test_support::comment;
use ossmate_core::test_support::commit;
use ossmate_core::test_support::issue;
use ossmate_core::test_support::pull_request_item;
use ossmate_core::test_support::repository;
use ossmate_core::track_issue;
use ossmate_core::vet_issue;
use ossmate_github::HostError;
use ossmate_github::types::TimelineEvent;
use ossmate_github::types::TimelineIssue;
use ossmate_github::types::TimelineSource;
use ossmate_state::EventType;
use ossmate_state::RepoScoreUpdate;
use ossmate_state::StateDocument;
use pretty_assertions::assert_eq;
use serde_json::json;

const REPO: &str = "octo/widgets";

const CLEAR_BODY: &str = "The parser panics on empty input.\n\n\
    1. Run `widgets parse` with an empty file\n\
    2. Observe the crash\n\n\
    ```\nthread 'main' panicked at src/parse.rs:12\n```\n\n\
    Expected: an empty document is returned.";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 30, 0, 0, 0)
        .single()
        .expect("valid time")
}

fn issue_url(number: u64) -> String {
    format!("https://github.com/{REPO}/issues/{number}")
}

fn healthy_repo() -> FakeHost {
    FakeHost::new()
        .with_repository(repository(REPO, now() - Duration::days(2)))
        .with_commits(REPO, vec![commit("abc123", now() - Duration::days(2))])
        .with_dir(REPO, ".github/workflows")
        .with_file(
            REPO,
            "CONTRIBUTING.md",
            "# Contributing\n\nRun `cargo test` before opening a pull request.\n",
        )
}

/// Repo score 8: one merged PR and a responsive maintainer.
fn trusted_document() -> StateDocument {
    let mut doc = StateDocument::default();
    doc.repo_scores.increment_merged(REPO, now());
    doc.update_repo_score(
        REPO,
        RepoScoreUpdate {
            is_responsive: Some(true),
            ..Default::default()
        },
        now(),
    );
    doc
}

#[tokio::test]
async fn clear_issue_in_a_trusted_repo_is_approved() {
    let host = healthy_repo().with_issue(issue(
        REPO,
        5,
        "Parser panics on empty input",
        CLEAR_BODY,
        now() - Duration::days(45),
    ));
    let mut doc = trusted_document();
    let vetter = IssueVetter::default();

    let candidate = vet_issue(&host, &mut doc, &vetter, &issue_url(5), now())
        .await
        .expect("vet");

    assert_eq!(candidate.recommendation, Recommendation::Approve);
    assert_eq!(candidate.viability_score, 91);
    assert_eq!(candidate.search_priority, SearchPriority::HighScore);
    assert!(candidate.project_health.is_active);
    assert_eq!(candidate.project_health.has_ci, Some(true));
    assert_eq!(
        candidate.guidelines.as_ref().map(|found| found.source_path.as_str()),
        Some("CONTRIBUTING.md")
    );
    assert_eq!(vetter.guideline_cache().len(), 1);
    assert_eq!(doc.events.of_type(EventType::IssueVetted).count(), 1);

    assert!(track_issue(&mut doc, &candidate, now()));
    assert!(!track_issue(&mut doc, &candidate, now()));
    assert!(doc.is_issue_tracked(&issue_url(5)));
}

#[tokio::test]
async fn claimed_issue_with_linked_pr_needs_review() {
    let mut claimed = issue(
        REPO,
        6,
        "Parser panics on empty input",
        CLEAR_BODY,
        now() - Duration::days(45),
    );
    claimed.comments = 2;
    let mut linked = pull_request_item(REPO, 70, now());
    linked.title = "Fix #6: handle empty input".to_string();
    let cross_reference = TimelineEvent {
        event: Some("cross-referenced".to_string()),
        source: Some(TimelineSource {
            issue: Some(TimelineIssue {
                html_url: format!("https://github.com/{REPO}/pull/71"),
                number: 71,
                state: Some("open".to_string()),
                pull_request: Some(json!({})),
            }),
        }),
    };
    let host = healthy_repo()
        .with_issue(claimed)
        .with_comments(
            REPO,
            6,
            vec![
                comment("bob", "Nice idea", now() - Duration::days(10)),
                comment("alice", "I\u{2019}d like to work on this!", now() - Duration::days(9)),
            ],
        )
        .with_search("is:pr 6", vec![linked])
        .with_timeline(REPO, 6, vec![cross_reference]);
    let mut doc = trusted_document();

    let candidate = vet_issue(&host, &mut doc, &IssueVetter::default(), &issue_url(6), now())
        .await
        .expect("vet");

    assert_eq!(candidate.claimed_by.as_deref(), Some("alice"));
    assert_eq!(
        candidate.existing_prs,
        vec![
            format!("https://github.com/{REPO}/pull/70"),
            format!("https://github.com/{REPO}/pull/71"),
        ]
    );
    assert_eq!(candidate.recommendation, Recommendation::NeedsReview);
    assert_eq!(candidate.viability_score, 41);
    assert!(
        candidate
            .vetting_result
            .notes
            .iter()
            .any(|note| note == "Claimed by @alice")
    );
}

#[tokio::test]
async fn unreachable_project_degrades_to_a_note() {
    let host = FakeHost::new().with_issue(issue(REPO, 8, "Tiny", "too short", now()));
    let mut doc = StateDocument::default();

    let candidate = vet_issue(&host, &mut doc, &IssueVetter::default(), &issue_url(8), now())
        .await
        .expect("vet");

    assert!(candidate.project_health.check_failed);
    assert!(!candidate.project_health.is_active);
    assert_eq!(candidate.recommendation, Recommendation::NeedsReview);
    assert_eq!(candidate.search_priority, SearchPriority::Normal);
    // 50 + 15 for freshness, nothing else.
    assert_eq!(candidate.viability_score, 65);
}

#[tokio::test]
async fn missing_or_malformed_issues_fail() {
    let host = FakeHost::new();
    let mut doc = StateDocument::default();
    let vetter = IssueVetter::default();

    assert_matches!(
        vet_issue(&host, &mut doc, &vetter, &issue_url(404), now()).await,
        Err(CoreError::NotFound(_))
    );
    assert_matches!(
        vet_issue(&host, &mut doc, &vetter, "https://example.com/nope", now()).await,
        Err(CoreError::InvalidInput(_))
    );
    assert!(doc.events.is_empty());
}

#[tokio::test]
async fn pull_requests_for_a_longer_issue_number_are_not_linked() {
    let mut other = pull_request_item(REPO, 200, now());
    other.title = "Fix crash on empty input (#123)".to_string();
    let host = healthy_repo()
        .with_issue(issue(REPO, 12, "Crash on empty input", CLEAR_BODY, now()))
        .with_issue(issue(REPO, 123, "Crash on empty input", CLEAR_BODY, now()))
        .with_search("is:pr 12", vec![other]);
    let mut doc = trusted_document();
    let vetter = IssueVetter::default();

    let short = vet_issue(&host, &mut doc, &vetter, &issue_url(12), now())
        .await
        .expect("vet #12");
    assert!(short.existing_prs.is_empty());
    assert!(short.vetting_result.checks.no_existing_pr);

    let long = vet_issue(&host, &mut doc, &vetter, &issue_url(123), now())
        .await
        .expect("vet #123");
    assert_eq!(
        long.existing_prs,
        vec![format!("https://github.com/{REPO}/pull/200")]
    );
}

#[tokio::test]
async fn rejected_credentials_during_the_health_check_are_fatal() {
    let host = healthy_repo()
        .with_issue(issue(REPO, 9, "Parser panics", CLEAR_BODY, now()))
        .fail(
            &format!("repo:{REPO}"),
            HostError::Auth("bad credentials".to_string()),
        );
    let mut doc = StateDocument::default();

    assert_matches!(
        vet_issue(&host, &mut doc, &IssueVetter::default(), &issue_url(9), now()).await,
        Err(CoreError::Authentication(_))
    );
    assert!(doc.events.is_empty());
}
