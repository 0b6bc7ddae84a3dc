use assert_matches::assert_matches;
use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;
use ossmate_core::CoreError;
use ossmate_core::IssueVetter;
use ossmate_core::REPORT_FILENAME;
use ossmate_core::SearchPriority;
use ossmate_core::search_issues;
use ossmate_core::test_support::FakeHost;
use ossmate_core::test_support::issue;
use ossmate_core::test_support::pull_request_item;
use ossmate_github::HostError;
use ossmate_state::EventType;
use ossmate_state::StateDocument;
use ossmate_state::TrackedIssue;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Every phase query carries the base qualifiers; linked-PR lookups do not.
const PHASE_QUERY: &str = "no:assignee";
const FRESHNESS: &str = "updated:>=2026-07-02";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 30, 0, 0, 0)
        .single()
        .expect("valid time")
}

fn fresh_issue(repo: &str, number: u64) -> ossmate_github::types::Issue {
    issue(repo, number, &format!("Issue {number}"), "", now() - Duration::days(3))
}

fn url(repo: &str, number: u64) -> String {
    format!("https://github.com/{repo}/issues/{number}")
}

fn phase_queries(host: &FakeHost) -> Vec<String> {
    host.search_queries()
        .into_iter()
        .filter(|query| query.contains(PHASE_QUERY))
        .collect()
}

fn document() -> StateDocument {
    let mut doc = StateDocument::default();
    doc.repo_scores.increment_merged("trusted/two", now());
    doc.repo_scores.increment_merged("trusted/two", now());
    for _ in 0..3 {
        doc.repo_scores.increment_closed("bad/three", now());
    }
    doc.active_issues.push(TrackedIssue {
        url: url("other/four", 41),
        repo: "other/four".to_string(),
        number: 41,
        title: "Already tracked".to_string(),
        tracked_at: now(),
    });
    doc
}

#[tokio::test]
async fn phases_run_in_priority_order_and_filter_results() {
    let stale = issue("other/four", 42, "Old", "", now() - Duration::days(120));
    let host = FakeHost::new()
        .with_starred(&["star/one"])
        .with_search(
            &format!("{FRESHNESS} repo:star/one"),
            vec![fresh_issue("star/one", 10)],
        )
        .with_search(
            &format!("{FRESHNESS} repo:trusted/two"),
            vec![fresh_issue("trusted/two", 20)],
        )
        .with_search(
            PHASE_QUERY,
            vec![
                fresh_issue("star/one", 11),
                fresh_issue("trusted/two", 20),
                fresh_issue("bad/three", 30),
                fresh_issue("other/four", 40),
                fresh_issue("other/four", 41),
                stale,
                pull_request_item("other/four", 43, now()),
            ],
        );
    let mut doc = document();
    let dir = TempDir::new().expect("tempdir");
    let report_path = dir.path().join(REPORT_FILENAME);

    let report = search_issues(&host, &mut doc, &IssueVetter::default(), 10, &report_path, now())
        .await
        .expect("search");

    let found: Vec<(String, SearchPriority)> = report
        .candidates
        .iter()
        .map(|candidate| (candidate.issue.url.clone(), candidate.search_priority))
        .collect();
    assert_eq!(
        found,
        vec![
            (url("star/one", 10), SearchPriority::Starred),
            (url("trusted/two", 20), SearchPriority::HighScore),
            (url("other/four", 40), SearchPriority::Normal),
        ]
    );
    assert!(report.failures.is_empty());

    let queries = phase_queries(&host);
    assert_eq!(queries.len(), 3);
    assert!(queries[0].ends_with("repo:star/one"));
    assert!(queries[1].ends_with("repo:trusted/two"));
    assert!(!queries[2].contains("repo:"));

    assert_eq!(doc.config.starred_repos, vec!["star/one".to_string()]);
    assert_eq!(doc.config.starred_repos_fetched_at, Some(now()));
    assert_eq!(doc.events.of_type(EventType::SearchCompleted).count(), 1);

    let written = std::fs::read_to_string(&report_path).expect("report");
    for (issue_url, _) in &found {
        assert!(written.contains(issue_url.as_str()), "{issue_url} missing from report");
    }
}

#[tokio::test]
async fn starred_repos_are_batched_five_per_query() {
    let starred = ["s/a", "s/b", "s/c", "s/d", "s/e", "s/f", "s/g"];
    let host = FakeHost::new().with_starred(&starred);
    let mut doc = StateDocument::default();
    let dir = TempDir::new().expect("tempdir");

    let report = search_issues(
        &host,
        &mut doc,
        &IssueVetter::default(),
        5,
        &dir.path().join(REPORT_FILENAME),
        now(),
    )
    .await
    .expect("search");

    assert!(report.candidates.is_empty());
    let queries = phase_queries(&host);
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[0].matches("repo:").count(), 5);
    assert_eq!(queries[1].matches("repo:").count(), 2);
    assert_eq!(queries[2].matches("repo:").count(), 0);
}

#[tokio::test]
async fn search_stops_once_enough_candidates_are_found() {
    let host = FakeHost::new()
        .with_starred(&["star/one"])
        .with_search(
            PHASE_QUERY,
            vec![fresh_issue("star/one", 1), fresh_issue("star/one", 2)],
        );
    let mut doc = StateDocument::default();
    let dir = TempDir::new().expect("tempdir");

    let report = search_issues(
        &host,
        &mut doc,
        &IssueVetter::default(),
        1,
        &dir.path().join(REPORT_FILENAME),
        now(),
    )
    .await
    .expect("search");

    assert_eq!(report.candidates.len(), 1);
    assert_eq!(phase_queries(&host).len(), 1);
}

#[tokio::test]
async fn cached_starred_list_skips_the_refresh() {
    let host = FakeHost::new().fail("starred", HostError::Other("unreachable".to_string()));
    let mut doc = StateDocument::default();
    doc.config.starred_repos = vec!["star/one".to_string()];
    doc.config.starred_repos_fetched_at = Some(now() - Duration::hours(2));
    let dir = TempDir::new().expect("tempdir");

    search_issues(
        &host,
        &mut doc,
        &IssueVetter::default(),
        5,
        &dir.path().join(REPORT_FILENAME),
        now(),
    )
    .await
    .expect("search");

    assert!(phase_queries(&host)[0].ends_with("repo:star/one"));
    assert_eq!(doc.config.starred_repos_fetched_at, Some(now() - Duration::hours(2)));
}

#[tokio::test]
async fn failed_searches_are_reported_and_auth_is_fatal() {
    let host = FakeHost::new().fail(
        &format!("search:{PHASE_QUERY}"),
        HostError::Other("search is down".to_string()),
    );
    let mut doc = StateDocument::default();
    let dir = TempDir::new().expect("tempdir");
    let report_path = dir.path().join(REPORT_FILENAME);

    let report = search_issues(&host, &mut doc, &IssueVetter::default(), 5, &report_path, now())
        .await
        .expect("search");
    assert!(report.candidates.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].url.starts_with("search: "));
    assert!(
        std::fs::read_to_string(&report_path)
            .expect("report")
            .contains("No candidates found.")
    );

    let host = FakeHost::new().fail("starred", HostError::Auth("bad credentials".to_string()));
    let mut doc = StateDocument::default();
    assert_matches!(
        search_issues(&host, &mut doc, &IssueVetter::default(), 5, &report_path, now()).await,
        Err(CoreError::Authentication(_))
    );
}
