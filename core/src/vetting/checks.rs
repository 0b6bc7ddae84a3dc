use chrono::DateTime;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::IssueRef;
use ossmate_github::RepoRef;
use ossmate_github::types::Issue;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Case-insensitive substrings that mean someone already picked the issue up.
pub const CLAIM_PHRASES: &[&str] = &[
    "i'm working on this",
    "i am working on this",
    "i'll take this",
    "i will take this",
    "working on it",
    "i'd like to work on this",
    "can i work on this",
    "assigned to me",
    "i'll work on this",
    "i will work on this",
    "let me take this",
    "i'm on it",
];

/// Only the most recent comments are scanned for claims.
pub const MAX_CLAIM_COMMENTS: usize = 100;

/// A project with a commit in this many days is active.
pub const ACTIVE_COMMIT_WINDOW_DAYS: i64 = 30;

const LINKED_PR_SEARCH_LIMIT: usize = 30;
const CI_MARKER_PATH: &str = ".github/workflows";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingPrCheck {
    pub has_existing_pr: bool,
    /// Open PRs that reference the issue.
    pub pull_requests: Vec<String>,
}

/// True when `text` names the issue as `#N` or by its URL. The number must
/// not run on into more digits, so `#12` does not match `#123`.
pub fn mentions_issue(text: &str, issue: &IssueRef) -> bool {
    [format!("#{}", issue.number), issue.issue_url()]
        .iter()
        .any(|needle| {
            text.match_indices(needle.as_str()).any(|(start, matched)| {
                !text[start + matched.len()..]
                    .starts_with(|c: char| c.is_ascii_digit())
            })
        })
}

/// Open pull requests linked to the issue, found by search and by
/// cross-references in the issue timeline.
pub async fn check_existing_pr(
    host: &dyn GithubHost,
    issue: &IssueRef,
) -> Result<ExistingPrCheck, HostError> {
    let query = format!("repo:{} is:pr {}", issue.repo.full_name(), issue.number);
    let (search, timeline) = tokio::join!(
        host.search_issues(&query, LINKED_PR_SEARCH_LIMIT),
        host.list_issue_timeline(&issue.repo, issue.number)
    );

    let mut pull_requests: BTreeSet<String> = search?
        .into_iter()
        .filter(|pr| pr.state == "open")
        .filter(|pr| {
            let text = format!("{}\n{}", pr.title, pr.body.as_deref().unwrap_or_default());
            mentions_issue(&text, issue)
        })
        .map(|pr| pr.html_url)
        .collect();

    let timeline = match timeline {
        Ok(events) => events,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => return Err(err),
    };
    pull_requests.extend(
        timeline
            .iter()
            .filter_map(|event| event.cross_referenced_pull())
            .filter(|pr| pr.state.as_deref().is_none_or(|state| state == "open"))
            .map(|pr| pr.html_url.clone()),
    );

    Ok(ExistingPrCheck {
        has_existing_pr: !pull_requests.is_empty(),
        pull_requests: pull_requests.into_iter().collect(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimCheck {
    pub is_claimed: bool,
    /// Author of the most recent claiming comment.
    pub claimed_by: Option<String>,
}

pub async fn check_claimed(host: &dyn GithubHost, issue: &Issue, issue_ref: &IssueRef) -> Result<ClaimCheck, HostError> {
    if issue.comments == 0 {
        return Ok(ClaimCheck::default());
    }
    let comments = host
        .list_issue_comments(&issue_ref.repo, issue_ref.number)
        .await?;
    let start = comments.len().saturating_sub(MAX_CLAIM_COMMENTS);
    let claimant = comments[start..]
        .iter()
        .rev()
        .find(|comment| is_claim(comment.body.as_deref().unwrap_or_default()))
        .map(|comment| {
            comment
                .user
                .as_ref()
                .map(|user| user.login.clone())
                .unwrap_or_else(|| "ghost".to_string())
        });
    Ok(ClaimCheck {
        is_claimed: claimant.is_some(),
        claimed_by: claimant,
    })
}

pub fn is_claim(body: &str) -> bool {
    let lowered = body.to_lowercase().replace('\u{2019}', "'");
    CLAIM_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHealth {
    pub is_active: bool,
    pub archived: bool,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub days_since_last_commit: Option<i64>,
    /// Whether `.github/workflows` exists; `None` when the probe failed.
    pub has_ci: Option<bool>,
    pub stars: Option<u64>,
    pub language: Option<String>,
    /// Set when the health lookup failed and the result is a fallback.
    pub check_failed: bool,
}

/// Lookup errors degrade to an inactive project with a note, except
/// authentication failures, which are returned.
pub async fn check_project_health(
    host: &dyn GithubHost,
    repo: &RepoRef,
    now: DateTime<Utc>,
    notes: &mut Vec<String>,
) -> Result<ProjectHealth, HostError> {
    let (repository, commits, has_ci) = tokio::join!(
        host.get_repository(repo),
        host.list_commits(repo, 1),
        host.path_exists(repo, CI_MARKER_PATH)
    );

    let mut health = ProjectHealth {
        has_ci: has_ci.ok(),
        ..Default::default()
    };
    let (repository, commits) = match (repository, commits) {
        (Ok(repository), Ok(commits)) => (repository, commits),
        (Err(err @ HostError::Auth(_)), _) | (_, Err(err @ HostError::Auth(_))) => {
            return Err(err);
        }
        (Err(err), _) | (_, Err(err)) => {
            warn!("project health check failed for {repo}: {err}");
            notes.push(format!("Could not check project health: {err}"));
            health.check_failed = true;
            return Ok(health);
        }
    };

    health.archived = repository.archived;
    health.stars = Some(repository.stargazers_count);
    health.language = repository.language;
    health.last_commit_at = commits
        .first()
        .and_then(|commit| commit.committed_at())
        .or(repository.pushed_at);
    health.days_since_last_commit = health
        .last_commit_at
        .map(|at| (now - at).num_days().max(0));
    health.is_active = !health.archived
        && health
            .days_since_last_commit
            .is_some_and(|days| days < ACTIVE_COMMIT_WINDOW_DAYS);

    if health.archived {
        notes.push("Repository is archived".to_string());
    } else if !health.is_active {
        match health.days_since_last_commit {
            Some(days) => notes.push(format!("No commits in the last {days} days")),
            None => notes.push("No commits found".to_string()),
        }
    }
    if health.has_ci == Some(false) {
        notes.push("No GitHub Actions workflows found".to_string());
    }
    Ok(health)
}
