//! Test-only helpers exposed for cross-crate integration tests.
//!
//! Production code should not depend on this module.
//! We prefer this to using a crate feature to avoid building multiple
//! permutations of the crate.

use crate::vetting::IssueCandidate;
use crate::vetting::IssueSummary;
use crate::vetting::ProjectHealth;
use crate::vetting::Recommendation;
use crate::vetting::SearchPriority;
use crate::vetting::VettingChecks;
use crate::vetting::VettingResult;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::RepoRef;
use ossmate_github::types::CheckRun;
use ossmate_github::types::CombinedStatus;
use ossmate_github::types::Commit;
use ossmate_github::types::CommitDetail;
use ossmate_github::types::GitActor;
use ossmate_github::types::GitRef;
use ossmate_github::types::Issue;
use ossmate_github::types::IssueComment;
use ossmate_github::types::Label;
use ossmate_github::types::PullRequest;
use ossmate_github::types::Repository;
use ossmate_github::types::Review;
use ossmate_github::types::TimelineEvent;
use ossmate_github::types::User;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

type Key = (String, u64);

fn key(repo: &RepoRef, number: u64) -> Key {
    (repo.key(), number)
}

fn repo_key(repo: &str) -> String {
    repo.to_ascii_lowercase()
}

#[derive(Default)]
struct State {
    pull_requests: HashMap<Key, PullRequest>,
    reviews: HashMap<Key, Vec<Review>>,
    comments: HashMap<Key, Vec<IssueComment>>,
    ci: HashMap<(String, String), (CombinedStatus, Vec<CheckRun>)>,
    searches: Vec<(String, Vec<Issue>)>,
    issues: HashMap<Key, Issue>,
    timelines: HashMap<Key, Vec<TimelineEvent>>,
    repositories: HashMap<String, Repository>,
    files: HashMap<(String, String), String>,
    dirs: HashSet<(String, String)>,
    commits: HashMap<String, Vec<Commit>>,
    starred: Vec<String>,
    failures: Vec<(String, HostError)>,
    search_queries: Vec<String>,
}

/// In-memory [`GithubHost`]. Unknown entities are `NotFound`, unknown lists
/// are empty and CI with no data is passing.
///
/// Failures registered with [`FakeHost::fail`] match on a target string:
/// `pull:{repo}#{n}`, `issue:{repo}#{n}`, `comments:{repo}#{n}`,
/// `reviews:{repo}#{n}`, `timeline:{repo}#{n}`, `status:{repo}@{sha}`,
/// `check-runs:{repo}@{sha}`, `repo:{repo}`, `commits:{repo}`, `starred`, or
/// `search:{needle}` for any query that contains the needle.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, target: &str) -> Result<(), HostError> {
        let state = self.state();
        let failure = state.failures.iter().find(|(pattern, _)| {
            match (pattern.strip_prefix("search:"), target.strip_prefix("search:")) {
                (Some(needle), Some(query)) => query.contains(needle),
                _ => pattern.eq_ignore_ascii_case(target),
            }
        });
        match failure {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn with_pull_request(self, repo: &str, pr: PullRequest) -> Self {
        self.state()
            .pull_requests
            .insert((repo_key(repo), pr.number), pr);
        self
    }

    pub fn with_reviews(self, repo: &str, number: u64, reviews: Vec<Review>) -> Self {
        self.state().reviews.insert((repo_key(repo), number), reviews);
        self
    }

    pub fn with_comments(self, repo: &str, number: u64, comments: Vec<IssueComment>) -> Self {
        self.state()
            .comments
            .insert((repo_key(repo), number), comments);
        self
    }

    pub fn with_ci(
        self,
        repo: &str,
        sha: &str,
        combined: CombinedStatus,
        check_runs: Vec<CheckRun>,
    ) -> Self {
        self.state()
            .ci
            .insert((repo_key(repo), sha.to_string()), (combined, check_runs));
        self
    }

    /// Results for any query containing `needle`. The first registered
    /// needle that matches wins.
    pub fn with_search(self, needle: &str, issues: Vec<Issue>) -> Self {
        self.state().searches.push((needle.to_string(), issues));
        self
    }

    pub fn with_issue(self, issue: Issue) -> Self {
        if let Ok(repo) = issue.repo() {
            self.state().issues.insert(key(&repo, issue.number), issue);
        }
        self
    }

    pub fn with_timeline(self, repo: &str, number: u64, events: Vec<TimelineEvent>) -> Self {
        self.state()
            .timelines
            .insert((repo_key(repo), number), events);
        self
    }

    pub fn with_repository(self, repository: Repository) -> Self {
        self.state()
            .repositories
            .insert(repo_key(&repository.full_name), repository);
        self
    }

    pub fn with_file(self, repo: &str, path: &str, text: &str) -> Self {
        self.state()
            .files
            .insert((repo_key(repo), path.to_string()), text.to_string());
        self
    }

    pub fn with_dir(self, repo: &str, path: &str) -> Self {
        self.state().dirs.insert((repo_key(repo), path.to_string()));
        self
    }

    pub fn with_commits(self, repo: &str, commits: Vec<Commit>) -> Self {
        self.state().commits.insert(repo_key(repo), commits);
        self
    }

    pub fn with_starred(self, repos: &[&str]) -> Self {
        self.state().starred = repos.iter().map(ToString::to_string).collect();
        self
    }

    pub fn fail(self, target: &str, err: HostError) -> Self {
        self.state().failures.push((target.to_string(), err));
        self
    }

    /// Every search query received, in call order.
    pub fn search_queries(&self) -> Vec<String> {
        self.state().search_queries.clone()
    }
}

#[async_trait]
impl GithubHost for FakeHost {
    async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest, HostError> {
        self.check(&format!("pull:{repo}#{number}"))?;
        self.state()
            .pull_requests
            .get(&key(repo, number))
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("pull {repo}#{number}")))
    }

    async fn list_pull_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>, HostError> {
        self.check(&format!("reviews:{repo}#{number}"))?;
        Ok(self
            .state()
            .reviews
            .get(&key(repo, number))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<IssueComment>, HostError> {
        self.check(&format!("comments:{repo}#{number}"))?;
        Ok(self
            .state()
            .comments
            .get(&key(repo, number))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_combined_status(
        &self,
        repo: &RepoRef,
        sha: &str,
    ) -> Result<CombinedStatus, HostError> {
        self.check(&format!("status:{repo}@{sha}"))?;
        Ok(self
            .state()
            .ci
            .get(&(repo.key(), sha.to_string()))
            .map(|(combined, _)| combined.clone())
            .unwrap_or_else(|| CombinedStatus {
                state: "pending".to_string(),
                statuses: Vec::new(),
            }))
    }

    async fn list_check_runs(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckRun>, HostError> {
        self.check(&format!("check-runs:{repo}@{sha}"))?;
        Ok(self
            .state()
            .ci
            .get(&(repo.key(), sha.to_string()))
            .map(|(_, runs)| runs.clone())
            .unwrap_or_default())
    }

    async fn search_issues(&self, query: &str, limit: usize) -> Result<Vec<Issue>, HostError> {
        self.state().search_queries.push(query.to_string());
        self.check(&format!("search:{query}"))?;
        let state = self.state();
        let found = state
            .searches
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, issues)| issues.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        Ok(found)
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, HostError> {
        self.check(&format!("issue:{repo}#{number}"))?;
        self.state()
            .issues
            .get(&key(repo, number))
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("issue {repo}#{number}")))
    }

    async fn list_issue_timeline(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, HostError> {
        self.check(&format!("timeline:{repo}#{number}"))?;
        Ok(self
            .state()
            .timelines
            .get(&key(repo, number))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, HostError> {
        self.check(&format!("repo:{repo}"))?;
        self.state()
            .repositories
            .get(&repo.key())
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("repository {repo}")))
    }

    async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<String>, HostError> {
        Ok(self
            .state()
            .files
            .get(&(repo.key(), path.to_string()))
            .cloned())
    }

    async fn path_exists(&self, repo: &RepoRef, path: &str) -> Result<bool, HostError> {
        let target = (repo.key(), path.to_string());
        let state = self.state();
        Ok(state.dirs.contains(&target) || state.files.contains_key(&target))
    }

    async fn list_commits(&self, repo: &RepoRef, limit: usize) -> Result<Vec<Commit>, HostError> {
        self.check(&format!("commits:{repo}"))?;
        Ok(self
            .state()
            .commits
            .get(&repo.key())
            .map(|commits| commits.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_starred_repos(&self) -> Result<Vec<String>, HostError> {
        self.check("starred")?;
        Ok(self.state().starred.clone())
    }
}

pub fn user(login: &str) -> User {
    User {
        login: login.to_string(),
        account_type: None,
    }
}

/// Open, mergeable PR with head sha `sha-{number}`.
pub fn pull_request(repo: &str, number: u64, author: &str, updated_at: DateTime<Utc>) -> PullRequest {
    PullRequest {
        html_url: format!("https://github.com/{repo}/pull/{number}"),
        number,
        title: format!("Change #{number}"),
        body: None,
        state: "open".to_string(),
        user: user(author),
        created_at: updated_at,
        updated_at,
        closed_at: None,
        merged_at: None,
        merged: Some(false),
        mergeable: Some(true),
        mergeable_state: None,
        draft: false,
        head: GitRef {
            sha: format!("sha-{number}"),
            ref_name: format!("branch-{number}"),
        },
    }
}

pub fn comment(login: &str, body: &str, at: DateTime<Utc>) -> IssueComment {
    IssueComment {
        user: Some(user(login)),
        body: Some(body.to_string()),
        created_at: at,
        html_url: None,
    }
}

/// Open issue as returned by search.
pub fn issue(repo: &str, number: u64, title: &str, body: &str, updated_at: DateTime<Utc>) -> Issue {
    Issue {
        html_url: format!("https://github.com/{repo}/issues/{number}"),
        number,
        title: title.to_string(),
        body: Some(body.to_string()),
        state: "open".to_string(),
        user: Some(user("reporter")),
        labels: vec![Label {
            name: "good first issue".to_string(),
        }],
        comments: 0,
        created_at: updated_at,
        updated_at,
        repository_url: format!("https://api.github.com/repos/{repo}"),
        pull_request: None,
    }
}

/// Search result item for a pull request, as search returns them.
pub fn pull_request_item(repo: &str, number: u64, updated_at: DateTime<Utc>) -> Issue {
    let mut item = issue(repo, number, &format!("Change #{number}"), "", updated_at);
    item.html_url = format!("https://github.com/{repo}/pull/{number}");
    item.labels.clear();
    item.pull_request = Some(serde_json::json!({
        "html_url": format!("https://github.com/{repo}/pull/{number}"),
    }));
    item
}

/// Unarchived repository that was pushed to at `pushed_at`.
pub fn repository(repo: &str, pushed_at: DateTime<Utc>) -> Repository {
    Repository {
        full_name: repo.to_string(),
        archived: false,
        stargazers_count: 42,
        open_issues_count: 3,
        pushed_at: Some(pushed_at),
        language: Some("Rust".to_string()),
    }
}

pub fn commit(sha: &str, at: DateTime<Utc>) -> Commit {
    Commit {
        sha: sha.to_string(),
        commit: CommitDetail {
            author: Some(GitActor { date: Some(at) }),
            committer: Some(GitActor { date: Some(at) }),
        },
    }
}

/// Approved candidate with the given viability score.
pub fn candidate(repo: &str, number: u64, viability_score: u8) -> IssueCandidate {
    let updated_at = Utc
        .with_ymd_and_hms(2026, 8, 20, 0, 0, 0)
        .single()
        .unwrap_or_default();
    IssueCandidate {
        issue: IssueSummary {
            url: format!("https://github.com/{repo}/issues/{number}"),
            repo: repo.to_string(),
            number,
            title: format!("Issue {number}"),
            labels: vec!["good first issue".to_string()],
            created_at: updated_at,
            updated_at,
        },
        vetting_result: VettingResult {
            checks: VettingChecks {
                no_existing_pr: true,
                not_claimed: true,
                project_active: true,
                clear_requirements: true,
                contribution_guidelines_found: false,
            },
            notes: Vec::new(),
        },
        existing_prs: Vec::new(),
        claimed_by: None,
        project_health: ProjectHealth {
            is_active: true,
            ..Default::default()
        },
        guidelines: None,
        recommendation: Recommendation::Approve,
        viability_score,
        search_priority: SearchPriority::Normal,
    }
}
