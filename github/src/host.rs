use crate::error::HostError;
use crate::refs::RepoRef;
use crate::types::CheckRun;
use crate::types::CombinedStatus;
use crate::types::Commit;
use crate::types::Issue;
use crate::types::IssueComment;
use crate::types::PullRequest;
use crate::types::Repository;
use crate::types::Review;
use crate::types::TimelineEvent;
use async_trait::async_trait;

/// Operations ossmate needs from a repository host.
///
/// Implementations own transport, authentication and rate-limit pacing.
/// Callers bound how many requests are in flight but never sleep on their
/// own. Optional lookups return `Ok(None)` on not-found where the signature
/// says so; everything else surfaces [`HostError::NotFound`] and lets the
/// caller decide whether the entity was required.
#[async_trait]
pub trait GithubHost: Send + Sync {
    async fn get_pull_request(&self, repo: &RepoRef, number: u64)
    -> Result<PullRequest, HostError>;

    async fn list_pull_reviews(&self, repo: &RepoRef, number: u64)
    -> Result<Vec<Review>, HostError>;

    /// Every comment on an issue or pull request, oldest first.
    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<IssueComment>, HostError>;

    async fn get_combined_status(
        &self,
        repo: &RepoRef,
        sha: &str,
    ) -> Result<CombinedStatus, HostError>;

    async fn list_check_runs(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckRun>, HostError>;

    /// Issue/PR search. Pages until `limit` items are collected or results
    /// run out.
    async fn search_issues(&self, query: &str, limit: usize) -> Result<Vec<Issue>, HostError>;

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, HostError>;

    async fn list_issue_timeline(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, HostError>;

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, HostError>;

    /// Decoded file text at `path` on the default branch; `None` when the
    /// path does not exist or is a directory.
    async fn get_file_content(&self, repo: &RepoRef, path: &str)
    -> Result<Option<String>, HostError>;

    /// Whether anything (file or directory) exists at `path`.
    async fn path_exists(&self, repo: &RepoRef, path: &str) -> Result<bool, HostError>;

    /// Most recent commits on the default branch, newest first.
    async fn list_commits(&self, repo: &RepoRef, limit: usize) -> Result<Vec<Commit>, HostError>;

    /// `owner/repo` names starred by the authenticated user.
    async fn list_starred_repos(&self) -> Result<Vec<String>, HostError>;
}
