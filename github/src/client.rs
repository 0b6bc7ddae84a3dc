use crate::error::HostError;
use crate::host::GithubHost;
use crate::refs::RepoRef;
use crate::types::CheckRun;
use crate::types::CheckRunsPage;
use crate::types::CombinedStatus;
use crate::types::Commit;
use crate::types::ContentFile;
use crate::types::Issue;
use crate::types::IssueComment;
use crate::types::PullRequest;
use crate::types::Repository;
use crate::types::Review;
use crate::types::SearchPage;
use crate::types::TimelineEvent;
use async_trait::async_trait;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::RETRY_AFTER;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
/// GitHub search never returns results past the 1000th item.
const SEARCH_RESULT_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Longest rate-limit reset the client is willing to sleep through
    /// before giving up with [`HostError::RateLimit`].
    pub max_rate_limit_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_rate_limit_wait: Duration::from_secs(60),
        }
    }
}

/// REST implementation of [`GithubHost`].
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    retry: RetryConfig,
}

impl GithubClient {
    /// Builds a client authenticated with `token`. An empty token is rejected
    /// before any request is made.
    pub fn new(token: &str) -> Result<Self, HostError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HostError::Auth("no GitHub token configured".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ossmate"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| HostError::Auth("token contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| HostError::other(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        while api_base.ends_with('/') {
            api_base.pop();
        }
        self.api_base = api_base;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HostError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.api_base);
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            let response = self.http.get(&url).query(query).send().await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        operation,
                        url = %url,
                        status = %status,
                        attempt,
                        "Request completed"
                    );
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|err| {
                            HostError::other(format!("failed to decode {operation}: {err}"))
                        });
                    }

                    let headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();
                    let rate_limited = is_rate_limited(status, &headers, &body);
                    if attempt < self.retry.max_attempts
                        && let Some(delay) = self.retry_delay(status, rate_limited, &headers, attempt)
                    {
                        warn!(
                            operation,
                            status = status.as_u16(),
                            delay_ms = delay.as_millis() as u64,
                            "retrying GitHub request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(classify_failure(
                        operation,
                        status,
                        rate_limited,
                        &headers,
                        &body,
                    ));
                }
                Err(err) => {
                    debug!(operation, url = %url, error = %err, "Request failed");
                    if attempt < self.retry.max_attempts && (err.is_timeout() || err.is_connect())
                    {
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(HostError::other(format!("{operation} request failed: {err}")));
                }
            }
        }
    }

    /// Follows `page=` pagination until a short page or `limit` items.
    async fn get_paginated<T>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<T>, HostError>
    where
        T: DeserializeOwned,
    {
        let mut rows = Vec::new();
        let mut page = 1_u32;
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", PER_PAGE.to_string()));
            page_query.push(("page", page.to_string()));
            let chunk: Vec<T> = self.get_json(operation, path, &page_query).await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if let Some(limit) = limit
                && rows.len() >= limit
            {
                rows.truncate(limit);
                break;
            }
            if chunk_len < PER_PAGE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        self.retry.base_delay.saturating_mul(1_u32 << exponent)
    }

    fn retry_delay(
        &self,
        status: StatusCode,
        rate_limited: bool,
        headers: &HeaderMap,
        attempt: u32,
    ) -> Option<Duration> {
        if status.is_server_error() {
            return Some(self.backoff(attempt));
        }
        if !rate_limited {
            return None;
        }
        if let Some(after) = parse_retry_after(headers) {
            return (after <= self.retry.max_rate_limit_wait).then_some(after);
        }
        if header_u64(headers, "x-ratelimit-remaining") == Some(0) {
            let reset = parse_rate_limit_reset(headers)?;
            let wait = (reset - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            return (wait <= self.retry.max_rate_limit_wait).then_some(wait);
        }
        Some(self.backoff(attempt))
    }

    fn repo_path(repo: &RepoRef, tail: &str) -> String {
        format!("/repos/{}/{}{tail}", repo.owner, repo.name)
    }
}

#[async_trait]
impl GithubHost for GithubClient {
    async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<PullRequest, HostError> {
        self.get_json(
            "get pull request",
            &Self::repo_path(repo, &format!("/pulls/{number}")),
            &[],
        )
        .await
    }

    async fn list_pull_reviews(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<Review>, HostError> {
        self.get_paginated(
            "list pull reviews",
            &Self::repo_path(repo, &format!("/pulls/{number}/reviews")),
            &[],
            None,
        )
        .await
    }

    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<IssueComment>, HostError> {
        self.get_paginated(
            "list issue comments",
            &Self::repo_path(repo, &format!("/issues/{number}/comments")),
            &[],
            None,
        )
        .await
    }

    async fn get_combined_status(
        &self,
        repo: &RepoRef,
        sha: &str,
    ) -> Result<CombinedStatus, HostError> {
        self.get_json(
            "get combined status",
            &Self::repo_path(repo, &format!("/commits/{sha}/status")),
            &[],
        )
        .await
    }

    async fn list_check_runs(&self, repo: &RepoRef, sha: &str) -> Result<Vec<CheckRun>, HostError> {
        let path = Self::repo_path(repo, &format!("/commits/{sha}/check-runs"));
        let mut rows = Vec::new();
        let mut page = 1_u32;
        loop {
            let result: CheckRunsPage = self
                .get_json(
                    "list check runs",
                    &path,
                    &[
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let chunk_len = result.check_runs.len();
            rows.extend(result.check_runs);
            if chunk_len < PER_PAGE || rows.len() as u64 >= result.total_count {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    async fn search_issues(&self, query: &str, limit: usize) -> Result<Vec<Issue>, HostError> {
        let limit = limit.min(SEARCH_RESULT_CAP);
        let mut rows = Vec::new();
        let mut page = 1_u32;
        while rows.len() < limit {
            let result: SearchPage<Issue> = self
                .get_json(
                    "search issues",
                    "/search/issues",
                    &[
                        ("q", query.to_string()),
                        ("sort", "updated".to_string()),
                        ("order", "desc".to_string()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let chunk_len = result.items.len();
            rows.extend(result.items);
            let exhausted = chunk_len < PER_PAGE
                || rows.len() as u64 >= result.total_count
                || (page as usize) * PER_PAGE >= SEARCH_RESULT_CAP;
            if exhausted {
                break;
            }
            page = page.saturating_add(1);
        }
        rows.truncate(limit);
        Ok(rows)
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, HostError> {
        self.get_json(
            "get issue",
            &Self::repo_path(repo, &format!("/issues/{number}")),
            &[],
        )
        .await
    }

    async fn list_issue_timeline(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, HostError> {
        self.get_paginated(
            "list issue timeline",
            &Self::repo_path(repo, &format!("/issues/{number}/timeline")),
            &[],
            None,
        )
        .await
    }

    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, HostError> {
        self.get_json("get repository", &Self::repo_path(repo, ""), &[])
            .await
    }

    async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<String>, HostError> {
        let value: serde_json::Value = match self
            .get_json(
                "get file content",
                &Self::repo_path(repo, &format!("/contents/{path}")),
                &[],
            )
            .await
        {
            Ok(value) => value,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        // Directories come back as arrays.
        if !value.is_object() {
            return Ok(None);
        }
        let file: ContentFile = serde_json::from_value(value)
            .map_err(|err| HostError::other(format!("failed to decode file content: {err}")))?;
        decode_content(file).map(Some)
    }

    async fn path_exists(&self, repo: &RepoRef, path: &str) -> Result<bool, HostError> {
        let result: Result<serde_json::Value, HostError> = self
            .get_json(
                "probe path",
                &Self::repo_path(repo, &format!("/contents/{path}")),
                &[],
            )
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn list_commits(&self, repo: &RepoRef, limit: usize) -> Result<Vec<Commit>, HostError> {
        let per_page = limit.clamp(1, PER_PAGE);
        self.get_json(
            "list commits",
            &Self::repo_path(repo, "/commits"),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn list_starred_repos(&self) -> Result<Vec<String>, HostError> {
        let repos: Vec<Repository> = self
            .get_paginated("list starred repositories", "/user/starred", &[], None)
            .await?;
        Ok(repos.into_iter().map(|repo| repo.full_name).collect())
    }
}

fn decode_content(file: ContentFile) -> Result<String, HostError> {
    let content = file.content.unwrap_or_default();
    match file.encoding.as_deref() {
        Some("base64") => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|err| HostError::other(format!("invalid base64 content: {err}")))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Ok(content),
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap, body: &str) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            header_u64(headers, "x-ratelimit-remaining") == Some(0)
                || headers.contains_key(RETRY_AFTER)
                || body.to_ascii_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

fn classify_failure(
    operation: &str,
    status: StatusCode,
    rate_limited: bool,
    headers: &HeaderMap,
    body: &str,
) -> HostError {
    let detail = truncate_for_error(body, 300);
    if rate_limited {
        return HostError::RateLimit {
            message: format!("{operation} failed with status {}: {detail}", status.as_u16()),
            reset_at: parse_rate_limit_reset(headers),
        };
    }
    match status {
        StatusCode::UNAUTHORIZED => HostError::Auth(format!("{operation}: {detail}")),
        StatusCode::NOT_FOUND | StatusCode::GONE => HostError::NotFound(operation.to_string()),
        _ => HostError::Other(format!(
            "{operation} failed with status {}: {detail}",
            status.as_u16()
        )),
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_u64(headers, RETRY_AFTER.as_str()).map(Duration::from_secs)
}

fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let epoch = header_u64(headers, "x-ratelimit-reset")?;
    DateTime::<Utc>::from_timestamp(i64::try_from(epoch).ok()?, 0)
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}
