//! Prioritized issue search: starred repositories first, then trusted ones,
//! then the rest of GitHub.

use crate::error::CoreError;
use crate::error::ItemFailure;
use crate::error::Result;
use crate::fanout::run_bounded;
use crate::report::write_report;
use crate::vetting::IssueCandidate;
use crate::vetting::IssueVetter;
use crate::vetting::SearchPriority;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::types::Issue;
use ossmate_state::Config;
use ossmate_state::EventType;
use ossmate_state::RepoScores;
use ossmate_state::StateDocument;
use serde::Serialize;
use serde_json::json;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const DEFAULT_MAX_RESULTS: usize = 10;
/// Starred repositories searched in the first phase.
pub const STARRED_REPO_LIMIT: usize = 10;
/// `repo:` qualifiers per search query.
pub const REPOS_PER_QUERY: usize = 5;
pub const STARRED_CACHE_TTL: Duration = Duration::hours(24);

const MIN_RESULTS_PER_QUERY: usize = 10;
const MAX_RESULTS_PER_QUERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub candidates: Vec<IssueCandidate>,
    pub failures: Vec<ItemFailure>,
    pub report_path: PathBuf,
}

/// `is:issue is:open no:assignee archived:false` plus label, language and
/// freshness qualifiers from the config.
pub fn base_query(config: &Config, now: DateTime<Utc>) -> String {
    let mut parts = vec!["is:issue is:open no:assignee archived:false".to_string()];
    let labels: Vec<String> = config
        .labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .map(|label| format!("\"{label}\""))
        .collect();
    if !labels.is_empty() {
        parts.push(format!("label:{}", labels.join(",")));
    }
    for language in config.languages.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        parts.push(format!("language:{language}"));
    }
    let oldest = now - Duration::days(i64::from(config.max_issue_age_days));
    parts.push(format!("updated:>={}", oldest.format("%Y-%m-%d")));
    parts.join(" ")
}

/// Starred repositories, served from the config cache while it is fresh.
/// A failed refresh falls back to the stale cache.
pub async fn starred_repos(
    host: &dyn GithubHost,
    doc: &mut StateDocument,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let fresh = doc
        .config
        .starred_repos_fetched_at
        .is_some_and(|fetched_at| now - fetched_at < STARRED_CACHE_TTL);
    if fresh {
        return Ok(doc.config.starred_repos.clone());
    }
    match host.list_starred_repos().await {
        Ok(repos) => {
            debug!("refreshed {} starred repositories", repos.len());
            doc.config.starred_repos = repos.clone();
            doc.config.starred_repos_fetched_at = Some(now);
            Ok(repos)
        }
        Err(HostError::Auth(message)) => Err(CoreError::Authentication(message)),
        Err(err) => {
            warn!("failed to refresh starred repositories, using cache: {err}");
            Ok(doc.config.starred_repos.clone())
        }
    }
}

struct Phase {
    priority: SearchPriority,
    /// Empty means GitHub-wide.
    repos: Vec<String>,
}

/// What every phase filters on, frozen before vetting starts.
struct Filter {
    tracked: HashSet<String>,
    excluded: HashSet<String>,
    scores: RepoScores,
    low_threshold: u8,
    oldest_update: DateTime<Utc>,
}

impl Filter {
    fn from_document(doc: &StateDocument, now: DateTime<Utc>) -> Self {
        Self {
            tracked: doc.active_issues.iter().map(|issue| issue.url.clone()).collect(),
            excluded: doc
                .config
                .excluded_repos
                .iter()
                .map(|repo| RepoScores::key(repo))
                .collect(),
            scores: doc.repo_scores.clone(),
            low_threshold: doc.config.low_repo_score_threshold,
            oldest_update: now - Duration::days(i64::from(doc.config.max_issue_age_days)),
        }
    }

    fn allows_repo(&self, repo: &str) -> bool {
        !self.excluded.contains(&RepoScores::key(repo))
            && self
                .scores
                .score(repo)
                .is_none_or(|score| score > self.low_threshold)
    }

    fn allows_issue(&self, issue: &Issue) -> bool {
        if issue.is_pull_request()
            || self.tracked.contains(&issue.html_url)
            || issue.updated_at < self.oldest_update
        {
            return false;
        }
        issue
            .repo()
            .is_ok_and(|repo| self.allows_repo(&repo.full_name()))
    }
}

/// Fills up to `max_results` vetted candidates from three ordered phases and
/// writes the markdown report to `report_path`.
pub async fn search_issues(
    host: &dyn GithubHost,
    doc: &mut StateDocument,
    vetter: &IssueVetter,
    max_results: usize,
    report_path: &Path,
    now: DateTime<Utc>,
) -> Result<SearchReport> {
    let starred = starred_repos(host, doc, now).await?;
    let filter = Filter::from_document(doc, now);
    let base = base_query(&doc.config, now);

    let mut covered: HashSet<String> = HashSet::new();
    let starred_phase: Vec<String> = starred
        .iter()
        .filter(|repo| filter.allows_repo(repo))
        .filter(|repo| covered.insert(RepoScores::key(repo)))
        .take(STARRED_REPO_LIMIT)
        .cloned()
        .collect();
    let trusted_phase: Vec<String> = doc
        .repo_scores
        .high_scoring(doc.config.min_repo_score_threshold)
        .into_iter()
        .map(|score| score.repo().to_string())
        .filter(|repo| filter.allows_repo(repo))
        .filter(|repo| covered.insert(RepoScores::key(repo)))
        .collect();
    let phases = [
        Phase {
            priority: SearchPriority::Starred,
            repos: starred_phase,
        },
        Phase {
            priority: SearchPriority::HighScore,
            repos: trusted_phase,
        },
        Phase {
            priority: SearchPriority::Normal,
            repos: Vec::new(),
        },
    ];

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<IssueCandidate> = Vec::new();
    let mut failures = Vec::new();

    for phase in phases {
        let remaining = max_results.saturating_sub(candidates.len());
        if remaining == 0 {
            break;
        }
        if phase.priority != SearchPriority::Normal && phase.repos.is_empty() {
            continue;
        }

        let queries: Vec<String> = if phase.repos.is_empty() {
            vec![base.clone()]
        } else {
            phase
                .repos
                .chunks(REPOS_PER_QUERY)
                .map(|batch| {
                    let qualifiers: Vec<String> =
                        batch.iter().map(|repo| format!("repo:{repo}")).collect();
                    format!("{base} {}", qualifiers.join(" "))
                })
                .collect()
        };

        let per_query = (remaining * 3).clamp(MIN_RESULTS_PER_QUERY, MAX_RESULTS_PER_QUERY);
        let mut picked: Vec<Issue> = Vec::new();
        for query in queries {
            if picked.len() >= remaining {
                break;
            }
            let found = match host.search_issues(&query, per_query).await {
                Ok(found) => found,
                Err(HostError::Auth(message)) => return Err(CoreError::Authentication(message)),
                Err(err) => {
                    warn!("issue search failed for `{query}`: {err}");
                    failures.push(ItemFailure::new(format!("search: {query}"), err));
                    continue;
                }
            };
            for issue in found {
                if picked.len() >= remaining {
                    break;
                }
                if !filter.allows_issue(&issue) {
                    continue;
                }
                if phase.priority == SearchPriority::Normal
                    && issue
                        .repo()
                        .is_ok_and(|repo| covered.contains(&repo.key()))
                {
                    continue;
                }
                if seen.insert(issue.html_url.clone()) {
                    picked.push(issue);
                }
            }
        }
        debug!(
            "{} phase picked {} issues to vet",
            phase.priority.as_str(),
            picked.len()
        );

        let scores = &filter.scores;
        let priority = phase.priority;
        let vetted = run_bounded(picked, move |issue| async move {
            let score = issue.repo().ok().and_then(|repo| scores.score(&repo.full_name()));
            let result = vetter.vet(host, &issue, score, priority, now).await;
            (issue.html_url, result)
        })
        .await;
        for (url, result) in vetted {
            match result {
                Ok(candidate) => candidates.push(candidate),
                Err(HostError::Auth(message)) => return Err(CoreError::Authentication(message)),
                Err(err) => {
                    warn!("failed to vet {url}: {err}");
                    failures.push(ItemFailure::new(url, err));
                }
            }
        }
    }

    sort_candidates(&mut candidates);
    failures.sort_by(|a, b| a.url.cmp(&b.url));
    write_report(report_path, &candidates, now)?;
    doc.record_event(
        EventType::SearchCompleted,
        json!({ "candidates": candidates.len(), "failures": failures.len() }),
        now,
    );
    info!(
        "issue search produced {} candidates ({} failures)",
        candidates.len(),
        failures.len()
    );

    Ok(SearchReport {
        candidates,
        failures,
        report_path: report_path.to_path_buf(),
    })
}

/// Phase, then recommendation, then viability (highest first), then URL.
pub fn sort_candidates(candidates: &mut [IssueCandidate]) {
    candidates.sort_by(|a, b| {
        (
            a.search_priority,
            a.recommendation,
            Reverse(a.viability_score),
            &a.issue.url,
        )
            .cmp(&(
                b.search_priority,
                b.recommendation,
                Reverse(b.viability_score),
                &b.issue.url,
            ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 30, 0, 0, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn base_query_includes_config_filters() {
        let mut config = Config::default();
        config.languages = vec!["rust".to_string(), "go".to_string()];
        assert_eq!(
            base_query(&config, now()),
            "is:issue is:open no:assignee archived:false \
             label:\"good first issue\",\"help wanted\" \
             language:rust language:go updated:>=2026-07-02"
        );

        config.labels.clear();
        config.languages.clear();
        assert_eq!(
            base_query(&config, now()),
            "is:issue is:open no:assignee archived:false updated:>=2026-07-02"
        );
    }
}
