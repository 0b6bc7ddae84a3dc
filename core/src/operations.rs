//! Single-shot operations on the state document that the front end exposes
//! next to sync and search.

use crate::error::CoreError;
use crate::error::Result;
use crate::vetting::IssueCandidate;
use crate::vetting::IssueVetter;
use crate::vetting::SearchPriority;
use chrono::DateTime;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::IssueRef;
use ossmate_github::RepoRef;
use ossmate_state::EventStats;
use ossmate_state::EventType;
use ossmate_state::RepoScore;
use ossmate_state::RepoScoreUpdate;
use ossmate_state::StateDocument;
use ossmate_state::TrackedIssue;
use serde_json::Value;
use serde_json::json;

/// Vets the issue at `url`. The issue itself must exist.
pub async fn vet_issue(
    host: &dyn GithubHost,
    doc: &mut StateDocument,
    vetter: &IssueVetter,
    url: &str,
    now: DateTime<Utc>,
) -> Result<IssueCandidate> {
    let issue_ref = IssueRef::parse_url(url)?;
    let issue = host
        .get_issue(&issue_ref.repo, issue_ref.number)
        .await?;
    let repo_score = doc.repo_scores.score(&issue_ref.repo.full_name());
    let priority = priority_for(doc, &issue_ref.repo);
    let candidate = vetter.vet(host, &issue, repo_score, priority, now).await?;
    doc.record_event(
        EventType::IssueVetted,
        json!({
            "url": candidate.issue.url,
            "recommendation": candidate.recommendation,
            "viabilityScore": candidate.viability_score,
        }),
        now,
    );
    Ok(candidate)
}

/// Pool a repository would be searched in, from the cached starred list and
/// the trust scores.
pub fn priority_for(doc: &StateDocument, repo: &RepoRef) -> SearchPriority {
    let key = repo.key();
    if doc
        .config
        .starred_repos
        .iter()
        .any(|starred| starred.eq_ignore_ascii_case(&key))
    {
        return SearchPriority::Starred;
    }
    match doc.repo_scores.score(&key) {
        Some(score) if score >= doc.config.min_repo_score_threshold => SearchPriority::HighScore,
        _ => SearchPriority::Normal,
    }
}

pub fn update_repo_score(
    doc: &mut StateDocument,
    repo: &str,
    update: RepoScoreUpdate,
    now: DateTime<Utc>,
) -> Result<RepoScore> {
    let repo = RepoRef::parse(repo)?;
    if update.is_empty() {
        return Err(CoreError::InvalidInput(
            "no repository signals to update".to_string(),
        ));
    }
    Ok(doc.update_repo_score(&repo.full_name(), update, now))
}

/// One key, or the whole config when `key` is `None`.
pub fn read_config(doc: &StateDocument, key: Option<&str>) -> Result<Value> {
    match key {
        Some(key) => Ok(doc.config.get(key)?),
        None => serde_json::to_value(&doc.config)
            .map_err(|err| CoreError::InvalidInput(err.to_string())),
    }
}

pub fn write_config(doc: &mut StateDocument, key: &str, value: &str, now: DateTime<Utc>) -> Result<Value> {
    Ok(doc.set_config(key, value, now)?)
}

/// Starts tracking a vetted issue. Returns `false` when it already was.
pub fn track_issue(doc: &mut StateDocument, candidate: &IssueCandidate, now: DateTime<Utc>) -> bool {
    doc.track_issue(
        TrackedIssue {
            url: candidate.issue.url.clone(),
            repo: candidate.issue.repo.clone(),
            number: candidate.issue.number,
            title: candidate.issue.title.clone(),
            tracked_at: now,
        },
        now,
    )
}

pub fn untrack_issue(doc: &mut StateDocument, url: &str, now: DateTime<Utc>) -> Result<TrackedIssue> {
    doc.untrack_issue(url, now)
        .ok_or_else(|| CoreError::NotFound(format!("{url} is not tracked")))
}

pub fn event_stats(doc: &StateDocument) -> EventStats {
    doc.events.stats()
}
