mod digest;
mod issue;
mod pull_request;

pub use digest::Digest;
pub use issue::TrackedIssue;
pub use pull_request::ChecklistStats;
pub use pull_request::CiStatus;
pub use pull_request::MaintainerActionHint;
pub use pull_request::MaintainerComment;
pub use pull_request::PrBucket;
pub use pull_request::PrStatus;
pub use pull_request::ReviewDecision;
pub use pull_request::STATUS_PRIORITY;
pub use pull_request::TrackedPr;

use crate::config::Config;
use crate::config::ConfigError;
use crate::events::Event;
use crate::events::EventLog;
use crate::events::EventType;
use crate::migrations::CURRENT_STATE_VERSION;
use crate::repo_scores::RepoScore;
use crate::repo_scores::RepoScoreUpdate;
use crate::repo_scores::RepoScores;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

/// The persisted root object.
///
/// A PR url lives in exactly one of the four PR lists. The lists are private
/// so every move goes through [`StateDocument::place_pr`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub version: u32,
    #[serde(rename = "activePRs", default)]
    active_prs: Vec<TrackedPr>,
    #[serde(rename = "dormantPRs", default)]
    dormant_prs: Vec<TrackedPr>,
    #[serde(rename = "mergedPRs", default)]
    merged_prs: Vec<TrackedPr>,
    #[serde(rename = "closedPRs", default)]
    closed_prs: Vec<TrackedPr>,
    #[serde(default)]
    pub active_issues: Vec<TrackedIssue>,
    #[serde(default)]
    pub repo_scores: RepoScores,
    #[serde(default)]
    pub events: EventLog,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_digest: Option<Digest>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_STATE_VERSION,
            active_prs: Vec::new(),
            dormant_prs: Vec::new(),
            merged_prs: Vec::new(),
            closed_prs: Vec::new(),
            active_issues: Vec::new(),
            repo_scores: RepoScores::default(),
            events: EventLog::default(),
            config: Config::default(),
            last_run_at: None,
            last_digest: None,
        }
    }
}

const BUCKETS: [PrBucket; 4] = [
    PrBucket::Active,
    PrBucket::Dormant,
    PrBucket::Merged,
    PrBucket::Closed,
];

impl StateDocument {
    pub fn prs(&self, bucket: PrBucket) -> &[TrackedPr] {
        match bucket {
            PrBucket::Active => &self.active_prs,
            PrBucket::Dormant => &self.dormant_prs,
            PrBucket::Merged => &self.merged_prs,
            PrBucket::Closed => &self.closed_prs,
        }
    }

    fn prs_mut(&mut self, bucket: PrBucket) -> &mut Vec<TrackedPr> {
        match bucket {
            PrBucket::Active => &mut self.active_prs,
            PrBucket::Dormant => &mut self.dormant_prs,
            PrBucket::Merged => &mut self.merged_prs,
            PrBucket::Closed => &mut self.closed_prs,
        }
    }

    /// Open PRs being watched: active then dormant.
    pub fn open_prs(&self) -> impl Iterator<Item = &TrackedPr> {
        self.active_prs.iter().chain(self.dormant_prs.iter())
    }

    pub fn find_pr(&self, url: &str) -> Option<(PrBucket, &TrackedPr)> {
        BUCKETS.iter().find_map(|bucket| {
            self.prs(*bucket)
                .iter()
                .find(|pr| pr.url == url)
                .map(|pr| (*bucket, pr))
        })
    }

    /// Stores `pr` in `bucket`, removing any entry with the same url from
    /// every list first. A PR that stays in its bucket keeps its position.
    /// Returns the bucket it was previously in.
    pub fn place_pr(&mut self, pr: TrackedPr, bucket: PrBucket) -> Option<PrBucket> {
        let mut previous = None;
        let mut slot = None;
        for candidate in BUCKETS {
            let list = self.prs_mut(candidate);
            if let Some(index) = list.iter().position(|existing| existing.url == pr.url) {
                previous = Some(candidate);
                if candidate == bucket {
                    slot = Some(index);
                }
                list.retain(|existing| existing.url != pr.url);
            }
        }
        let list = self.prs_mut(bucket);
        match slot {
            Some(index) if index <= list.len() => list.insert(index, pr),
            _ => list.push(pr),
        }
        previous
    }

    pub fn remove_pr(&mut self, url: &str) -> Option<(PrBucket, TrackedPr)> {
        for bucket in BUCKETS {
            let list = self.prs_mut(bucket);
            if let Some(index) = list.iter().position(|pr| pr.url == url) {
                return Some((bucket, list.remove(index)));
            }
        }
        None
    }

    /// Removes a PR from tracking entirely and records `pr_untracked`.
    pub fn untrack_pr(&mut self, url: &str, now: DateTime<Utc>) -> Option<(PrBucket, TrackedPr)> {
        let removed = self.remove_pr(url)?;
        self.record_event(
            EventType::PrUntracked,
            json!({ "url": url, "bucket": removed.0 }),
            now,
        );
        Some(removed)
    }

    pub(crate) fn clear_active_prs(&mut self) -> usize {
        let cleared = self.active_prs.len();
        self.active_prs.clear();
        cleared
    }

    pub fn record_event(&mut self, event_type: EventType, data: Value, now: DateTime<Utc>) -> &Event {
        self.events.append(event_type, data, now)
    }

    /// Moves a PR into the merged history and credits its repository.
    pub fn record_merge(&mut self, mut pr: TrackedPr, now: DateTime<Utc>) {
        pr.merged_at.get_or_insert(now);
        let url = pr.url.clone();
        let repo = pr.repo.clone();
        self.place_pr(pr, PrBucket::Merged);
        self.record_event(EventType::PrMerged, json!({ "url": url, "repo": repo }), now);
        let score = self.repo_scores.increment_merged(&repo, now).clone();
        self.record_score_event(&score, "merged", now);
    }

    /// Moves a PR into the closed history and debits its repository.
    pub fn record_close(&mut self, mut pr: TrackedPr, now: DateTime<Utc>) {
        pr.closed_at.get_or_insert(now);
        let url = pr.url.clone();
        let repo = pr.repo.clone();
        self.place_pr(pr, PrBucket::Closed);
        self.record_event(EventType::PrClosed, json!({ "url": url, "repo": repo }), now);
        let score = self.repo_scores.increment_closed(&repo, now).clone();
        self.record_score_event(&score, "closed", now);
    }

    pub fn update_repo_score(
        &mut self,
        repo: &str,
        update: RepoScoreUpdate,
        now: DateTime<Utc>,
    ) -> RepoScore {
        let score = self.repo_scores.update(repo, update, now).clone();
        self.record_score_event(&score, "update", now);
        score
    }

    pub fn mark_hostile(&mut self, repo: &str, now: DateTime<Utc>) -> RepoScore {
        let score = self.repo_scores.mark_hostile(repo, now).clone();
        self.record_score_event(&score, "hostile", now);
        score
    }

    fn record_score_event(&mut self, score: &RepoScore, reason: &str, now: DateTime<Utc>) {
        self.record_event(
            EventType::RepoScoreUpdated,
            json!({ "repo": score.repo(), "score": score.score(), "reason": reason }),
            now,
        );
    }

    pub fn is_issue_tracked(&self, url: &str) -> bool {
        self.active_issues.iter().any(|issue| issue.url == url)
    }

    /// Returns `false` when the issue was already tracked.
    pub fn track_issue(&mut self, issue: TrackedIssue, now: DateTime<Utc>) -> bool {
        if self.is_issue_tracked(&issue.url) {
            return false;
        }
        self.record_event(
            EventType::IssueTracked,
            json!({ "url": issue.url, "repo": issue.repo }),
            now,
        );
        self.active_issues.push(issue);
        true
    }

    pub fn untrack_issue(&mut self, url: &str, now: DateTime<Utc>) -> Option<TrackedIssue> {
        let index = self.active_issues.iter().position(|issue| issue.url == url)?;
        let issue = self.active_issues.remove(index);
        self.record_event(EventType::IssueUntracked, json!({ "url": url }), now);
        Some(issue)
    }

    /// Applies one config change and records `config_changed`.
    pub fn set_config(&mut self, key: &str, raw: &str, now: DateTime<Utc>) -> Result<Value, ConfigError> {
        let value = self.config.set(key, raw)?;
        self.record_event(
            EventType::ConfigChanged,
            json!({ "key": key, "value": value }),
            now,
        );
        Ok(value)
    }
}

/// `owner/repo` from a github.com issue or pull request URL.
pub(crate) fn repo_from_url(url: &str) -> Option<String> {
    let path = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    Some(format!("{owner}/{name}"))
}
