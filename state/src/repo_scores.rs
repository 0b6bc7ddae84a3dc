use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_REPO_SCORE: u8 = 5;
const MIN_SCORE: i32 = 1;
const MAX_SCORE: i32 = 10;
const MERGE_BONUS_PER_PR: i32 = 2;
const MERGE_BONUS_CAP: i32 = 4;
const CLOSE_PENALTY_CAP: i32 = 3;
const RESPONSIVE_BONUS: i32 = 1;
const HOSTILE_PENALTY: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoSignals {
    pub has_active_maintainers: bool,
    pub is_responsive: bool,
    pub has_hostile_comments: bool,
}

/// Partial update accepted by [`RepoScores::update`]. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RepoScoreUpdate {
    pub avg_response_days: Option<f64>,
    pub has_active_maintainers: Option<bool>,
    pub is_responsive: Option<bool>,
    pub has_hostile_comments: Option<bool>,
}

impl RepoScoreUpdate {
    pub fn is_empty(&self) -> bool {
        self.avg_response_days.is_none()
            && self.has_active_maintainers.is_none()
            && self.is_responsive.is_none()
            && self.has_hostile_comments.is_none()
    }
}

/// Trust score for one repository.
///
/// `score` is derived: every mutator recomputes it from the counts and
/// signals, and deserialization recomputes it too, so a hand-edited file
/// cannot pin a score the inputs do not justify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RepoScoreRecord")]
pub struct RepoScore {
    repo: String,
    score: u8,
    #[serde(rename = "mergedPRCount")]
    merged_pr_count: u32,
    closed_without_merge_count: u32,
    avg_response_days: Option<f64>,
    signals: RepoSignals,
    last_evaluated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoScoreRecord {
    repo: String,
    #[serde(rename = "mergedPRCount", default)]
    merged_pr_count: u32,
    #[serde(default)]
    closed_without_merge_count: u32,
    #[serde(default)]
    avg_response_days: Option<f64>,
    #[serde(default)]
    signals: RepoSignals,
    #[serde(default)]
    last_evaluated_at: DateTime<Utc>,
}

impl From<RepoScoreRecord> for RepoScore {
    fn from(record: RepoScoreRecord) -> Self {
        let mut score = RepoScore {
            repo: record.repo,
            score: DEFAULT_REPO_SCORE,
            merged_pr_count: record.merged_pr_count,
            closed_without_merge_count: record.closed_without_merge_count,
            avg_response_days: record.avg_response_days,
            signals: record.signals,
            last_evaluated_at: record.last_evaluated_at,
        };
        score.score = score.calculate_score();
        score
    }
}

impl RepoScore {
    pub fn new(repo: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut score = Self {
            repo: repo.into(),
            score: DEFAULT_REPO_SCORE,
            merged_pr_count: 0,
            closed_without_merge_count: 0,
            avg_response_days: None,
            signals: RepoSignals::default(),
            last_evaluated_at: now,
        };
        score.score = score.calculate_score();
        score
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn merged_pr_count(&self) -> u32 {
        self.merged_pr_count
    }

    pub fn closed_without_merge_count(&self) -> u32 {
        self.closed_without_merge_count
    }

    pub fn avg_response_days(&self) -> Option<f64> {
        self.avg_response_days
    }

    pub fn signals(&self) -> RepoSignals {
        self.signals
    }

    pub fn last_evaluated_at(&self) -> DateTime<Utc> {
        self.last_evaluated_at
    }

    /// Pure recomputation from counts and signals; does not mutate.
    pub fn calculate_score(&self) -> u8 {
        calculate_score(self)
    }

    fn refresh(&mut self, now: DateTime<Utc>) {
        self.score = self.calculate_score();
        self.last_evaluated_at = now;
    }

    fn increment_merged(&mut self, now: DateTime<Utc>) {
        self.merged_pr_count = self.merged_pr_count.saturating_add(1);
        self.refresh(now);
    }

    fn increment_closed(&mut self, now: DateTime<Utc>) {
        self.closed_without_merge_count = self.closed_without_merge_count.saturating_add(1);
        self.refresh(now);
    }

    fn mark_hostile(&mut self, now: DateTime<Utc>) {
        self.signals.has_hostile_comments = true;
        self.refresh(now);
    }

    fn apply(&mut self, update: RepoScoreUpdate, now: DateTime<Utc>) {
        if let Some(days) = update.avg_response_days {
            self.avg_response_days = Some(days.max(0.0));
        }
        if let Some(value) = update.has_active_maintainers {
            self.signals.has_active_maintainers = value;
        }
        if let Some(value) = update.is_responsive {
            self.signals.is_responsive = value;
        }
        if let Some(value) = update.has_hostile_comments {
            self.signals.has_hostile_comments = value;
        }
        self.refresh(now);
    }
}

/// `clamp(1, 10, 5 + min(merged*2, 4) - min(closed, 3) + responsive - 2*hostile)`.
pub fn calculate_score(repo_score: &RepoScore) -> u8 {
    let merged = i32::try_from(repo_score.merged_pr_count).unwrap_or(i32::MAX);
    let closed = i32::try_from(repo_score.closed_without_merge_count).unwrap_or(i32::MAX);

    let mut score = i32::from(DEFAULT_REPO_SCORE);
    score += merged.saturating_mul(MERGE_BONUS_PER_PR).min(MERGE_BONUS_CAP);
    score -= closed.min(CLOSE_PENALTY_CAP);
    if repo_score.signals.is_responsive {
        score += RESPONSIVE_BONUS;
    }
    if repo_score.signals.has_hostile_comments {
        score -= HOSTILE_PENALTY;
    }
    // Bounded to 1..=10 by the clamp.
    score.clamp(MIN_SCORE, MAX_SCORE) as u8
}

/// Trust scores keyed by lower-cased `owner/repo`, iterated in insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoScores(IndexMap<String, RepoScore>);

impl RepoScores {
    pub fn key(repo: &str) -> String {
        repo.trim().trim_matches('/').to_ascii_lowercase()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, repo: &str) -> Option<&RepoScore> {
        self.0.get(&Self::key(repo))
    }

    pub fn contains(&self, repo: &str) -> bool {
        self.0.contains_key(&Self::key(repo))
    }

    pub fn score(&self, repo: &str) -> Option<u8> {
        self.get(repo).map(RepoScore::score)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepoScore> {
        self.0.values()
    }

    /// Inserts a default entry when `repo` has none. Returns whether an entry
    /// was created.
    pub fn ensure(&mut self, repo: &str, now: DateTime<Utc>) -> bool {
        let key = Self::key(repo);
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, RepoScore::new(repo.trim(), now));
        true
    }

    fn entry(&mut self, repo: &str, now: DateTime<Utc>) -> &mut RepoScore {
        self.0
            .entry(Self::key(repo))
            .or_insert_with(|| RepoScore::new(repo.trim(), now))
    }

    pub fn increment_merged(&mut self, repo: &str, now: DateTime<Utc>) -> &RepoScore {
        let entry = self.entry(repo, now);
        entry.increment_merged(now);
        entry
    }

    pub fn increment_closed(&mut self, repo: &str, now: DateTime<Utc>) -> &RepoScore {
        let entry = self.entry(repo, now);
        entry.increment_closed(now);
        entry
    }

    pub fn mark_hostile(&mut self, repo: &str, now: DateTime<Utc>) -> &RepoScore {
        let entry = self.entry(repo, now);
        entry.mark_hostile(now);
        entry
    }

    pub fn update(&mut self, repo: &str, update: RepoScoreUpdate, now: DateTime<Utc>) -> &RepoScore {
        let entry = self.entry(repo, now);
        entry.apply(update, now);
        entry
    }

    /// Repositories scoring at least `threshold`, highest first.
    pub fn high_scoring(&self, threshold: u8) -> Vec<&RepoScore> {
        let mut repos: Vec<&RepoScore> = self.iter().filter(|s| s.score >= threshold).collect();
        repos.sort_by(|a, b| b.score.cmp(&a.score));
        repos
    }

    /// Repositories scoring at most `threshold`, lowest first.
    pub fn low_scoring(&self, threshold: u8) -> Vec<&RepoScore> {
        let mut repos: Vec<&RepoScore> = self.iter().filter(|s| s.score <= threshold).collect();
        repos.sort_by_key(|s| s.score);
        repos
    }
}
