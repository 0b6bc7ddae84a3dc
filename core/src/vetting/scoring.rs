use serde::Deserialize;
use serde::Serialize;

const BASE_SCORE: i32 = 50;
const REPO_SCORE_WEIGHT: i32 = 2;
const CLEAR_REQUIREMENTS_BONUS: i32 = 15;
const FRESHNESS_BONUS: f64 = 15.0;
const FRESH_DAYS: i64 = 14;
const STALE_DAYS: i64 = 30;
const GUIDELINES_BONUS: i32 = 10;
const EXISTING_PR_PENALTY: i32 = 30;
const CLAIMED_PENALTY: i32 = 20;

/// Ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    NeedsReview,
    Skip,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::NeedsReview => "needs_review",
            Recommendation::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VettingChecks {
    pub no_existing_pr: bool,
    pub not_claimed: bool,
    pub project_active: bool,
    pub clear_requirements: bool,
    /// Informational; feeds the score but not the recommendation.
    pub contribution_guidelines_found: bool,
}

impl VettingChecks {
    fn problems(&self) -> usize {
        [
            !self.no_existing_pr,
            !self.not_claimed,
            !self.project_active,
            !self.clear_requirements,
        ]
        .into_iter()
        .filter(|problem| *problem)
        .count()
    }
}

/// Approve when every blocking check passes, skip when more than two fail.
pub fn recommend(checks: &VettingChecks) -> Recommendation {
    match checks.problems() {
        0 => Recommendation::Approve,
        1 | 2 => Recommendation::NeedsReview,
        _ => Recommendation::Skip,
    }
}

/// Full bonus up to two weeks, linear down to nothing at thirty days.
pub fn freshness_bonus(days_since_update: i64) -> i32 {
    if days_since_update <= FRESH_DAYS {
        return FRESHNESS_BONUS as i32;
    }
    if days_since_update >= STALE_DAYS {
        return 0;
    }
    let remaining = (STALE_DAYS - days_since_update) as f64 / (STALE_DAYS - FRESH_DAYS) as f64;
    (FRESHNESS_BONUS * remaining).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViabilityInputs {
    pub repo_score: Option<u8>,
    pub clear_requirements: bool,
    pub days_since_update: i64,
    pub has_guidelines: bool,
    pub has_existing_pr: bool,
    pub is_claimed: bool,
}

pub fn viability_score(inputs: &ViabilityInputs) -> u8 {
    let mut score = BASE_SCORE;
    if let Some(repo_score) = inputs.repo_score {
        score += i32::from(repo_score) * REPO_SCORE_WEIGHT;
    }
    if inputs.clear_requirements {
        score += CLEAR_REQUIREMENTS_BONUS;
    }
    score += freshness_bonus(inputs.days_since_update);
    if inputs.has_guidelines {
        score += GUIDELINES_BONUS;
    }
    if inputs.has_existing_pr {
        score -= EXISTING_PR_PENALTY;
    }
    if inputs.is_claimed {
        score -= CLAIMED_PENALTY;
    }
    score.clamp(0, 100) as u8
}
