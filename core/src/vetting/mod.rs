//! Decides whether an issue is worth picking up.
//!
//! Four checks run concurrently against the host: linked pull requests,
//! claims in the comments, project health and contribution guidelines. The
//! outcome is folded into a recommendation and a 0-100 viability score.

mod checks;
mod guidelines;
mod requirements;
mod scoring;

pub use checks::ACTIVE_COMMIT_WINDOW_DAYS;
pub use checks::CLAIM_PHRASES;
pub use checks::ClaimCheck;
pub use checks::ExistingPrCheck;
pub use checks::MAX_CLAIM_COMMENTS;
pub use checks::ProjectHealth;
pub use checks::is_claim;
pub use guidelines::ContributionGuidelines;
pub use guidelines::DEFAULT_CACHE_CAPACITY;
pub use guidelines::DEFAULT_CACHE_TTL;
pub use guidelines::GUIDELINE_PATHS;
pub use guidelines::GuidelineCache;
pub use guidelines::parse_guidelines;
pub use requirements::RequirementSignals;
pub use requirements::has_clear_requirements;
pub use requirements::requirement_signals;
pub use scoring::Recommendation;
pub use scoring::ViabilityInputs;
pub use scoring::VettingChecks;
pub use scoring::freshness_bonus;
pub use scoring::recommend;
pub use scoring::viability_score;

use chrono::DateTime;
use chrono::Utc;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::IssueRef;
use ossmate_github::types::Issue;
use serde::Serialize;

/// Which search pool produced a candidate. Ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPriority {
    Starred,
    HighScore,
    Normal,
}

impl SearchPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchPriority::Starred => "starred",
            SearchPriority::HighScore => "high_score",
            SearchPriority::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub url: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VettingResult {
    pub checks: VettingChecks,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCandidate {
    pub issue: IssueSummary,
    pub vetting_result: VettingResult,
    pub existing_prs: Vec<String>,
    pub claimed_by: Option<String>,
    pub project_health: ProjectHealth,
    pub guidelines: Option<ContributionGuidelines>,
    pub recommendation: Recommendation,
    pub viability_score: u8,
    pub search_priority: SearchPriority,
}

/// Runs the vetting checks. Holds the guideline cache, so one vetter should
/// serve a whole search.
#[derive(Debug, Default)]
pub struct IssueVetter {
    guidelines: GuidelineCache,
}

impl IssueVetter {
    pub fn new(guidelines: GuidelineCache) -> Self {
        Self { guidelines }
    }

    pub fn guideline_cache(&self) -> &GuidelineCache {
        &self.guidelines
    }

    /// Vets one issue. Project-health failures degrade into notes unless they
    /// are authentication failures; failures of the other checks are returned.
    pub async fn vet(
        &self,
        host: &dyn GithubHost,
        issue: &Issue,
        repo_score: Option<u8>,
        priority: SearchPriority,
        now: DateTime<Utc>,
    ) -> Result<IssueCandidate, HostError> {
        let repo = issue
            .repo()
            .map_err(|err| HostError::Other(err.to_string()))?;
        let issue_ref = IssueRef {
            repo: repo.clone(),
            number: issue.number,
        };

        let mut health_notes = Vec::new();
        let (existing, claim, health, guidelines) = tokio::join!(
            checks::check_existing_pr(host, &issue_ref),
            checks::check_claimed(host, issue, &issue_ref),
            checks::check_project_health(host, &repo, now, &mut health_notes),
            guidelines::fetch_guidelines(host, &repo, &self.guidelines, now),
        );
        let existing = existing?;
        let claim = claim?;
        let health = health?;
        let guidelines = guidelines?;

        let body = issue.body.as_deref().unwrap_or_default();
        let checks = VettingChecks {
            no_existing_pr: !existing.has_existing_pr,
            not_claimed: !claim.is_claimed,
            project_active: health.is_active,
            clear_requirements: has_clear_requirements(body),
            contribution_guidelines_found: guidelines.is_some(),
        };

        let mut notes = Vec::new();
        if existing.has_existing_pr {
            notes.push(format!(
                "Existing pull request: {}",
                existing.pull_requests.join(", ")
            ));
        }
        if let Some(claimant) = &claim.claimed_by {
            notes.push(format!("Claimed by @{claimant}"));
        }
        notes.extend(health_notes);
        if !checks.clear_requirements {
            notes.push("Requirements are unclear".to_string());
        }
        match &guidelines {
            Some(found) => notes.push(format!("Contribution guidelines: {}", found.source_path)),
            None => notes.push("No contribution guidelines found".to_string()),
        }

        let days_since_update = (now - issue.updated_at).num_days().max(0);
        let viability_score = viability_score(&ViabilityInputs {
            repo_score,
            clear_requirements: checks.clear_requirements,
            days_since_update,
            has_guidelines: checks.contribution_guidelines_found,
            has_existing_pr: existing.has_existing_pr,
            is_claimed: claim.is_claimed,
        });

        Ok(IssueCandidate {
            issue: IssueSummary {
                url: issue.html_url.clone(),
                repo: repo.full_name(),
                number: issue.number,
                title: issue.title.clone(),
                labels: issue.label_names(),
                created_at: issue.created_at,
                updated_at: issue.updated_at,
            },
            recommendation: recommend(&checks),
            vetting_result: VettingResult { checks, notes },
            existing_prs: existing.pull_requests,
            claimed_by: claim.claimed_by,
            project_health: health,
            guidelines,
            viability_score,
            search_priority: priority,
        })
    }
}
