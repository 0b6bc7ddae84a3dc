use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::str::FromStr;
use strum_macros::AsRefStr;
use strum_macros::Display;
use strum_macros::EnumIter;
use strum_macros::EnumString;

/// Actionable status of a tracked pull request.
///
/// Declaration order is urgency order, most urgent first; `Ord` follows it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrStatus {
    NeedsResponse,
    FailingCi,
    CiBlocked,
    CiNotRunning,
    MergeConflict,
    NeedsRebase,
    MissingRequiredFiles,
    IncompleteChecklist,
    ApproachingDormant,
    Dormant,
    Waiting,
    WaitingOnMaintainer,
    #[default]
    Healthy,
}

/// Every status, most urgent first.
pub const STATUS_PRIORITY: [PrStatus; 13] = [
    PrStatus::NeedsResponse,
    PrStatus::FailingCi,
    PrStatus::CiBlocked,
    PrStatus::CiNotRunning,
    PrStatus::MergeConflict,
    PrStatus::NeedsRebase,
    PrStatus::MissingRequiredFiles,
    PrStatus::IncompleteChecklist,
    PrStatus::ApproachingDormant,
    PrStatus::Dormant,
    PrStatus::Waiting,
    PrStatus::WaitingOnMaintainer,
    PrStatus::Healthy,
];

impl PrStatus {
    /// Index into [`STATUS_PRIORITY`]; lower is more urgent.
    pub fn priority(self) -> usize {
        STATUS_PRIORITY
            .iter()
            .position(|status| *status == self)
            .unwrap_or(STATUS_PRIORITY.len())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CiStatus {
    Failing,
    Pending,
    Passing,
    #[default]
    Unknown,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    #[default]
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    NoReview,
}

/// Something a maintainer asked for, recognised from their comments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaintainerActionHint {
    ChangesRequested,
    NeedsTests,
    NeedsDocs,
    NeedsRebase,
    NeedsChangelog,
    NeedsCla,
}

/// Which list of the state document holds a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrBucket {
    Active,
    Dormant,
    Merged,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintainerComment {
    pub author: String,
    /// Truncated for display.
    pub body: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistStats {
    pub checked: usize,
    pub total: usize,
}

impl ChecklistStats {
    /// Incomplete only when the description has checkboxes and at least one
    /// is unticked.
    pub fn is_incomplete(&self) -> bool {
        self.total > 0 && self.checked < self.total
    }
}

/// A pull request authored by the user, as last classified.
///
/// Every field has a default so entries written by older builds still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackedPr {
    /// Canonical `html_url`; unique across the whole document.
    pub url: String,
    /// `owner/repo`.
    pub repo: String,
    pub number: u64,
    pub title: String,
    #[serde(deserialize_with = "lenient_status")]
    pub status: PrStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ci_status: CiStatus,
    pub has_merge_conflict: bool,
    pub review_decision: ReviewDecision,
    pub has_unresponded_comment: bool,
    pub last_maintainer_comment: Option<MaintainerComment>,
    #[serde(rename = "checklistStats")]
    pub checklist: ChecklistStats,
    pub maintainer_action_hints: Vec<MaintainerActionHint>,
    /// Whole days between `updated_at` and the last classification.
    pub days_since_activity: i64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Statuses written by older builds that no longer exist decode as the
/// default rather than rejecting the whole document.
fn lenient_status<'de, D>(deserializer: D) -> Result<PrStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| PrStatus::from_str(&value).ok())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn priority_table_lists_every_status_once_in_declaration_order() {
        let declared: Vec<PrStatus> = PrStatus::iter().collect();
        assert_eq!(declared, STATUS_PRIORITY.to_vec());
        let unique: HashSet<PrStatus> = STATUS_PRIORITY.iter().copied().collect();
        assert_eq!(unique.len(), STATUS_PRIORITY.len());
        assert!(PrStatus::NeedsResponse.priority() < PrStatus::Healthy.priority());
        assert!(PrStatus::ApproachingDormant < PrStatus::Dormant);
    }

    #[test]
    fn statuses_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(PrStatus::WaitingOnMaintainer).expect("encode"),
            serde_json::json!("waiting_on_maintainer")
        );
        assert_eq!(PrStatus::FailingCi.to_string(), "failing_ci");
        assert_eq!(
            serde_json::to_value(ReviewDecision::NoReview).expect("encode"),
            serde_json::json!("none")
        );
    }

    #[test]
    fn legacy_entries_decode_with_defaults() {
        let pr: TrackedPr = serde_json::from_value(serde_json::json!({
            "url": "https://github.com/octo/widgets/pull/3",
            "status": "needs_changes",
        }))
        .expect("decode");
        assert_eq!(pr.status, PrStatus::Healthy);
        assert_eq!(pr.ci_status, CiStatus::Unknown);
        assert_eq!(pr.number, 0);
    }

    #[test]
    fn checklist_incomplete_needs_boxes() {
        assert!(!ChecklistStats::default().is_incomplete());
        assert!(ChecklistStats { checked: 1, total: 2 }.is_incomplete());
        assert!(!ChecklistStats { checked: 2, total: 2 }.is_incomplete());
    }
}
