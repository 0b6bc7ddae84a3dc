use ossmate_state::CiStatus;
use ossmate_state::Config;
use ossmate_state::PrStatus;
use ossmate_state::ReviewDecision;

/// Everything the decision table looks at for one PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInputs {
    pub ci: CiStatus,
    pub has_merge_conflict: bool,
    pub has_unresponded_comment: bool,
    pub checklist_incomplete: bool,
    pub review_decision: ReviewDecision,
    pub days_since_activity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub dormant_days: u32,
    pub approaching_dormant_days: u32,
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            dormant_days: config.dormant_threshold_days,
            approaching_dormant_days: config.approaching_dormant_days,
        }
    }
}

type Rule = (PrStatus, fn(&StatusInputs, &Thresholds) -> bool);

/// First match wins. Statuses absent here are never derived.
const RULES: &[Rule] = &[
    (PrStatus::NeedsResponse, |i, _| i.has_unresponded_comment),
    (PrStatus::FailingCi, |i, _| i.ci == CiStatus::Failing),
    (PrStatus::MergeConflict, |i, _| i.has_merge_conflict),
    (PrStatus::IncompleteChecklist, |i, _| i.checklist_incomplete),
    (PrStatus::Dormant, |i, t| {
        i.days_since_activity >= i64::from(t.dormant_days)
    }),
    (PrStatus::ApproachingDormant, |i, t| {
        i.days_since_activity >= i64::from(t.approaching_dormant_days)
    }),
    (PrStatus::WaitingOnMaintainer, |i, _| {
        i.review_decision == ReviewDecision::Approved
            && matches!(i.ci, CiStatus::Passing | CiStatus::Unknown)
    }),
    (PrStatus::Waiting, |i, _| i.ci == CiStatus::Pending),
];

pub fn decide_status(inputs: &StatusInputs, thresholds: &Thresholds) -> PrStatus {
    RULES
        .iter()
        .find(|(_, matches)| matches(inputs, thresholds))
        .map(|(status, _)| *status)
        .unwrap_or(PrStatus::Healthy)
}
