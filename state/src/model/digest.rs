use crate::model::PrStatus;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of the most recent PR sync. Replaced wholesale on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    /// Open PRs per status. Statuses with no PRs are omitted.
    pub status_counts: BTreeMap<PrStatus, usize>,
    /// URLs of PRs found merged during this run.
    pub merged: Vec<String>,
    /// URLs of PRs found closed without merging during this run.
    pub closed: Vec<String>,
    pub failures: usize,
    pub total_active: usize,
    pub total_dormant: usize,
}
