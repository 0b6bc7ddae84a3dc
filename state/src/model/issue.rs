use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// An issue the user has decided to work on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedIssue {
    pub url: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub tracked_at: DateTime<Utc>,
}
