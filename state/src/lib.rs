//! Versioned JSON state for ossmate.
//!
//! One document per user holds tracked pull requests and issues, the
//! per-repository trust scores, the append-only event log and the user's
//! configuration. [`StateStore`] owns the file on disk: it rotates backups
//! before every write and falls back to the newest valid backup, then to a
//! fresh document, when the main file cannot be used.

mod config;
mod error;
mod events;
mod migrations;
mod model;
mod paths;
mod repo_scores;
mod store;

pub use config::Config;
pub use config::ConfigError;
pub use error::StateError;
pub use events::Event;
pub use events::EventLog;
pub use events::EventStats;
pub use events::EventType;
pub use migrations::CURRENT_STATE_VERSION;
pub use model::ChecklistStats;
pub use model::CiStatus;
pub use model::Digest;
pub use model::MaintainerActionHint;
pub use model::MaintainerComment;
pub use model::PrBucket;
pub use model::PrStatus;
pub use model::ReviewDecision;
pub use model::STATUS_PRIORITY;
pub use model::StateDocument;
pub use model::TrackedIssue;
pub use model::TrackedPr;
pub use paths::BACKUP_DIRNAME;
pub use paths::BACKUP_PREFIX;
pub use paths::OSSMATE_HOME_ENV;
pub use paths::STATE_FILENAME;
pub use paths::resolve_home;
pub use repo_scores::DEFAULT_REPO_SCORE;
pub use repo_scores::RepoScore;
pub use repo_scores::RepoScoreUpdate;
pub use repo_scores::RepoScores;
pub use repo_scores::RepoSignals;
pub use repo_scores::calculate_score;
pub use store::MAX_BACKUPS;
pub use store::StateStore;
