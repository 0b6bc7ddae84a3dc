//! Root of the `ossmate-core` library.
//!
//! Pull request sync and classification, issue vetting and the prioritized
//! issue search, all written against [`ossmate_github::GithubHost`] and
//! operating on an [`ossmate_state::StateDocument`] the caller loads and
//! saves.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output goes through the binary or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod checklist;
pub mod ci;
pub mod classify;
pub mod error;
mod fanout;
pub mod operations;
pub mod report;
pub mod search;
pub mod status;
pub mod sync;
pub mod test_support;
pub mod timeline;
pub mod vetting;

pub use error::CoreError;
pub use error::ItemFailure;
pub use error::Result;
pub use fanout::MAX_IN_FLIGHT;
pub use fanout::run_bounded;
pub use operations::event_stats;
pub use operations::read_config;
pub use operations::track_issue;
pub use operations::untrack_issue;
pub use operations::update_repo_score;
pub use operations::vet_issue;
pub use operations::write_config;
pub use report::REPORT_FILENAME;
pub use search::DEFAULT_MAX_RESULTS;
pub use search::SearchReport;
pub use search::search_issues;
pub use status::Thresholds;
pub use sync::SyncReport;
pub use sync::sync_prs;
pub use sync::untrack_pr;
pub use vetting::IssueCandidate;
pub use vetting::IssueVetter;
pub use vetting::Recommendation;
pub use vetting::SearchPriority;
