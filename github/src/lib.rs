//! Remote repository host for ossmate.
//!
//! [`GithubHost`] is the seam the classifier, vetting engine and search
//! orchestrator talk to; [`GithubClient`] is the REST implementation used by
//! the binary. Tests elsewhere in the workspace substitute in-memory hosts.

mod client;
mod error;
mod host;
mod refs;
pub mod types;

pub use client::DEFAULT_API_BASE;
pub use client::GithubClient;
pub use client::RetryConfig;
pub use error::HostError;
pub use error::HostErrorKind;
pub use host::GithubHost;
pub use refs::IssueRef;
pub use refs::RefParseError;
pub use refs::RepoRef;
