use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefParseError {
    #[error("expected `owner/repo`, got {0:?}")]
    InvalidRepo(String),
    #[error("not a GitHub issue or pull request URL: {0:?}")]
    InvalidUrl(String),
}

/// `owner/repo` pair. Both halves keep the casing they were given; use
/// [`RepoRef::key`] for map lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RefParseError> {
        let trimmed = raw.trim().trim_matches('/');
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(RefParseError::InvalidRepo(raw.to_string())),
        }
    }

    /// Extracts the repository from an API `repository_url`
    /// (`https://api.github.com/repos/{owner}/{repo}`).
    pub fn from_api_url(api_url: &str) -> Result<Self, RefParseError> {
        let (_, tail) = api_url
            .split_once("/repos/")
            .ok_or_else(|| RefParseError::InvalidUrl(api_url.to_string()))?;
        Self::parse(tail).map_err(|_| RefParseError::InvalidUrl(api_url.to_string()))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Lower-cased `owner/repo`, the key format used by the state store.
    pub fn key(&self) -> String {
        self.full_name().to_ascii_lowercase()
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An issue or pull request addressed by repository and number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueRef {
    pub repo: RepoRef,
    pub number: u64,
}

impl IssueRef {
    /// Parses `https://github.com/{owner}/{repo}/(issues|pull)/{number}`,
    /// tolerating trailing path segments, fragments and query strings.
    pub fn parse_url(raw: &str) -> Result<Self, RefParseError> {
        let invalid = || RefParseError::InvalidUrl(raw.to_string());
        let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [owner, name, "issues" | "pull" | "pulls", number, ..] => {
                let number = number.parse::<u64>().map_err(|_| invalid())?;
                Ok(Self {
                    repo: RepoRef::new(*owner, *name),
                    number,
                })
            }
            _ => Err(invalid()),
        }
    }

    pub fn issue_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/issues/{}",
            self.repo.owner, self.repo.name, self.number
        )
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_pull_and_issue_urls() {
        let pr = IssueRef::parse_url("https://github.com/rust-lang/cargo/pull/1234/files")
            .expect("pull url");
        assert_eq!(pr.repo, RepoRef::new("rust-lang", "cargo"));
        assert_eq!(pr.number, 1234);

        let issue = IssueRef::parse_url("https://github.com/tokio-rs/tokio/issues/7#issuecomment-1")
            .expect("issue url");
        assert_eq!(issue.to_string(), "tokio-rs/tokio#7");
    }

    #[test]
    fn rejects_non_issue_urls() {
        assert!(IssueRef::parse_url("https://github.com/tokio-rs/tokio").is_err());
        assert!(IssueRef::parse_url("https://github.com/a/b/issues/abc").is_err());
        assert!(IssueRef::parse_url("not a url").is_err());
    }

    #[test]
    fn repo_from_api_url_and_key() {
        let repo = RepoRef::from_api_url("https://api.github.com/repos/Serde-RS/json")
            .expect("api url");
        assert_eq!(repo.full_name(), "Serde-RS/json");
        assert_eq!(repo.key(), "serde-rs/json");
        assert!(RepoRef::parse("only-owner").is_err());
    }
}
