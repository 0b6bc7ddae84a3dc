//! Contribution guideline discovery and the per-repository cache in front of
//! it.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use lru::LruCache;
use ossmate_github::GithubHost;
use ossmate_github::HostError;
use ossmate_github::RepoRef;
use regex_lite::Regex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::LazyLock;
use std::sync::Mutex;
use tracing::debug;

/// Probed in order; the first file found wins.
pub const GUIDELINE_PATHS: [&str; 6] = [
    "CONTRIBUTING.md",
    ".github/CONTRIBUTING.md",
    "docs/CONTRIBUTING.md",
    "contributing.md",
    "CONTRIBUTING.rst",
    "CONTRIBUTING.txt",
];

pub const DEFAULT_CACHE_TTL: Duration = Duration::hours(1);
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

const MAX_SIGNAL_LINE_CHARS: usize = 120;

const TEST_FRAMEWORKS: &[&str] = &[
    "cargo test",
    "cargo nextest",
    "pytest",
    "jest",
    "vitest",
    "mocha",
    "go test",
    "rspec",
    "phpunit",
    "junit",
    "unittest",
];

const LINTERS: &[&str] = &[
    "clippy",
    "rustfmt",
    "eslint",
    "prettier",
    "ruff",
    "flake8",
    "black",
    "golangci-lint",
    "rubocop",
    "pylint",
];

static BRANCH_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?im)^.*\bbranch(es)?\b.*\b(name|naming|prefix)\w*\b.*$"));
static COMMIT_LINE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?im)^.*\b(conventional commits?|commit messages?)\b.*$"));
static CLA_MENTION: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?i)\b(cla|contributor license agreement)\b"));

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Covered by `parses_signals_from_guidelines`.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionGuidelines {
    /// Repository path the guidelines were read from.
    pub source_path: String,
    pub branch_naming: Option<String>,
    pub commit_message_format: Option<String>,
    pub test_framework: Option<String>,
    pub linter: Option<String>,
    pub cla_required: bool,
}

pub fn parse_guidelines(source_path: &str, text: &str) -> ContributionGuidelines {
    let lowered = text.to_lowercase();
    ContributionGuidelines {
        source_path: source_path.to_string(),
        branch_naming: first_line(&BRANCH_LINE, text),
        commit_message_format: if lowered.contains("conventional commit") {
            Some("conventional commits".to_string())
        } else {
            first_line(&COMMIT_LINE, text)
        },
        test_framework: first_keyword(&lowered, TEST_FRAMEWORKS),
        linter: first_keyword(&lowered, LINTERS),
        cla_required: CLA_MENTION.is_match(text),
    }
}

fn first_line(pattern: &Regex, text: &str) -> Option<String> {
    let line = pattern.find(text)?.as_str().trim();
    let line = line.trim_start_matches(['#', '-', '*', ' ']);
    Some(line.chars().take(MAX_SIGNAL_LINE_CHARS).collect())
}

fn first_keyword(lowered: &str, table: &[&str]) -> Option<String> {
    table
        .iter()
        .find(|keyword| contains_word(lowered, keyword))
        .map(|keyword| (*keyword).to_string())
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[derive(Debug, Clone)]
struct CachedGuidelines {
    fetched_at: DateTime<Utc>,
    guidelines: Option<ContributionGuidelines>,
}

/// Guideline lookups per repository, including "none found". Entries expire
/// after the TTL; past capacity the oldest inserted entry is evicted.
#[derive(Debug)]
pub struct GuidelineCache {
    entries: Mutex<LruCache<String, CachedGuidelines>>,
    ttl: Duration,
}

impl Default for GuidelineCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

impl GuidelineCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// `Some(None)` is a cached "no guidelines".
    pub fn get(&self, repo: &RepoRef, now: DateTime<Utc>) -> Option<Option<ContributionGuidelines>> {
        let mut entries = self.entries.lock().ok()?;
        let key = repo.key();
        // `peek` keeps eviction in insertion order.
        let cached = entries.peek(&key)?.clone();
        if now - cached.fetched_at >= self.ttl {
            entries.pop(&key);
            return None;
        }
        Some(cached.guidelines)
    }

    pub fn insert(
        &self,
        repo: &RepoRef,
        guidelines: Option<ContributionGuidelines>,
        now: DateTime<Utc>,
    ) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                repo.key(),
                CachedGuidelines {
                    fetched_at: now,
                    guidelines,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached lookup of the first guideline file in [`GUIDELINE_PATHS`].
pub async fn fetch_guidelines(
    host: &dyn GithubHost,
    repo: &RepoRef,
    cache: &GuidelineCache,
    now: DateTime<Utc>,
) -> Result<Option<ContributionGuidelines>, HostError> {
    if let Some(cached) = cache.get(repo, now) {
        debug!("guideline cache hit for {repo}");
        return Ok(cached);
    }
    let mut found = None;
    for path in GUIDELINE_PATHS {
        if let Some(text) = host.get_file_content(repo, path).await? {
            found = Some(parse_guidelines(path, &text));
            break;
        }
    }
    cache.insert(repo, found.clone(), now);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn parses_signals_from_guidelines() {
        let text = "# Contributing\n\n\
            ## Branches\nUse branch names like `fix/short-description`.\n\n\
            ## Commits\nWe follow Conventional Commits.\n\n\
            Run `cargo test` and `cargo clippy` before opening a PR.\n\
            You must sign our CLA before we can merge.\n";
        let parsed = parse_guidelines("CONTRIBUTING.md", text);
        assert_eq!(
            parsed,
            ContributionGuidelines {
                source_path: "CONTRIBUTING.md".to_string(),
                branch_naming: Some(
                    "Use branch names like `fix/short-description`.".to_string()
                ),
                commit_message_format: Some("conventional commits".to_string()),
                test_framework: Some("cargo test".to_string()),
                linter: Some("clippy".to_string()),
                cla_required: true,
            }
        );
    }

    #[test]
    fn plain_guidelines_have_no_signals() {
        let parsed = parse_guidelines("CONTRIBUTING.rst", "Be kind. Declare your intent in an issue.");
        assert_eq!(parsed.test_framework, None);
        assert_eq!(parsed.linter, None);
        assert!(!parsed.cla_required);
    }

    #[test]
    fn keyword_matching_respects_word_boundaries() {
        assert!(contains_word("run black .", "black"));
        assert!(!contains_word("blackbox testing", "black"));
    }

    #[test]
    fn cache_expires_entries_after_ttl() {
        let cache = GuidelineCache::default();
        let repo = RepoRef::new("octo", "widgets");
        cache.insert(&repo, None, now());
        assert_eq!(cache.get(&repo, now() + Duration::minutes(59)), Some(None));
        assert_eq!(cache.get(&repo, now() + Duration::hours(1)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_evicts_oldest_inserted() {
        let capacity = NonZeroUsize::new(2).expect("non-zero");
        let cache = GuidelineCache::new(capacity, DEFAULT_CACHE_TTL);
        let first = RepoRef::new("a", "one");
        let second = RepoRef::new("a", "two");
        let third = RepoRef::new("a", "three");
        cache.insert(&first, None, now());
        cache.insert(&second, None, now());
        // Reads do not refresh an entry's position.
        assert!(cache.get(&first, now()).is_some());
        cache.insert(&third, None, now());
        assert_eq!(cache.get(&first, now()), None);
        assert!(cache.get(&second, now()).is_some());
        assert_eq!(cache.len(), 2);
    }
}
