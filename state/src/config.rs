use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_DORMANT_THRESHOLD_DAYS: u32 = 30;
pub const DEFAULT_APPROACHING_DORMANT_DAYS: u32 = 25;
pub const DEFAULT_MIN_REPO_SCORE_THRESHOLD: u8 = 7;
pub const DEFAULT_LOW_REPO_SCORE_THRESHOLD: u8 = 3;
pub const DEFAULT_MAX_ISSUE_AGE_DAYS: u32 = 90;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown config key `{0}`")]
    UnknownKey(String),

    #[error("config key `{0}` cannot be set directly")]
    ReadOnly(String),

    #[error("invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
}

/// User settings persisted in the `config` section of the state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// GitHub login whose pull requests are tracked.
    pub github_username: Option<String>,
    /// Days without activity after which a PR is dormant.
    pub dormant_threshold_days: u32,
    /// Days without activity after which a PR is flagged as approaching
    /// dormancy. Always below `dormant_threshold_days`.
    pub approaching_dormant_days: u32,
    /// Repositories at or above this score are searched before the rest of
    /// GitHub.
    pub min_repo_score_threshold: u8,
    /// Repositories at or below this score are excluded from search.
    pub low_repo_score_threshold: u8,
    pub max_issue_age_days: u32,
    pub labels: Vec<String>,
    pub languages: Vec<String>,
    pub excluded_repos: Vec<String>,
    /// Cached starred repositories, refreshed by issue search.
    pub starred_repos: Vec<String>,
    pub starred_repos_fetched_at: Option<DateTime<Utc>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_username: None,
            dormant_threshold_days: DEFAULT_DORMANT_THRESHOLD_DAYS,
            approaching_dormant_days: DEFAULT_APPROACHING_DORMANT_DAYS,
            min_repo_score_threshold: DEFAULT_MIN_REPO_SCORE_THRESHOLD,
            low_repo_score_threshold: DEFAULT_LOW_REPO_SCORE_THRESHOLD,
            max_issue_age_days: DEFAULT_MAX_ISSUE_AGE_DAYS,
            labels: vec!["good first issue".to_string(), "help wanted".to_string()],
            languages: Vec::new(),
            excluded_repos: Vec::new(),
            starred_repos: Vec::new(),
            starred_repos_fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    OptionalString,
    Integer,
    List,
    ReadOnly,
}

/// `(camelCase name, snake_case alias, kind)`.
const KEYS: &[(&str, &str, ValueKind)] = &[
    ("githubUsername", "github_username", ValueKind::OptionalString),
    ("dormantThresholdDays", "dormant_threshold_days", ValueKind::Integer),
    ("approachingDormantDays", "approaching_dormant_days", ValueKind::Integer),
    ("minRepoScoreThreshold", "min_repo_score_threshold", ValueKind::Integer),
    ("lowRepoScoreThreshold", "low_repo_score_threshold", ValueKind::Integer),
    ("maxIssueAgeDays", "max_issue_age_days", ValueKind::Integer),
    ("labels", "labels", ValueKind::List),
    ("languages", "languages", ValueKind::List),
    ("excludedRepos", "excluded_repos", ValueKind::List),
    ("starredRepos", "starred_repos", ValueKind::ReadOnly),
    ("starredReposFetchedAt", "starred_repos_fetched_at", ValueKind::ReadOnly),
];

fn resolve(key: &str) -> Result<(&'static str, ValueKind), ConfigError> {
    KEYS.iter()
        .find(|(camel, snake, _)| *camel == key || *snake == key)
        .map(|(camel, _, kind)| (*camel, *kind))
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

impl Config {
    /// Every key accepted by [`Config::get`], in camelCase.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        KEYS.iter().map(|(camel, _, _)| *camel)
    }

    /// Current value of `key` (camelCase or snake_case) as JSON.
    pub fn get(&self, key: &str) -> Result<Value, ConfigError> {
        let (name, _) = resolve(key)?;
        let value = serde_json::to_value(self).map_err(|err| invalid(name, err))?;
        Ok(value.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Parses `raw` for `key`, applies it to a copy of the serialized config
    /// and replaces `self` only when the result decodes and validates.
    /// Returns the stored value.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<Value, ConfigError> {
        let (name, kind) = resolve(key)?;
        let new_value = match kind {
            ValueKind::ReadOnly => return Err(ConfigError::ReadOnly(name.to_string())),
            ValueKind::OptionalString => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    Value::String(trimmed.to_string())
                }
            }
            ValueKind::Integer => {
                let parsed: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: name.to_string(),
                    message: format!("expected a non-negative integer, got `{raw}`"),
                })?;
                Value::from(parsed)
            }
            ValueKind::List => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
        };

        let mut patched = serde_json::to_value(&*self).map_err(|err| invalid(name, err))?;
        if let Value::Object(map) = &mut patched {
            map.insert(name.to_string(), new_value.clone());
        }
        let updated: Config = serde_json::from_value(patched).map_err(|err| invalid(name, err))?;
        updated.validate()?;
        *self = updated;
        Ok(new_value)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dormant_threshold_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "dormantThresholdDays".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.approaching_dormant_days >= self.dormant_threshold_days {
            return Err(ConfigError::InvalidValue {
                key: "approachingDormantDays".to_string(),
                message: format!(
                    "must be below dormantThresholdDays ({})",
                    self.dormant_threshold_days
                ),
            });
        }
        for (key, value) in [
            ("minRepoScoreThreshold", self.min_repo_score_threshold),
            ("lowRepoScoreThreshold", self.low_repo_score_threshold),
        ] {
            if !(1..=10).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be between 1 and 10".to_string(),
                });
            }
        }
        if self.max_issue_age_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "maxIssueAgeDays".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_excluded(&self, repo: &str) -> bool {
        self.excluded_repos
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(repo))
    }
}

fn invalid(key: &str, err: serde_json::Error) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn defaults_round_trip_through_camel_case() {
        let value = serde_json::to_value(Config::default()).expect("encode");
        assert_eq!(value["dormantThresholdDays"], json!(30));
        assert_eq!(value["labels"], json!(["good first issue", "help wanted"]));
        let partial: Config = serde_json::from_value(json!({"githubUsername": "me"})).expect("decode");
        assert_eq!(partial.github_username.as_deref(), Some("me"));
        assert_eq!(partial.min_repo_score_threshold, 7);
    }

    #[test]
    fn set_accepts_either_key_style() {
        let mut config = Config::default();
        assert_eq!(config.set("github_username", " octocat ").expect("set"), json!("octocat"));
        assert_eq!(config.get("githubUsername").expect("get"), json!("octocat"));

        config.set("languages", "rust, go,,").expect("set list");
        assert_eq!(config.languages, vec!["rust".to_string(), "go".to_string()]);

        config.set("maxIssueAgeDays", "60").expect("set integer");
        assert_eq!(config.max_issue_age_days, 60);
    }

    #[test]
    fn rejected_values_leave_config_untouched() {
        let mut config = Config::default();
        assert_eq!(
            config.set("approachingDormantDays", "45"),
            Err(ConfigError::InvalidValue {
                key: "approachingDormantDays".to_string(),
                message: "must be below dormantThresholdDays (30)".to_string(),
            })
        );
        assert!(matches!(
            config.set("dormantThresholdDays", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("minRepoScoreThreshold", "300"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config.set("nope", "1"), Err(ConfigError::UnknownKey("nope".to_string())));
        assert_eq!(
            config.set("starredRepos", "a/b"),
            Err(ConfigError::ReadOnly("starredRepos".to_string()))
        );
        assert_eq!(config, Config::default());
    }

    #[test]
    fn excluded_repos_match_case_insensitively() {
        let mut config = Config::default();
        config.set("excludedRepos", "Octo/Widgets").expect("set");
        assert!(config.is_excluded("octo/widgets"));
        assert!(!config.is_excluded("octo/gadgets"));
    }
}
