use crate::events::EventType;
use crate::model::PrBucket;
use crate::model::StateDocument;
use crate::model::repo_from_url;
use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use serde_json::json;
use tracing::info;

pub const CURRENT_STATE_VERSION: u32 = 2;

const LEGACY_PR_ARRAYS: [&str; 4] = ["activePRs", "dormantPRs", "mergedPRs", "closedPRs"];

/// Structural checks on the raw JSON before typed decoding. Returns the
/// document version.
pub(crate) fn validate(value: &Value) -> Result<u32, String> {
    let Some(object) = value.as_object() else {
        return Err("document is not a JSON object".to_string());
    };
    let version = object
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| "missing numeric `version`".to_string())?;
    let version = u32::try_from(version).map_err(|_| format!("version {version} out of range"))?;
    if version == 0 {
        return Err("version 0 is not a valid schema version".to_string());
    }
    if version > CURRENT_STATE_VERSION {
        return Err(format!(
            "version {version} is newer than supported version {CURRENT_STATE_VERSION}"
        ));
    }
    if !object.get("repoScores").is_some_and(Value::is_object) {
        return Err("`repoScores` must be an object".to_string());
    }
    if !object.get("events").is_some_and(Value::is_array) {
        return Err("`events` must be an array".to_string());
    }
    if object.get("config").is_none_or(Value::is_null) {
        return Err("`config` is missing".to_string());
    }
    if version == 1 {
        for key in LEGACY_PR_ARRAYS {
            if !object.get(key).is_some_and(Value::is_array) {
                return Err(format!("version 1 document requires `{key}` array"));
            }
        }
    }
    Ok(version)
}

/// Validates, decodes and migrates a raw document. The second element is the
/// version migrated from, if any.
pub(crate) fn decode(
    value: Value,
    now: DateTime<Utc>,
) -> Result<(StateDocument, Option<u32>), String> {
    validate(&value)?;
    let mut doc: StateDocument =
        serde_json::from_value(value).map_err(|err| format!("failed to decode: {err}"))?;
    let migrated_from = migrate(&mut doc, now);
    Ok((doc, migrated_from))
}

/// Brings `doc` up to [`CURRENT_STATE_VERSION`] in place.
pub(crate) fn migrate(doc: &mut StateDocument, now: DateTime<Utc>) -> Option<u32> {
    let from = doc.version;
    if from >= CURRENT_STATE_VERSION {
        return None;
    }
    if doc.version < 2 {
        migrate_v1_to_v2(doc, now);
    }
    doc.record_event(
        EventType::StateMigrated,
        json!({ "from": from, "to": doc.version }),
        now,
    );
    info!(from, to = doc.version, "migrated state document");
    Some(from)
}

/// v2 re-fetches open PRs on every sync, so the stale active list is dropped.
/// Repositories seen in the merged/closed history get a default score.
fn migrate_v1_to_v2(doc: &mut StateDocument, now: DateTime<Utc>) {
    let repos: Vec<String> = [PrBucket::Merged, PrBucket::Closed]
        .iter()
        .flat_map(|bucket| doc.prs(*bucket).iter())
        .filter_map(|pr| {
            if pr.repo.is_empty() {
                repo_from_url(&pr.url)
            } else {
                Some(pr.repo.clone())
            }
        })
        .collect();
    let mut created = 0;
    for repo in repos {
        if doc.repo_scores.ensure(&repo, now) {
            created += 1;
        }
    }
    let cleared = doc.clear_active_prs();
    doc.version = 2;
    info!(created, cleared, "applied v1 -> v2 migration");
}
