use crate::error::StateError;
use chrono::DateTime;
use chrono::Utc;
use std::path::Path;
use std::path::PathBuf;

/// Relocates the data directory away from `~/.ossmate`.
pub const OSSMATE_HOME_ENV: &str = "OSSMATE_HOME";
const DEFAULT_HOME_DIRNAME: &str = ".ossmate";

pub const STATE_FILENAME: &str = "state.json";
pub const BACKUP_DIRNAME: &str = "backups";
pub const BACKUP_PREFIX: &str = "state-";
const BACKUP_SUFFIX: &str = ".json";

/// Directory holding `state.json`, its backups and generated reports.
///
/// `OSSMATE_HOME` wins over `~/.ossmate`. A leading `~` in the override
/// expands to the user's home and relative overrides are made absolute. The
/// directory and its `backups/` are created when missing.
pub fn resolve_home() -> Result<PathBuf, StateError> {
    let override_dir = std::env::var(OSSMATE_HOME_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty());
    resolve_home_from(override_dir.as_deref(), dirs::home_dir())
}

fn resolve_home_from(
    override_dir: Option<&str>,
    user_home: Option<PathBuf>,
) -> Result<PathBuf, StateError> {
    let home = match override_dir.map(str::trim) {
        Some("~") => user_home.ok_or(StateError::NoHomeDir)?,
        Some(value) => match value.strip_prefix("~/") {
            Some(rest) => user_home.ok_or(StateError::NoHomeDir)?.join(rest),
            None => std::path::absolute(value)
                .map_err(|err| StateError::io("failed to resolve", value, err))?,
        },
        None => user_home
            .ok_or(StateError::NoHomeDir)?
            .join(DEFAULT_HOME_DIRNAME),
    };

    match std::fs::metadata(&home) {
        Ok(metadata) if !metadata.is_dir() => return Err(StateError::NotADirectory(home)),
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(StateError::io("failed to read", home, err)),
    }
    let backups = home.join(BACKUP_DIRNAME);
    std::fs::create_dir_all(&backups)
        .map_err(|err| StateError::io("failed to create", &backups, err))?;
    Ok(home)
}

/// Backup names embed a UTC timestamp that sorts lexicographically in time
/// order, e.g. `state-20260314T091502.123Z.json`.
pub(crate) fn backup_file_name(at: DateTime<Utc>) -> String {
    format!(
        "{BACKUP_PREFIX}{}{BACKUP_SUFFIX}",
        at.format("%Y%m%dT%H%M%S%.3fZ")
    )
}

pub(crate) fn is_backup_file_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)
}

/// Backups under `dir`, newest first. A missing directory yields nothing.
pub(crate) fn list_backup_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_backup_file_name(name))
        .collect();
    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}
