use crate::error::StateError;
use crate::migrations::decode;
use crate::model::StateDocument;
use crate::paths::BACKUP_DIRNAME;
use crate::paths::STATE_FILENAME;
use crate::paths::backup_file_name;
use crate::paths::list_backup_files;
use chrono::DateTime;
use chrono::Utc;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::info;
use tracing::warn;

/// Backups kept after every save; older ones are deleted.
pub const MAX_BACKUPS: usize = 10;

/// Owns `state.json` and its `backups/` directory under one home directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    home: PathBuf,
    state_path: PathBuf,
    backup_dir: PathBuf,
}

impl StateStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            state_path: home.join(STATE_FILENAME),
            backup_dir: home.join(BACKUP_DIRNAME),
            home,
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Loads the document, falling back to the newest valid backup and then
    /// to a fresh document. Never fails; every recovery step is logged.
    pub fn load(&self) -> StateDocument {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> StateDocument {
        let main_missing = match read_document(&self.state_path, now) {
            Ok((doc, _)) => return doc,
            Err(err) if err.is_missing_file() => true,
            Err(err) => {
                warn!("state file unusable, trying backups: {err}");
                false
            }
        };

        let backups = match list_backup_files(&self.backup_dir) {
            Ok(backups) => backups,
            Err(err) => {
                warn!(
                    "failed to list backups in {}: {err}",
                    self.backup_dir.display()
                );
                Vec::new()
            }
        };
        if main_missing && backups.is_empty() {
            info!(
                "no state file at {}; starting fresh",
                self.state_path.display()
            );
            return StateDocument::default();
        }

        for backup in backups {
            match read_document(&backup, now) {
                Ok((doc, _)) => {
                    info!("restored state from backup {}", backup.display());
                    if let Err(err) = self.write_main(&doc) {
                        warn!("failed to rewrite state file from backup: {err}");
                    }
                    return doc;
                }
                Err(err) => warn!("skipping backup: {err}"),
            }
        }

        warn!("no valid state file or backup found; starting fresh");
        StateDocument::default()
    }

    /// Stamps `last_run_at`, snapshots the current file into `backups/` and
    /// atomically replaces it. The file is left untouched if the snapshot
    /// fails.
    pub fn save(&self, doc: &mut StateDocument) -> Result<(), StateError> {
        self.save_at(doc, Utc::now())
    }

    pub fn save_at(&self, doc: &mut StateDocument, now: DateTime<Utc>) -> Result<(), StateError> {
        doc.last_run_at = Some(now);
        let contents = serde_json::to_string_pretty(doc).map_err(StateError::Serialize)?;
        std::fs::create_dir_all(&self.home)
            .map_err(|err| StateError::io("failed to create", &self.home, err))?;
        self.backup_current(now)?;
        write_atomically(&self.state_path, &contents)?;
        self.prune_backups();
        Ok(())
    }

    /// Backup files, newest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, StateError> {
        list_backup_files(&self.backup_dir)
            .map_err(|err| StateError::io("failed to list", &self.backup_dir, err))
    }

    /// Validates `backup` and installs it as the state file. The current file
    /// is itself backed up first so the restore can be undone.
    pub fn restore_backup(&self, backup: &Path) -> Result<StateDocument, StateError> {
        let now = Utc::now();
        let (doc, _) = read_document(backup, now)?;
        self.backup_current(now)?;
        self.write_main(&doc)?;
        self.prune_backups();
        info!("restored state from {}", backup.display());
        Ok(doc)
    }

    fn write_main(&self, doc: &StateDocument) -> Result<(), StateError> {
        let contents = serde_json::to_string_pretty(doc).map_err(StateError::Serialize)?;
        write_atomically(&self.state_path, &contents)
    }

    fn backup_current(&self, now: DateTime<Utc>) -> Result<Option<PathBuf>, StateError> {
        match std::fs::metadata(&self.state_path) {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StateError::io("failed to stat", &self.state_path, err)),
        }
        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|err| StateError::io("failed to create", &self.backup_dir, err))?;

        // Names have millisecond resolution; step forward on collision.
        let mut at = now;
        let mut path = self.backup_dir.join(backup_file_name(at));
        while path.exists() {
            at += chrono::Duration::milliseconds(1);
            path = self.backup_dir.join(backup_file_name(at));
        }
        std::fs::copy(&self.state_path, &path)
            .map_err(|err| StateError::io("failed to back up state to", &path, err))?;
        Ok(Some(path))
    }

    fn prune_backups(&self) -> usize {
        let backups = match list_backup_files(&self.backup_dir) {
            Ok(backups) => backups,
            Err(err) => {
                warn!("failed to list backups for cleanup: {err}");
                return 0;
            }
        };
        let mut removed = 0;
        for stale in backups.into_iter().skip(MAX_BACKUPS) {
            match std::fs::remove_file(&stale) {
                Ok(()) => removed += 1,
                Err(err) => warn!("failed to remove old backup {}: {err}", stale.display()),
            }
        }
        removed
    }
}

fn read_document(
    path: &Path,
    now: DateTime<Utc>,
) -> Result<(StateDocument, Option<u32>), StateError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| StateError::io("failed to read", path, err))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    decode(value, now).map_err(|reason| StateError::invalid(path, reason))
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), StateError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|err| StateError::io("failed to create", parent, err))?;
    let tmp = NamedTempFile::new_in(parent)
        .map_err(|err| StateError::io("failed to create temp file in", parent, err))?;
    std::fs::write(tmp.path(), contents)
        .map_err(|err| StateError::io("failed to write", tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| StateError::io("failed to replace", path, err.error))?;
    Ok(())
}
