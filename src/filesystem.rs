use crate::db::{RecordStore, StoreHandle};
use crate::errors::{AppError, AppResult};
use crate::models::{
    DeleteOutcome, DirectoryEntry, EntryKind, FileContent, FileRecord, OperationWarning, SaveOutcome, WarningKind,
};
use crate::paths::{
    backup_path, backup_path_with_suffix, get_directory, get_file_name, is_backup_directory, normalize_directory,
    validate_file_path, BACKUP_DIR,
};
use crate::templates::initial_content;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_BACKUP_SUFFIX: u32 = 1_000;

/// Hierarchical view over the flat record store. Directories are never stored;
/// they are inferred from the `directory` field of file records.
#[derive(Clone, Debug)]
pub struct FileSystem {
    handle: Arc<StoreHandle>,
}

impl FileSystem {
    pub fn new(handle: Arc<StoreHandle>) -> Self {
        Self { handle }
    }

    pub fn from_store(store: Arc<dyn RecordStore>) -> Self {
        Self::new(Arc::new(StoreHandle::from_store(store)))
    }

    /// Opens the underlying store now instead of on first use.
    pub fn open(&self) -> AppResult<()> {
        self.store().map(|_| ())
    }

    fn store(&self) -> AppResult<Arc<dyn RecordStore>> {
        self.handle.open()
    }

    pub fn list_files(&self, directory: &str) -> AppResult<Vec<DirectoryEntry>> {
        let directory = normalize_directory(directory);
        tracing::debug!(directory = %directory, "listing files");
        let records = self.store()?.get_all()?;

        let mut items: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        for record in records {
            if record.directory == directory {
                items.insert(
                    record.path.clone(),
                    DirectoryEntry {
                        name: record.name,
                        kind: EntryKind::File,
                        path: record.path,
                    },
                );
            } else if record.directory.starts_with(&directory) {
                let relative = &record.directory[directory.len()..];
                let Some(dir_name) = relative.split('/').next().filter(|name| !name.is_empty()) else {
                    continue;
                };
                let dir_path = format!("{}{}/", directory, dir_name);
                items.entry(dir_path.clone()).or_insert_with(|| DirectoryEntry {
                    name: dir_name.to_string(),
                    kind: EntryKind::Directory,
                    path: dir_path,
                });
            }
        }

        let mut entries = items.into_values().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    pub fn get_file(&self, path: &str) -> AppResult<Option<FileRecord>> {
        tracing::debug!(path = %path, "reading file");
        self.store()?.get(path)
    }

    pub fn save_file(&self, path: &str, content: impl Into<FileContent>) -> AppResult<SaveOutcome> {
        validate_file_path(path)?;
        let content = content.into().into_text()?;
        let store = self.store()?;
        tracing::info!(path = %path, "saving file");

        let mut warnings = Vec::new();
        let existing = match store.get(path) {
            Ok(existing) => existing,
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "could not read file before save");
                warnings.push(OperationWarning {
                    kind: WarningKind::ReadBeforeWriteFailed,
                    path: path.to_string(),
                    message: error.to_string(),
                });
                None
            }
        };

        let mut backup = None;
        if let Some(existing) = existing
            .as_ref()
            .filter(|existing| existing.content != content && !is_backup_directory(&existing.directory))
        {
            match self.write_backup(store.as_ref(), existing) {
                Ok(record) => backup = Some(record),
                Err(error) => {
                    tracing::warn!(path = %path, error = %error, "backup failed, proceeding with save");
                    warnings.push(OperationWarning {
                        kind: WarningKind::BackupFailed,
                        path: path.to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }

        let record = FileRecord {
            path: path.to_string(),
            directory: get_directory(path).to_string(),
            name: get_file_name(path).to_string(),
            content,
            timestamp: Utc::now().timestamp_millis(),
        };
        store.put(&record)?;
        tracing::info!(path = %path, backup = backup.is_some(), "file saved");

        Ok(SaveOutcome {
            record,
            backup,
            warnings,
        })
    }

    pub fn delete_file(&self, path: &str) -> AppResult<DeleteOutcome> {
        validate_file_path(path)?;
        let store = self.store()?;
        tracing::info!(path = %path, "deleting file");

        let mut warnings = Vec::new();
        let existing = match store.get(path) {
            Ok(existing) => existing,
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "could not read file before delete");
                warnings.push(OperationWarning {
                    kind: WarningKind::ReadBeforeWriteFailed,
                    path: path.to_string(),
                    message: error.to_string(),
                });
                None
            }
        };

        let mut backup = None;
        match existing.as_ref() {
            Some(existing) if !is_backup_directory(&existing.directory) => {
                match self.write_backup(store.as_ref(), existing) {
                    Ok(record) => backup = Some(record),
                    Err(error) => {
                        tracing::warn!(path = %path, error = %error, "backup failed, proceeding with delete");
                        warnings.push(OperationWarning {
                            kind: WarningKind::BackupFailed,
                            path: path.to_string(),
                            message: error.to_string(),
                        });
                    }
                }
            }
            Some(_) => tracing::info!(path = %path, "deleting backup file, no further backup"),
            None => tracing::debug!(path = %path, "no existing record to back up"),
        }

        store.delete(path)?;
        tracing::info!(path = %path, "file deleted");

        Ok(DeleteOutcome {
            path: path.to_string(),
            existed: existing.is_some(),
            backup,
            warnings,
        })
    }

    /// Creates a new file with content chosen from its location and extension.
    pub fn create_file(&self, path: &str) -> AppResult<SaveOutcome> {
        validate_file_path(path)?;
        if is_backup_directory(get_directory(path)) {
            return Err(AppError::InvalidPath(format!("cannot create files in {}", BACKUP_DIR)));
        }
        if self.get_file(path)?.is_some() {
            return Err(AppError::AlreadyExists(path.to_string()));
        }
        self.save_file(path, initial_content(path)?)
    }

    fn write_backup(&self, store: &dyn RecordStore, existing: &FileRecord) -> AppResult<FileRecord> {
        let path = resolve_backup_path(store, existing)?;
        let backup = FileRecord {
            directory: BACKUP_DIR.to_string(),
            name: get_file_name(&path).to_string(),
            path,
            content: existing.content.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        store.put(&backup)?;
        tracing::info!(path = %existing.path, backup = %backup.path, "backup created");
        Ok(backup)
    }
}

/// Picks the backup path for `existing`. A taken name is reused only when it
/// already holds the same content; otherwise a numeric suffix is appended.
fn resolve_backup_path(store: &dyn RecordStore, existing: &FileRecord) -> AppResult<String> {
    let candidate = backup_path(&existing.name, existing.timestamp);
    if is_free_for(store, &candidate, &existing.content)? {
        return Ok(candidate);
    }
    for suffix in 1..=MAX_BACKUP_SUFFIX {
        let candidate = backup_path_with_suffix(&existing.name, existing.timestamp, suffix);
        if is_free_for(store, &candidate, &existing.content)? {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(format!(
        "no free backup name for {} after {} attempts",
        existing.path, MAX_BACKUP_SUFFIX
    )))
}

fn is_free_for(store: &dyn RecordStore, candidate: &str, content: &str) -> AppResult<bool> {
    Ok(match store.get(candidate)? {
        None => true,
        Some(taken) => taken.content == content,
    })
}
