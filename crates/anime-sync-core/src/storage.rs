//! JSON persistence shared by every store.
//!
//! Writes go to a sibling temp file that is renamed over the target, so a
//! reader sees either the previous snapshot or the new one. A file that
//! cannot be parsed is copied aside to `*.bak` (or `*.bak.N` when earlier
//! backups exist) and treated as absent.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::SyncError;

/// Read and parse a JSON file. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Cache miss: {} (file does not exist)", path.display());
            return Ok(None);
        }
        Err(e) => return Err(SyncError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| SyncError::MalformedCache {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Like `read_json`, but a malformed file is backed up and reported as
/// absent so the store gets rebuilt on this pass
pub fn load_or_recover<T: DeserializeOwned>(path: &Path, label: &str) -> Result<Option<T>, SyncError> {
    match read_json(path) {
        Err(SyncError::MalformedCache { path, reason }) => {
            let backup = backup_path(&path);
            match fs::copy(&path, &backup) {
                Ok(_) => warn!(
                    "Cache corruption detected for {}: {}. Backed up to {} and starting empty.",
                    label,
                    reason,
                    backup.display()
                ),
                Err(e) => warn!(
                    "Cache corruption detected for {}: {}. Backup failed ({}); starting empty.",
                    label, reason, e
                ),
            }
            Ok(None)
        }
        other => other,
    }
}

/// Serialize and atomically replace `path`
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let temp_path = temp_path(path);
    {
        let mut file = File::create(&temp_path).map_err(|e| SyncError::io(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| SyncError::io(&temp_path, e))?;
    }
    fs::rename(&temp_path, path).map_err(|e| SyncError::io(path, e))?;

    info!("Saved {} ({} bytes)", path.display(), json.len());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, "tmp")
}

/// First unused backup name; earlier backups are never overwritten
fn backup_path(path: &Path) -> PathBuf {
    let first = with_suffix(path, "bak");
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| with_suffix(path, &format!("bak.{}", n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
