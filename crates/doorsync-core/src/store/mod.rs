// ── JSON state stores ──
//
// Small on-disk JSON blobs, one concern per file. Every write is atomic
// (write `.tmp`, rename) so dashboard and sync-side readers never observe
// a torn file.

pub mod approvals;
pub mod cancellations;
pub mod event_memory;
pub mod mapping;
pub mod office_hours;
pub mod overrides;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::SyncError;

/// Load a state blob, falling back to its default when the file is missing
/// or unreadable. Corruption is logged, never fatal.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "state file unreadable; using default");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "state file corrupt; using default");
            T::default()
        }
    }
}

/// Serialize and write a state blob atomically: write `.tmp`, then rename.
/// Rename is atomic on the same filesystem, so readers see old or new,
/// never a partial write. Parent directories are created as needed.
pub fn save_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
        body.push(b'\n');

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &body)?;
        std::fs::rename(&tmp, path)
    };

    write().map_err(|source| SyncError::StateWriteFailed {
        path: path.display().to_string(),
        source,
    })
}
