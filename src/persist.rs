//! Persistence engine: snapshot load and atomic save.
//!
//! The on-disk format is a single JSON object keyed by store key, each
//! value a record of `{"value": V, "expire_at": <unix nanos>}` with
//! `expire_at` omitted for permanent entries. Snapshots are installed
//! with a write-temp-then-rename protocol, so a reader never observes a
//! partially written file at the canonical path.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use crate::storage::Db;

impl<V> Db<V> {
    /// Populate the map from the snapshot file.
    ///
    /// Memory-only stores and missing files succeed as empty loads; an
    /// empty file keeps the current in-memory state. Any other read or
    /// parse failure is surfaced, aborting construction. On success the
    /// parsed mapping fully replaces the in-memory state and the store
    /// is clean (in sync with disk by definition).
    pub(crate) async fn load(&self) -> StoreResult<()>
    where
        V: DeserializeOwned,
    {
        let path = match self.path.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        if bytes.is_empty() {
            return Ok(());
        }

        let entries: IndexMap<String, Entry<V>> = serde_json::from_slice(&bytes)?;

        if let Some(mut state) = self.write_lock() {
            self.stats.set_size(entries.len() as u64);
            state.entries = entries;
            state.dirty = false;
        }
        Ok(())
    }

    /// Snapshot the full map to disk.
    ///
    /// No-op success for memory-only stores and when the store is clean.
    /// The map is serialized while the exclusive lock is held; the dirty
    /// flag is then cleared and the lock released *before* any file I/O,
    /// so a mutation landing mid-write re-marks the store dirty and is
    /// captured by the next cycle rather than lost. If the write or the
    /// rename fails, the dirty flag is restored and the error returned.
    ///
    /// Expired-but-unswept entries are serialized as-is; sweeping before
    /// saving is the caller's job.
    pub(crate) async fn save(&self) -> StoreResult<()>
    where
        V: Serialize,
    {
        let path = match self.path.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };

        let bytes = {
            let mut state = match self.write_lock() {
                Some(state) => state,
                None => return Ok(()), // Lock poisoned, nothing sane to persist
            };
            if !state.dirty {
                return Ok(());
            }

            let serialized = if self.pretty {
                serde_json::to_vec_pretty(&state.entries)
            } else {
                serde_json::to_vec(&state.entries)
            };
            match serialized {
                Ok(bytes) => {
                    // Cleared before the write on purpose: see above.
                    state.dirty = false;
                    bytes
                }
                // Dirty stays set so a later save retries.
                Err(err) => return Err(StoreError::Serialization(err)),
            }
        };

        let tmp = tmp_path(path);
        let written = match fs::write(&tmp, &bytes).await {
            Ok(()) => fs::rename(&tmp, path).await,
            Err(err) => Err(err),
        };

        match written {
            Ok(()) => {
                self.stats.record_save();
                debug!(path = %path.display(), bytes = bytes.len(), "snapshot installed");
                Ok(())
            }
            Err(err) => {
                // The canonical file is untouched; restore the dirty
                // flag so the next cycle retries.
                if let Some(mut state) = self.write_lock() {
                    state.dirty = true;
                }
                Err(StoreError::Io(err))
            }
        }
    }
}

/// `<path>.tmp` alongside the target, so the rename never crosses a
/// filesystem boundary.
fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
