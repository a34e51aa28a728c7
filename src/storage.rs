//! Internal storage state for the store.
//!
//! This module holds the authoritative in-memory map behind a single
//! readers-writer lock scoped to the whole map (no per-key locking, no
//! sharding). The dirty flag lives inside the same lock, so every
//! mutation and its dirty transition are one atomic step.

use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::entry::{now_nanos, Entry};
use crate::stats::StoreStats;

/// Map state plus the dirty flag, guarded together.
///
/// `dirty` is true whenever the map has diverged from the last snapshot
/// known to be fully installed on disk.
pub(crate) struct State<V> {
    pub(crate) entries: IndexMap<String, Entry<V>>,
    pub(crate) dirty: bool,
}

/// Thread-safe inner store shared between caller handles and the
/// background task.
///
/// This is the internal implementation; users interact with
/// [`Store`](crate::Store) instead.
pub(crate) struct Db<V> {
    /// The map and its dirty flag, protected by one read-write lock.
    pub(crate) state: RwLock<State<V>>,

    /// Snapshot target. `None` selects memory-only mode: no disk I/O is
    /// ever attempted.
    pub(crate) path: Option<PathBuf>,

    /// Pretty-print the persisted snapshot.
    pub(crate) pretty: bool,

    /// Statistics for store operations.
    pub(crate) stats: Arc<StoreStats>,
}

impl<V> Db<V> {
    /// Create an empty database bound to an optional snapshot path.
    pub fn new(path: Option<PathBuf>, pretty: bool) -> Self {
        Self {
            state: RwLock::new(State {
                entries: IndexMap::new(),
                dirty: false,
            }),
            path,
            pretty,
            stats: Arc::new(StoreStats::new()),
        }
    }

    /// Insert or overwrite a key with no expiration. Marks dirty.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), Entry::new(value));
    }

    /// Insert or overwrite a key with a time-to-live. Marks dirty.
    ///
    /// A zero `ttl` behaves like [`set`](Self::set): the entry never
    /// expires.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = if ttl.is_zero() {
            Entry::new(value)
        } else {
            // Saturate so absurd TTLs clamp instead of overflowing.
            let expire_at =
                now_nanos().saturating_add(ttl.as_nanos().min(i64::MAX as u128) as i64);
            Entry::with_expire_at(value, expire_at)
        };
        self.insert(key.into(), entry);
    }

    fn insert(&self, key: String, entry: Entry<V>) {
        let mut state = match self.write_lock() {
            Some(state) => state,
            None => return, // Lock poisoned, silently fail
        };

        let is_new = !state.entries.contains_key(&key);
        state.entries.insert(key, entry);
        state.dirty = true;

        if is_new {
            self.stats.increment_size();
        }
        self.stats.record_set();
    }

    /// Get a clone of the value for `key`.
    ///
    /// Returns `None` if the key is absent or expired. Lazy expiration:
    /// an expired-but-present entry reads as absent with no change to
    /// the map; physical removal is deferred to the sweep. Shared lock
    /// only.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let state = self.read_lock()?;

        match state.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now_nanos()) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Remove a key. Returns `true` if an entry was actually removed.
    ///
    /// Deleting an absent key is a no-op: the dirty flag is untouched.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = match self.write_lock() {
            Some(state) => state,
            None => return false,
        };

        // shift_remove keeps insertion order, so snapshot diffs stay
        // stable across deletes.
        let existed = state.entries.shift_remove(key).is_some();
        if existed {
            state.dirty = true;
            self.stats.decrement_size();
            self.stats.record_delete();
        }
        existed
    }

    /// Check whether `key` exists and is not expired.
    pub fn contains(&self, key: &str) -> bool {
        match self.read_lock() {
            Some(state) => state
                .entries
                .get(key)
                .map(|entry| !entry.is_expired_at(now_nanos()))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Remaining time to live for `key`.
    ///
    /// `None` if the key is absent or expired; `Some(None)` if present
    /// and never expiring; `Some(Some(remaining))` otherwise.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let state = self.read_lock()?;
        let entry = state.entries.get(key)?;

        let now = now_nanos();
        if entry.is_expired_at(now) {
            return None;
        }
        Some(entry.remaining_at(now))
    }

    /// All currently visible (non-expired) keys. Order is unspecified.
    pub fn keys(&self) -> Vec<String> {
        let now = now_nanos();
        match self.read_lock() {
            Some(state) => state
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Physical entry count.
    ///
    /// Note: this may include expired entries that a sweep has not yet
    /// removed.
    pub fn len(&self) -> usize {
        match self.read_lock() {
            Some(state) => state.entries.len(),
            None => 0,
        }
    }

    /// Check if the map is physically empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry in one pass over the whole map.
    ///
    /// Holds the exclusive lock for the full scan. Marks dirty if
    /// anything was removed. Returns the number of removed entries.
    pub fn sweep(&self) -> usize {
        let mut state = match self.write_lock() {
            Some(state) => state,
            None => return 0,
        };

        let now = now_nanos();
        let initial_len = state.entries.len();
        let stats = &self.stats;

        state.entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                stats.record_expiration();
                stats.decrement_size();
            }
            !expired
        });

        let removed = initial_len - state.entries.len();
        if removed > 0 {
            state.dirty = true;
        }
        removed
    }

    /// Get a reference to the statistics.
    pub fn stats(&self) -> Arc<StoreStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the map has diverged from the last installed snapshot.
    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.read_lock().map(|state| state.dirty).unwrap_or(false)
    }

    // Private helper methods

    /// Acquire a read lock, returning None if poisoned.
    pub(crate) fn read_lock(&self) -> Option<RwLockReadGuard<'_, State<V>>> {
        self.state.read().ok()
    }

    /// Acquire a write lock, returning None if poisoned.
    pub(crate) fn write_lock(&self) -> Option<RwLockWriteGuard<'_, State<V>>> {
        self.state.write().ok()
    }
}
