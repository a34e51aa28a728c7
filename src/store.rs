//! The main store interface.
//!
//! This module provides the primary `Store` type that users interact
//! with. It wraps the internal storage and persistence engine in a
//! clean, thread-safe API and owns the background sweep+save task.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::stats::StatsSnapshot;
use crate::storage::Db;

/// A persistent, thread-safe key-value store with optional TTL per entry.
///
/// # Features
/// - **Thread-safe**: share across threads by cloning; all clones point
///   at the same underlying data.
/// - **TTL support**: entries can carry an absolute expiration; expired
///   entries read as absent immediately (lazy expiration) and are
///   physically removed by a periodic sweep.
/// - **Durable snapshots**: the full state is periodically written to a
///   single JSON file with a write-temp-then-rename install, so the file
///   is never observed half-written. Only dirty state is written.
/// - **Memory-only mode**: constructed without a path, the store never
///   touches the filesystem.
///
/// # Example
/// ```rust,no_run
/// use snapkv::{Store, StoreConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> snapkv::StoreResult<()> {
///     let config = StoreConfig::new()
///         .save_interval(Duration::from_secs(30))
///         .build();
///     let store: Store<String> = Store::open("data/sessions.json", config).await?;
///
///     store.set("user:123", "alice".to_string());
///     store.set_with_ttl("session:abc", "token".to_string(), Duration::from_secs(60));
///
///     assert_eq!(store.get("user:123"), Some("alice".to_string()));
///
///     // Stops the background loop and flushes a final snapshot.
///     store.close().await?;
///     Ok(())
/// }
/// ```
///
/// # Durability
/// Saves are eventually consistent: a mutation is guaranteed to reach
/// disk on some later save cycle while the store stays dirty, not on the
/// very next one. Data written since the last successful save may be
/// lost on a crash.
pub struct Store<V> {
    inner: Arc<StoreInner<V>>,
}

struct StoreInner<V> {
    db: Arc<Db<V>>,

    /// Shutdown signal for the background loop.
    shutdown_tx: watch::Sender<bool>,

    /// Join handle for the background loop, taken exactly once by
    /// `close`.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Drop for StoreInner<V> {
    fn drop(&mut self) {
        // Last handle gone: stop the background loop. No final save is
        // guaranteed on this path; use `close` for that.
        let _ = self.shutdown_tx.send(true);
    }
}

impl<V> Clone for Store<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.inner.db.path)
            .field("len", &self.inner.db.len())
            .finish()
    }
}

impl<V> Store<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open (or create) a persistent store backed by `path`.
    ///
    /// Missing parent directories are created. With `load_on_init` (the
    /// default) an existing snapshot populates the store; a missing file
    /// is an empty store, not an error. When the configured interval is
    /// positive a background task is spawned that periodically sweeps
    /// expired entries and saves dirty state.
    ///
    /// # Errors
    /// Directory creation failure, a snapshot read failure other than
    /// not-found, or a snapshot parse failure abort construction.
    ///
    /// # Panics
    /// Panics if a background interval is configured and no Tokio
    /// runtime is available to spawn the loop onto.
    pub async fn open(path: impl Into<PathBuf>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(StoreError::Io)?;
            }
        }

        let db = Arc::new(Db::new(Some(path), config.pretty));
        if config.load_on_init {
            db.load().await?;
        }
        Ok(Self::start(db, config.save_interval))
    }

    /// Create a memory-only store. No disk I/O is ever attempted and
    /// [`close`](Self::close) always succeeds.
    ///
    /// # Example
    /// ```
    /// use snapkv::{Store, StoreConfig};
    /// use std::time::Duration;
    ///
    /// // Zero interval: no background loop, so no runtime is needed.
    /// let config = StoreConfig::new().save_interval(Duration::ZERO).build();
    /// let store: Store<i64> = Store::in_memory(config);
    ///
    /// store.set("answer", 42);
    /// assert_eq!(store.get("answer"), Some(42));
    /// ```
    ///
    /// # Panics
    /// Panics if a background interval is configured and no Tokio
    /// runtime is available to spawn the loop onto.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::start(Arc::new(Db::new(None, config.pretty)), config.save_interval)
    }

    fn start(db: Arc<Db<V>>, interval: Option<Duration>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = interval.map(|interval| {
            if tokio::runtime::Handle::try_current().is_err() {
                panic!(
                    "snapkv::Store requires a Tokio runtime to drive its background \
                     sweep+save loop. Construct the store from within a runtime, or \
                     disable the loop with StoreConfig::save_interval(Duration::ZERO)."
                );
            }
            tokio::spawn(background_loop(Arc::clone(&db), interval, shutdown_rx))
        });

        Self {
            inner: Arc::new(StoreInner {
                db,
                shutdown_tx,
                task: Mutex::new(task),
            }),
        }
    }

    /// Insert or overwrite a key with no expiration.
    ///
    /// Always succeeds and marks the store dirty.
    ///
    /// # Example
    /// ```
    /// use snapkv::{Store, StoreConfig};
    /// use std::time::Duration;
    ///
    /// let config = StoreConfig::new().save_interval(Duration::ZERO).build();
    /// let store: Store<String> = Store::in_memory(config);
    ///
    /// store.set("user:123", "alice".to_string());
    /// store.set("user:123", "bob".to_string()); // overwrite
    /// assert_eq!(store.get("user:123"), Some("bob".to_string()));
    /// ```
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.db.set(key, value);
    }

    /// Insert or overwrite a key with a time-to-live.
    ///
    /// The entry expires `ttl` from now; a zero `ttl` behaves like
    /// [`set`](Self::set) (no expiration). Always succeeds and marks the
    /// store dirty.
    ///
    /// # Example
    /// ```
    /// use snapkv::{Store, StoreConfig};
    /// use std::time::Duration;
    ///
    /// let config = StoreConfig::new().save_interval(Duration::ZERO).build();
    /// let store: Store<String> = Store::in_memory(config);
    ///
    /// store.set_with_ttl("session", "token".to_string(), Duration::from_secs(60));
    /// assert!(store.contains("session"));
    /// ```
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.db.set_with_ttl(key, value, ttl);
    }

    /// Get a clone of the value for `key`.
    ///
    /// Returns `None` if the key is absent or expired. An expired entry
    /// reads as absent without being removed; physical removal is the
    /// sweep's job. Never performs I/O and never fails.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.db.get(key)
    }

    /// Delete a key.
    ///
    /// Returns `true` if the key existed and was removed. Deleting an
    /// absent key is a no-op that leaves the store state (including the
    /// dirty flag) untouched.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.db.delete(key)
    }

    /// Check if `key` exists and is not expired.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.db.contains(key)
    }

    /// Remaining time to live for `key`.
    ///
    /// - `None`: key absent or expired.
    /// - `Some(None)`: key present and never expiring.
    /// - `Some(Some(remaining))`: key present and expiring.
    ///
    /// # Example
    /// ```
    /// use snapkv::{Store, StoreConfig};
    /// use std::time::Duration;
    ///
    /// let config = StoreConfig::new().save_interval(Duration::ZERO).build();
    /// let store: Store<i64> = Store::in_memory(config);
    ///
    /// store.set("forever", 1);
    /// store.set_with_ttl("fleeting", 2, Duration::from_secs(60));
    ///
    /// assert_eq!(store.ttl("absent"), None);
    /// assert_eq!(store.ttl("forever"), Some(None));
    /// assert!(store.ttl("fleeting").unwrap().unwrap() <= Duration::from_secs(60));
    /// ```
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.inner.db.ttl(key)
    }

    /// All currently visible (non-expired) keys.
    ///
    /// Order is not significant and may vary between calls.
    pub fn keys(&self) -> Vec<String> {
        self.inner.db.keys()
    }

    /// Physical number of entries in the store.
    ///
    /// Note: this may include expired entries that haven't been removed
    /// yet by a sweep.
    pub fn len(&self) -> usize {
        self.inner.db.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.db.is_empty()
    }

    /// Manually remove all expired entries.
    ///
    /// Returns the number of entries removed. This is what the
    /// background loop runs on every tick; call it directly when the
    /// loop is disabled.
    pub fn sweep(&self) -> usize {
        self.inner.db.sweep()
    }

    /// Snapshot the store to disk now.
    ///
    /// No-op success for memory-only stores and when nothing has changed
    /// since the last save. On write failure the dirty state is retained
    /// so a later save (manual or background) retries.
    pub async fn save(&self) -> StoreResult<()> {
        self.inner.db.save().await
    }

    /// Get a snapshot of the store statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.db.stats().snapshot()
    }

    /// Stop the background loop and flush a final snapshot.
    ///
    /// Signals the loop to exit after one final sweep+save pass, waits
    /// for it to terminate, then performs one more save and returns its
    /// result (a no-op when the final pass already left the store
    /// clean). Memory-only stores always return `Ok`.
    ///
    /// Closing twice is safe; the second call simply re-runs the final
    /// save. The store must not be used after `close`.
    pub async fn close(&self) -> StoreResult<()> {
        let _ = self.inner.shutdown_tx.send(true);

        let task = self
            .inner
            .task
            .lock()
            .ok()
            .and_then(|mut task| task.take());
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "background loop terminated abnormally");
            }
        }

        self.inner.db.save().await
    }
}

/// Periodic sweep+save loop, one per store instance.
///
/// Exits after a final pass when the shutdown signal fires or every
/// sender is gone.
async fn background_loop<V>(
    db: Arc<Db<V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    V: Serialize + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; wait a full interval instead.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_and_save(&db).await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    sweep_and_save(&db).await;
                    return;
                }
            }
        }
    }
}

async fn sweep_and_save<V: Serialize>(db: &Db<V>) {
    let removed = db.sweep();
    if removed > 0 {
        debug!(removed, "swept expired entries");
    }
    if let Err(err) = db.save().await {
        // Dirty state is retained, so the next cycle retries.
        warn!(error = %err, "periodic save failed");
    }
}
