//! Configuration for the store.
//!
//! This module provides a builder pattern for configuring store behavior:
//! the background sweep+save interval, snapshot formatting, and whether an
//! existing snapshot is loaded at construction.

use std::time::Duration;

/// Configuration for creating a new store instance.
///
/// Use the builder pattern to construct configuration:
///
/// ```
/// use snapkv::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new()
///     .save_interval(Duration::from_secs(30))
///     .pretty(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Interval between background sweep+save passes.
    /// `None` disables the background loop entirely; expired entries are
    /// then only hidden lazily and saves must be triggered by the caller.
    pub(crate) save_interval: Option<Duration>,

    /// Whether the persisted snapshot is pretty-printed JSON.
    /// Formatting only; it never affects read-back.
    pub(crate) pretty: bool,

    /// Whether construction loads an existing snapshot file.
    pub(crate) load_on_init: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            save_interval: Some(Duration::from_secs(60)),
            pretty: false,
            load_on_init: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval between background sweep+save passes.
    ///
    /// Use `Duration::ZERO` to disable the background loop; the store
    /// then performs no periodic work and durability becomes the
    /// caller's responsibility via explicit [`save`](crate::Store::save)
    /// calls.
    pub fn save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = if interval.is_zero() {
            None
        } else {
            Some(interval)
        };
        self
    }

    /// Pretty-print the persisted JSON snapshot.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Control whether construction loads an existing snapshot file.
    ///
    /// When disabled, the store starts empty even if the file exists;
    /// the file is overwritten on the next save.
    pub fn load_on_init(mut self, load: bool) -> Self {
        self.load_on_init = load;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Get the background interval, if enabled.
    pub fn get_save_interval(&self) -> Option<Duration> {
        self.save_interval
    }

    /// Whether snapshots are pretty-printed.
    pub fn get_pretty(&self) -> bool {
        self.pretty
    }

    /// Whether construction loads an existing snapshot.
    pub fn get_load_on_init(&self) -> bool {
        self.load_on_init
    }
}
