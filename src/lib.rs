//! # snapkv
//!
//! A persistent, thread-safe key-value store for Rust with per-entry TTL
//! and atomic file snapshots.
//!
//! ## Features
//!
//! - **Thread-safe**: share across threads with `Clone` (uses `Arc`
//!   internally); one readers-writer lock over the whole map.
//! - **TTL support**: entries can expire after a configurable duration;
//!   expired entries read as absent immediately and are physically
//!   removed by a periodic sweep.
//! - **Crash-safe persistence**: the full state is snapshotted to a
//!   single JSON file via write-temp-then-rename, so the file is never
//!   observed half-written; only dirty state is saved.
//! - **Generic values**: each store instance is monomorphic over a serde
//!   value type of your choice, preserving round-trip fidelity.
//! - **Statistics**: track hits, misses, expirations, and saves.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapkv::{Store, StoreConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> snapkv::StoreResult<()> {
//!     let config = StoreConfig::new()
//!         .save_interval(Duration::from_secs(30))
//!         .pretty(true)
//!         .build();
//!
//!     let store: Store<String> = Store::open("data/db.json", config).await?;
//!
//!     store.set("user:123", "alice".to_string());
//!     store.set_with_ttl("session:abc", "token".to_string(), Duration::from_secs(60));
//!
//!     if let Some(value) = store.get("user:123") {
//!         println!("Found: {}", value);
//!     }
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Thread Safety
//!
//! The store is safe to share across threads. Cloning a `Store` creates
//! a new handle to the same underlying data:
//!
//! ```rust
//! use snapkv::{Store, StoreConfig};
//! use std::thread;
//! use std::time::Duration;
//!
//! let config = StoreConfig::new().save_interval(Duration::ZERO).build();
//! let store: Store<String> = Store::in_memory(config);
//!
//! let handles: Vec<_> = (0..4).map(|i| {
//!     let store = store.clone();
//!     thread::spawn(move || {
//!         store.set(format!("key_{}", i), format!("value_{}", i));
//!     })
//! }).collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! ```
//!
//! ## Durability Model
//!
//! Mutations mark the store dirty; a background loop (or an explicit
//! [`Store::save`]) snapshots dirty state to disk. The dirty flag is
//! cleared after serialization but before the file write, so a mutation
//! racing a save is never lost — it re-marks the store dirty and lands
//! in the next snapshot. The trade-off: data written after the last
//! installed snapshot can be lost on a crash. There is no write-ahead
//! log.

// Public API
pub mod config;
pub mod error;
pub mod stats;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::Store;

// Internal modules - not part of public API
pub(crate) mod entry;
pub(crate) mod persist;
pub(crate) mod storage;
