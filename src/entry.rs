//! Store entry: a value plus its optional expiration instant.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A single stored record.
///
/// `expire_at` is an absolute Unix-epoch timestamp in nanoseconds; `0`
/// means the entry never expires. The zero sentinel is omitted from the
/// serialized form and restored on deserialization, so a snapshot entry
/// without an `expire_at` field is permanent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<V> {
    /// The stored value.
    pub(crate) value: V,

    /// Absolute expiration instant in Unix nanoseconds. `0` = never.
    #[serde(default, skip_serializing_if = "never_expires")]
    pub(crate) expire_at: i64,
}

fn never_expires(expire_at: &i64) -> bool {
    *expire_at == 0
}

impl<V> Entry<V> {
    /// Create an entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            expire_at: 0,
        }
    }

    /// Create an entry expiring at the given Unix-nanosecond instant.
    pub fn with_expire_at(value: V, expire_at: i64) -> Self {
        Self { value, expire_at }
    }

    /// Check whether this entry is expired at instant `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expire_at != 0 && now >= self.expire_at
    }

    /// Remaining time to live at `now`.
    ///
    /// `None` for a never-expiring entry, `Some(remaining)` otherwise
    /// (zero if already expired).
    pub fn remaining_at(&self, now: i64) -> Option<Duration> {
        if self.expire_at == 0 {
            return None;
        }
        let left = self.expire_at.saturating_sub(now).max(0);
        Some(Duration::from_nanos(left as u64))
    }
}

/// Current wall-clock time as Unix-epoch nanoseconds.
///
/// Wall-clock rather than monotonic time, so expirations written to a
/// snapshot stay meaningful across process restarts.
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
