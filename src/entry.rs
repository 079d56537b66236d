//! Cache entry record.
//!
//! One concrete entry type for one concrete cache, rather than a
//! generic `CacheEntry<K, V, M>` parameterized over eviction metadata —
//! there's only ever one eviction policy in play here, so there's nothing
//! left to parameterize over.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single cached record.
///
/// `frequency` and `last_accessed_at` are bookkeeping the [`crate::engine`]
/// module maintains; callers only ever see the `value` through the engine's
/// public operations.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached payload. Opaque to the engine.
    pub value: Value,

    /// Absolute expiry instant. `None` means the entry never expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Access counter. Starts at 1 on insert, incremented on every successful
    /// read. Never decremented; eviction compares relative frequency, not
    /// recency, within a frequency bucket.
    pub frequency: u64,

    /// Updated on insert and on every successful read (including the read
    /// that discovers expiry — though at that point the entry is removed).
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates a fresh entry at frequency 1, timestamped `now`.
    pub fn new(value: Value, ttl: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|secs| now + chrono::Duration::seconds(secs)),
            frequency: 1,
            last_accessed_at: now,
        }
    }

    /// Whether this entry's TTL has elapsed as of `now`, per the spec's
    /// `expires_at ≠ ∅ ∧ now() > expires_at` predicate. A zero-or-negative TTL
    /// still expires promptly: by the time a subsequent `Read` or sweep tick
    /// calls this again, `now` has advanced past the creation instant.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}
