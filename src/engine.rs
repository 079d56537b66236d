//! The bounded, mutex-guarded cache engine.
//!
//! All four CRUD operations, the LFU eviction bookkeeping, and the periodic
//! expiration sweep execute under a single `parking_lot::Mutex` covering the
//! primary map, the frequency index, and `min_frequency` together: a global
//! eviction victim can only be selected correctly if all three are updated as
//! one unit. Sharding the map across multiple locks would trade away that
//! global `min_frequency` invariant for throughput, so the engine holds
//! exactly one lock rather than striping state across several.
//!
//! Every `self.sink.emit(...)` call happens before its guard is dropped, so a
//! subscriber never observes two clients' events out of commit order: the
//! lock serializes "commit, then hand off to the event channel" as one step,
//! even though the channel send itself never blocks.

use crate::entry::CacheEntry;
use crate::events::EventSink;
use crate::protocol::{CacheEvent, EventType};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

struct Inner {
    primary: HashMap<String, CacheEntry>,
    /// frequency -> insertion-ordered keys currently at that frequency.
    frequency_index: HashMap<u64, VecDeque<String>>,
    min_frequency: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            primary: HashMap::new(),
            frequency_index: HashMap::new(),
            min_frequency: 0,
        }
    }

    /// Removes `key` (known present at `frequency`) from both structures and
    /// fixes up `min_frequency` if its bucket just vanished.
    fn remove_key(&mut self, key: &str, frequency: u64) {
        self.primary.remove(key);
        match self.frequency_index.get_mut(&frequency) {
            Some(bucket) => {
                match bucket.iter().position(|k| k == key) {
                    Some(pos) => {
                        bucket.remove(pos);
                    }
                    None => tracing::warn!(
                        key, frequency, "self-healing: key missing from its own frequency bucket"
                    ),
                }
                if bucket.is_empty() {
                    self.frequency_index.remove(&frequency);
                    if frequency == self.min_frequency {
                        self.min_frequency =
                            self.frequency_index.keys().min().copied().unwrap_or(0);
                    }
                }
            }
            None => tracing::warn!(
                key, frequency, "self-healing: frequency bucket missing for key being removed"
            ),
        }
    }

    /// Moves `key` from bucket `old_freq` to `old_freq + 1`. Frequency buckets
    /// only ever grow by one at a time, so no scan is needed to know the new
    /// min when the old bucket empties.
    fn bump_frequency(&mut self, key: &str, old_freq: u64) {
        match self.frequency_index.get_mut(&old_freq) {
            Some(bucket) => {
                match bucket.iter().position(|k| k == key) {
                    Some(pos) => {
                        bucket.remove(pos);
                    }
                    None => tracing::warn!(
                        key,
                        frequency = old_freq,
                        "self-healing: key missing from its own frequency bucket"
                    ),
                }
                if bucket.is_empty() {
                    self.frequency_index.remove(&old_freq);
                    if old_freq == self.min_frequency {
                        self.min_frequency = old_freq + 1;
                    }
                }
            }
            None => tracing::warn!(
                key,
                frequency = old_freq,
                "self-healing: frequency bucket missing for key being bumped"
            ),
        }
        self.frequency_index
            .entry(old_freq + 1)
            .or_default()
            .push_back(key.to_string());
    }

    /// Selects and removes the LFU victim (the longest-resident key in the
    /// lowest-frequency bucket), returning its key and frequency for the
    /// eviction event.
    fn evict_one(&mut self) -> Option<(String, u64)> {
        let bucket = self.frequency_index.get_mut(&self.min_frequency)?;
        let victim = bucket.pop_front()?;
        let frequency = self.min_frequency;
        if bucket.is_empty() {
            self.frequency_index.remove(&frequency);
            self.min_frequency = self.frequency_index.keys().min().copied().unwrap_or(0);
        }
        self.primary.remove(&victim);
        Some((victim, frequency))
    }
}

/// A bounded, capacity-evicting, TTL-expiring key-value store.
///
/// Cheap to clone (it's an `Arc` around a mutex); every session and the
/// periodic sweep task share one engine.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
    sink: EventSink,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl CacheEngine {
    /// Creates an engine bounded to `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Construction with a non-positive
    /// capacity is a fatal configuration fault; callers should validate
    /// `capacity` (see [`crate::config::Config`]) before reaching this point.
    pub fn new(capacity: usize, sink: EventSink) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            capacity,
            sink,
        }
    }

    /// `Create(key, value, ttl?)`. Blank keys and duplicates are reported as
    /// `false`, not as an error.
    pub fn create(&self, key: &str, value: Value, ttl: Option<i64>) -> bool {
        if is_blank(key) {
            return false;
        }
        let now = Utc::now();
        let mut inner = self.inner.lock();
        if inner.primary.contains_key(key) {
            return false;
        }
        if inner.primary.len() >= self.capacity {
            if let Some((victim, frequency)) = inner.evict_one() {
                self.sink.emit(CacheEvent {
                    event_type: EventType::ItemEvicted,
                    key: victim,
                    value: None,
                    timestamp: now,
                    reason: Some(format!("LFU eviction (frequency: {frequency})")),
                });
            }
        }
        let entry = CacheEntry::new(value.clone(), ttl, now);
        inner.primary.insert(key.to_string(), entry);
        inner
            .frequency_index
            .entry(1)
            .or_default()
            .push_back(key.to_string());
        inner.min_frequency = 1;
        self.sink.emit(CacheEvent {
            event_type: EventType::ItemAdded,
            key: key.to_string(),
            value: Some(value),
            timestamp: now,
            reason: None,
        });
        drop(inner);
        true
    }

    /// `Read(key)`. Returns the value on a live hit, bumping its frequency;
    /// `None` for a blank key, a miss, or a lazily-discovered expiry.
    pub fn read(&self, key: &str) -> Option<Value> {
        if is_blank(key) {
            return None;
        }
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let frequency = inner.primary.get(key)?.frequency;
        if inner.primary.get(key).unwrap().is_expired(now) {
            inner.remove_key(key, frequency);
            self.sink.emit(CacheEvent {
                event_type: EventType::ItemExpired,
                key: key.to_string(),
                value: None,
                timestamp: now,
                reason: None,
            });
            drop(inner);
            return None;
        }
        inner.bump_frequency(key, frequency);
        let entry = inner.primary.get_mut(key).expect("just bumped");
        entry.frequency = frequency + 1;
        entry.last_accessed_at = now;
        Some(entry.value.clone())
    }

    /// `Update(key, value, ttl?)`. `ttl` of `None` preserves the prior
    /// `expires_at`; frequency is left untouched.
    pub fn update(&self, key: &str, value: Value, ttl: Option<i64>) -> bool {
        if is_blank(key) {
            return false;
        }
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let Some(entry) = inner.primary.get(key) else {
            return false;
        };
        let frequency = entry.frequency;
        if entry.is_expired(now) {
            inner.remove_key(key, frequency);
            self.sink.emit(CacheEvent {
                event_type: EventType::ItemExpired,
                key: key.to_string(),
                value: None,
                timestamp: now,
                reason: None,
            });
            drop(inner);
            return false;
        }
        let entry = inner.primary.get_mut(key).expect("checked present above");
        entry.value = value.clone();
        entry.last_accessed_at = now;
        if let Some(ttl) = ttl {
            entry.expires_at = Some(now + chrono::Duration::seconds(ttl));
        }
        self.sink.emit(CacheEvent {
            event_type: EventType::ItemUpdated,
            key: key.to_string(),
            value: Some(value),
            timestamp: now,
            reason: None,
        });
        drop(inner);
        true
    }

    /// `Delete(key)`.
    pub fn delete(&self, key: &str) -> bool {
        if is_blank(key) {
            return false;
        }
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let Some(entry) = inner.primary.get(key) else {
            return false;
        };
        let frequency = entry.frequency;
        inner.remove_key(key, frequency);
        self.sink.emit(CacheEvent {
            event_type: EventType::ItemRemoved,
            key: key.to_string(),
            value: None,
            timestamp: now,
            reason: None,
        });
        drop(inner);
        true
    }

    /// Scans every live entry and removes those whose TTL has elapsed,
    /// emitting `ItemExpired` for each. Run on a timer by the process entry
    /// point; never called from a request path.
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        let expired: Vec<(String, u64)> = inner
            .primary
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.frequency))
            .collect();
        for (key, frequency) in &expired {
            inner.remove_key(key, *frequency);
        }
        for (key, _) in &expired {
            self.sink.emit(CacheEvent {
                event_type: EventType::ItemExpired,
                key: key.clone(),
                value: None,
                timestamp: now,
                reason: None,
            });
        }
        drop(inner);
    }

    /// Number of live entries. Exposed for tests and metrics logging, not
    /// part of the wire protocol.
    pub fn len(&self) -> usize {
        self.inner.lock().primary.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured entry-count bound passed to [`Self::new`].
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn is_blank(key: &str) -> bool {
    key.trim().is_empty()
}
