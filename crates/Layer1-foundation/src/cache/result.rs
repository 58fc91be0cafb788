//! TTL-bounded LRU result cache
//!
//! Maps a [`Fingerprint`] to a previously computed result. Entries expire at
//! `created_at + ttl`; an expired entry is never returned and is dropped on
//! the next lookup, by [`ResultCache::purge_expired`], or by the background
//! sweeper. When the cache holds `max_entries` live entries, inserting a new
//! fingerprint evicts the least recently accessed one.
//!
//! All state sits behind one short-lived lock; callers must not (and cannot)
//! hold it across a delegate call.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::fingerprint::Fingerprint;
use crate::memory::ReclaimHook;

/// Longest window an entry is kept; larger TTLs are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + ttl`, clamped so huge TTLs never overflow `Instant`
fn expiry(now: Instant, ttl: Duration) -> Instant {
    let mut ttl = ttl.min(MAX_TTL);
    loop {
        if let Some(at) = now.checked_add(ttl) {
            return at;
        }
        ttl /= 2;
    }
}

/// A stored result
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub fingerprint: Fingerprint,
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
    last_access: u64,
}

impl<V> CacheEntry<V> {
    /// Fresh while `now < expires_at`
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Remaining time to live
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<Fingerprint, CacheEntry<V>>,
    /// Access counter for LRU tracking
    access_counter: u64,
    hits: u64,
    misses: u64,
    expirations: u64,
    evictions: u64,
    insertions: u64,
}

impl<V> CacheInner<V> {
    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.is_fresh(now));
        let removed = before - self.entries.len();
        self.expirations += removed as u64;
        removed
    }

    /// Least recent access first, oldest `created_at` on ties
    fn find_lru_key(&self) -> Option<Fingerprint> {
        self.entries
            .iter()
            .min_by_key(|(_, e)| (e.last_access, e.created_at))
            .map(|(k, _)| *k)
    }
}

/// Bounded, time-expiring result cache
#[derive(Debug)]
pub struct ResultCache<V> {
    inner: Mutex<CacheInner<V>>,
    max_entries: usize,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `max_entries` live entries
    ///
    /// A capacity of zero disables storage: every lookup is a miss.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(max_entries.min(1024)),
                access_counter: 0,
                hits: 0,
                misses: 0,
                expirations: 0,
                evictions: 0,
                insertions: 0,
            }),
            max_entries,
        }
    }

    /// Get a fresh value, or `None` on a miss
    ///
    /// Updates the access time for LRU tracking. An expired entry is removed
    /// and reported as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.get_at(fingerprint, Instant::now())
    }

    pub(crate) fn get_at(&self, fingerprint: &Fingerprint, now: Instant) -> Option<V> {
        let mut inner = self.inner.lock();
        let tick = inner.tick();

        let fresh = match inner.entries.get_mut(fingerprint) {
            Some(entry) if entry.is_fresh(now) => {
                entry.last_access = tick;
                Some(entry.value.clone())
            }
            Some(_) => None,
            None => {
                inner.misses += 1;
                trace!(fingerprint = %fingerprint.short(), "cache miss");
                return None;
            }
        };

        match fresh {
            Some(value) => {
                inner.hits += 1;
                trace!(fingerprint = %fingerprint.short(), "cache hit");
                Some(value)
            }
            None => {
                inner.entries.remove(fingerprint);
                inner.expirations += 1;
                inner.misses += 1;
                debug!(fingerprint = %fingerprint.short(), "cache entry expired");
                None
            }
        }
    }

    /// Check for a fresh entry without touching LRU order or statistics
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .entries
            .get(fingerprint)
            .is_some_and(|e| e.is_fresh(now))
    }

    /// Store a value for `ttl`
    ///
    /// Replacing an existing fingerprint starts a new TTL window. A zero TTL
    /// stores nothing.
    pub fn put(&self, fingerprint: Fingerprint, value: V, ttl: Duration) {
        self.put_at(fingerprint, value, ttl, Instant::now());
    }

    pub(crate) fn put_at(&self, fingerprint: Fingerprint, value: V, ttl: Duration, now: Instant) {
        if self.max_entries == 0 || ttl.is_zero() {
            trace!(fingerprint = %fingerprint.short(), "cache disabled for entry, skipping put");
            return;
        }

        let mut inner = self.inner.lock();
        let tick = inner.tick();
        inner.insertions += 1;

        if let Some(entry) = inner.entries.get_mut(&fingerprint) {
            entry.value = value;
            entry.created_at = now;
            entry.expires_at = expiry(now, ttl);
            entry.last_access = tick;
            return;
        }

        if inner.entries.len() >= self.max_entries {
            inner.purge_expired(now);
        }
        while inner.entries.len() >= self.max_entries {
            match inner.find_lru_key() {
                Some(lru_key) => {
                    inner.entries.remove(&lru_key);
                    inner.evictions += 1;
                    debug!(fingerprint = %lru_key.short(), "evicted least recently used entry");
                }
                None => break,
            }
        }

        inner.entries.insert(
            fingerprint,
            CacheEntry {
                fingerprint,
                value,
                created_at: now,
                expires_at: expiry(now, ttl),
                last_access: tick,
            },
        );
    }

    /// Remove a specific fingerprint
    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.inner.lock().entries.remove(fingerprint).map(|e| e.value)
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge_expired(Instant::now())
    }

    /// Clear all entries (statistics are kept)
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of stored entries (including expired ones not yet purged)
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            live_entries: inner.entries.values().filter(|e| e.is_fresh(now)).count(),
            capacity: self.max_entries,
            hits: inner.hits,
            misses: inner.misses,
            expirations: inner.expirations,
            evictions: inner.evictions,
            insertions: inner.insertions,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// Spawn a background task that purges expired entries every `period`
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped. Must be called inside a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, "cache sweeper purged expired entries");
                }
            }
        })
    }
}

impl<V: Clone + Send + Sync> ReclaimHook for ResultCache<V> {
    fn name(&self) -> &str {
        "result-cache"
    }

    fn reclaim(&self) -> anyhow::Result<usize> {
        Ok(self.purge_expired())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub live_entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub insertions: u64,
}

impl CacheStats {
    /// Hit rate over all lookups (0.0 when nothing was looked up)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}
