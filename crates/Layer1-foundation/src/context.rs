//! PerfContext - 캐시된 작업 실행 흐름
//!
//! One context is built by the host and handed to every operation. It owns
//! the result cache, the performance monitor and the memory reclaimer, and
//! runs the cached-operation flow:
//!
//! ```text
//! measure ─► check cache ─► hit ──────────────────────────────► value
//!                       └─► miss ─► compute ─► put(ttl) ─► maybe_reclaim ─► value
//! ```
//!
//! No lock is held while `compute` runs, so two concurrent misses on the
//! same fingerprint may both compute. Errors from `compute` are returned
//! unchanged and leave no cache entry behind.

use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheConfig, Fingerprint, ResultCache};
use crate::memory::{MemoryFootprint, MemoryReclaimer, ReclaimConfig, ReclaimHook};
use crate::monitor::PerformanceMonitor;

/// Shared performance context
pub struct PerfContext<V> {
    cache: Arc<ResultCache<V>>,
    monitor: Arc<PerformanceMonitor>,
    reclaimer: Arc<MemoryReclaimer>,
    cache_config: CacheConfig,
}

impl<V> Clone for PerfContext<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            monitor: Arc::clone(&self.monitor),
            reclaimer: Arc::clone(&self.reclaimer),
            cache_config: self.cache_config.clone(),
        }
    }
}

impl<V> PerfContext<V>
where
    V: Clone + MemoryFootprint + Send + Sync + 'static,
{
    /// Build a context; the cache is registered as a reclaim hook next to
    /// the allocator trim
    pub fn new(cache_config: CacheConfig, reclaim_config: ReclaimConfig) -> Self {
        let cache = Arc::new(ResultCache::new(cache_config.max_entries));
        let reclaimer = Arc::new(MemoryReclaimer::new(reclaim_config));
        reclaimer.register_hook(Arc::clone(&cache) as Arc<dyn ReclaimHook>);
        reclaimer.register_hook(Arc::new(crate::memory::AllocatorTrim));

        Self {
            cache,
            monitor: Arc::new(PerformanceMonitor::new()),
            reclaimer,
            cache_config,
        }
    }

    /// Assemble a context from existing parts
    pub fn from_parts(
        cache: Arc<ResultCache<V>>,
        monitor: Arc<PerformanceMonitor>,
        reclaimer: Arc<MemoryReclaimer>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            monitor,
            reclaimer,
            cache_config,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache<V>> {
        &self.cache
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn reclaimer(&self) -> &Arc<MemoryReclaimer> {
        &self.reclaimer
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    /// Chunk size for chunked text processing
    pub fn chunk_size(&self) -> usize {
        self.reclaimer.chunk_size()
    }

    /// Start the background sweeper if the configuration asks for one
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let period = self.cache_config.sweep_interval()?;
        debug!(period_secs = period.as_secs(), "starting cache sweeper");
        Some(self.cache.spawn_sweeper(period))
    }

    /// Run `compute` through the cache, measured under `operation`
    ///
    /// `input_size` is the size of the raw input in bytes; together with the
    /// footprint of the produced value it decides whether a reclamation pass
    /// runs after a miss.
    pub async fn run_cached<E, F, Fut>(
        &self,
        operation: &str,
        fingerprint: Fingerprint,
        input_size: usize,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.monitor
            .measure_async(
                operation,
                self.get_or_compute(operation, fingerprint, input_size, compute),
            )
            .await
    }

    /// Same flow as [`run_cached`](Self::run_cached) without recording a
    /// measurement
    ///
    /// For lookups nested inside another measured operation, so one request
    /// is counted once.
    pub async fn get_or_compute<E, F, Fut>(
        &self,
        operation: &str,
        fingerprint: Fingerprint,
        input_size: usize,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.cache.get(&fingerprint) {
            debug!(operation, fingerprint = %fingerprint.short(), "served from cache");
            return Ok(value);
        }

        let value = compute().await?;
        self.cache
            .put(fingerprint, value.clone(), self.cache_config.ttl_for(operation));
        debug!(operation, fingerprint = %fingerprint.short(), "computed and cached");

        self.reclaimer
            .maybe_reclaim(input_size.max(value.footprint()));
        Ok(value)
    }
}

impl<V> std::fmt::Debug for PerfContext<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfContext")
            .field("cache_config", &self.cache_config)
            .field("reclaimer", &self.reclaimer)
            .finish_non_exhaustive()
    }
}
