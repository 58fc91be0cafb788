//! Memory reclamation policy
//!
//! After an operation whose size hint exceeds `threshold_bytes`, every
//! registered [`ReclaimHook`] runs once. Reclamation is best-effort: hook
//! errors and panics are logged and swallowed, and a call that arrives while
//! another pass is running skips instead of queueing a second pass.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::format_bytes;

/// Something that can give memory back
pub trait ReclaimHook: Send + Sync {
    /// Hook name for logs
    fn name(&self) -> &str;

    /// Release what can be released, returning the number of items freed
    fn reclaim(&self) -> anyhow::Result<usize>;
}

/// Memory reclamation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimConfig {
    /// Run reclamation passes at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Size hint above which a pass runs (bytes)
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: usize,

    /// Chunk size for chunked text processing (chars)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_true() -> bool {
    true
}
fn default_threshold_bytes() -> usize {
    1024 * 1024
} // 1 MB
fn default_chunk_size() -> usize {
    4500
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            threshold_bytes: default_threshold_bytes(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Reclamation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimStats {
    pub passes: u64,
    pub skipped: u64,
    pub hook_failures: u64,
    pub items_reclaimed: u64,
}

/// Threshold-triggered reclamation over a set of hooks
pub struct MemoryReclaimer {
    config: ReclaimConfig,
    hooks: RwLock<Vec<Arc<dyn ReclaimHook>>>,
    running: AtomicBool,
    passes: AtomicU64,
    skipped: AtomicU64,
    hook_failures: AtomicU64,
    items_reclaimed: AtomicU64,
}

impl MemoryReclaimer {
    pub fn new(config: ReclaimConfig) -> Self {
        Self {
            config,
            hooks: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            hook_failures: AtomicU64::new(0),
            items_reclaimed: AtomicU64::new(0),
        }
    }

    /// Reclaimer with the allocator trim hook already registered
    pub fn with_defaults(config: ReclaimConfig) -> Self {
        let reclaimer = Self::new(config);
        reclaimer.register_hook(Arc::new(AllocatorTrim));
        reclaimer
    }

    pub fn config(&self) -> &ReclaimConfig {
        &self.config
    }

    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    pub fn register_hook(&self, hook: Arc<dyn ReclaimHook>) {
        debug!(hook = hook.name(), "registered reclaim hook");
        self.hooks.write().push(hook);
    }

    pub fn hook_names(&self) -> Vec<String> {
        self.hooks.read().iter().map(|h| h.name().to_string()).collect()
    }

    /// Whether a size hint crosses the threshold
    pub fn exceeds_threshold(&self, size_hint: usize) -> bool {
        self.config.enabled && size_hint > self.config.threshold_bytes
    }

    /// Run a pass if `size_hint` exceeds the threshold
    ///
    /// Returns `true` when a pass actually ran.
    pub fn maybe_reclaim(&self, size_hint: usize) -> bool {
        if !self.exceeds_threshold(size_hint) {
            return false;
        }
        debug!(
            size = %format_bytes(size_hint as u64),
            threshold = %format_bytes(self.config.threshold_bytes as u64),
            "size hint over threshold, reclaiming"
        );
        self.reclaim_now()
    }

    /// Run a pass unconditionally (still coalesced with a running pass)
    pub fn reclaim_now(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("reclamation pass already running, skipping");
            return false;
        }

        let _running = RunningGuard(&self.running);
        let started = Instant::now();
        // clone the list so no lock is held while hooks run
        let hooks: Vec<Arc<dyn ReclaimHook>> = self.hooks.read().clone();

        let mut reclaimed = 0usize;
        for hook in &hooks {
            match panic::catch_unwind(AssertUnwindSafe(|| hook.reclaim())) {
                Ok(Ok(n)) => reclaimed += n,
                Ok(Err(e)) => {
                    self.hook_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(hook = hook.name(), error = %e, "reclaim hook failed");
                }
                Err(payload) => {
                    self.hook_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        hook = hook.name(),
                        panic = panic_message(payload.as_ref()),
                        "reclaim hook panicked"
                    );
                }
            }
        }

        self.passes.fetch_add(1, Ordering::Relaxed);
        self.items_reclaimed
            .fetch_add(reclaimed as u64, Ordering::Relaxed);
        debug!(
            hooks = hooks.len(),
            reclaimed,
            elapsed_us = started.elapsed().as_micros() as u64,
            "reclamation pass finished"
        );
        true
    }

    pub fn stats(&self) -> ReclaimStats {
        ReclaimStats {
            passes: self.passes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            items_reclaimed: self.items_reclaimed.load(Ordering::Relaxed),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Default for MemoryReclaimer {
    fn default() -> Self {
        Self::with_defaults(ReclaimConfig::default())
    }
}

impl std::fmt::Debug for MemoryReclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryReclaimer")
            .field("config", &self.config)
            .field("hooks", &self.hook_names())
            .field("stats", &self.stats())
            .finish()
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Returns freed heap pages to the OS (glibc only)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorTrim;

impl ReclaimHook for AllocatorTrim {
    fn name(&self) -> &str {
        "allocator-trim"
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn reclaim(&self) -> anyhow::Result<usize> {
        // SAFETY: malloc_trim only walks the allocator's own free lists
        let released = unsafe { libc::malloc_trim(0) };
        Ok(released as usize)
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn reclaim(&self) -> anyhow::Result<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    struct CountingHook {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHook {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl ReclaimHook for CountingHook {
        fn name(&self) -> &str {
            "counting"
        }

        fn reclaim(&self) -> anyhow::Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("hook exploded");
            }
            Ok(2)
        }
    }

    fn config(threshold_bytes: usize) -> ReclaimConfig {
        ReclaimConfig {
            threshold_bytes,
            ..Default::default()
        }
    }

    #[test]
    fn test_below_threshold_skips() {
        let reclaimer = MemoryReclaimer::new(config(100));
        let hook = CountingHook::new(false);
        reclaimer.register_hook(hook.clone());

        assert!(!reclaimer.maybe_reclaim(100));
        assert_eq!(hook.calls.load(Ordering::SeqCst), 0);

        assert!(reclaimer.maybe_reclaim(101));
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reclaimer.stats().items_reclaimed, 2);
    }

    #[test]
    fn test_disabled() {
        let reclaimer = MemoryReclaimer::new(ReclaimConfig {
            enabled: false,
            threshold_bytes: 0,
            ..Default::default()
        });
        assert!(!reclaimer.maybe_reclaim(usize::MAX));
    }

    #[test]
    fn test_failure_swallowed() {
        let reclaimer = MemoryReclaimer::new(config(0));
        let failing = CountingHook::new(true);
        let ok = CountingHook::new(false);
        reclaimer.register_hook(failing.clone());
        reclaimer.register_hook(ok.clone());

        assert!(reclaimer.maybe_reclaim(1));
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);

        let stats = reclaimer.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.hook_failures, 1);
    }

    struct PanickingHook;

    impl ReclaimHook for PanickingHook {
        fn name(&self) -> &str {
            "panicking"
        }

        fn reclaim(&self) -> anyhow::Result<usize> {
            panic!("hook lost its mind");
        }
    }

    #[test]
    fn test_panic_counted_as_failure() {
        let reclaimer = MemoryReclaimer::new(config(0));
        let ok = CountingHook::new(false);
        reclaimer.register_hook(Arc::new(PanickingHook));
        reclaimer.register_hook(ok.clone());

        assert!(reclaimer.maybe_reclaim(1));
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);

        // the running flag was released, so the next pass is not skipped
        assert!(reclaimer.maybe_reclaim(1));
        let stats = reclaimer.stats();
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.hook_failures, 2);
        assert_eq!(stats.items_reclaimed, 4);
    }

    struct BlockingHook {
        entered: Arc<Barrier>,
        release: Arc<Barrier>,
    }

    impl ReclaimHook for BlockingHook {
        fn name(&self) -> &str {
            "blocking"
        }

        fn reclaim(&self) -> anyhow::Result<usize> {
            self.entered.wait();
            self.release.wait();
            Ok(0)
        }
    }

    #[test]
    fn test_concurrent_passes_coalesce() {
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let reclaimer = Arc::new(MemoryReclaimer::new(config(0)));
        reclaimer.register_hook(Arc::new(BlockingHook {
            entered: entered.clone(),
            release: release.clone(),
        }));

        let background = {
            let reclaimer = reclaimer.clone();
            std::thread::spawn(move || reclaimer.maybe_reclaim(1))
        };

        entered.wait();
        // first pass is inside the hook
        assert!(!reclaimer.maybe_reclaim(1));
        release.wait();

        assert!(background.join().unwrap());
        let stats = reclaimer.stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.skipped, 1);

        // flag is cleared again
        assert!(!reclaimer.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_allocator_trim_never_fails() {
        assert!(AllocatorTrim.reclaim().is_ok());
        let reclaimer = MemoryReclaimer::default();
        assert_eq!(reclaimer.hook_names(), vec!["allocator-trim".to_string()]);
    }
}
