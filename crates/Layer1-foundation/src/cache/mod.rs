//! # MediMind Cache System
//!
//! Result caching for expensive delegate calls (text extraction,
//! generation, translation, literature search).
//!
//! ## Design Principles
//!
//! 1. **Never stale** - an entry is served only while `now < expires_at`
//! 2. **Bounded** - at most `max_entries` live entries, LRU eviction
//! 3. **No negative caching** - failures are never stored
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use medimind_foundation::cache::{Fingerprint, ResultCache};
//!
//! let cache = ResultCache::new(64);
//! let key = Fingerprint::builder("summarize")
//!     .input(report.as_bytes())
//!     .param("lang", "hi")
//!     .finish();
//!
//! if let Some(summary) = cache.get(&key) {
//!     return summary;
//! }
//! let summary = summarizer.summarize(&report, "hi").await?;
//! cache.put(key, summary.clone(), config.ttl_for("summarize"));
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Cache configuration (capacity, per-operation TTLs)
//! - [`fingerprint`] - Cache keys
//! - [`result`] - The TTL-bounded LRU cache

pub mod config;
pub mod fingerprint;
pub mod result;

pub use config::{operations, CacheConfig};
pub use fingerprint::{content_hash, fingerprint, ContentHash, Fingerprint, FingerprintBuilder};
pub use result::{CacheEntry, CacheStats, ResultCache};
