//! # medimind-foundation
//!
//! Foundation layer for MediMind:
//! - Cache: fingerprint 기반 TTL/LRU 결과 캐시
//! - Resource: 비싼 클라이언트의 지연 초기화 (LazyResource)
//! - Memory: 대용량 입력 후 메모리 회수, 청크 처리
//! - Monitor: 작업별 지연 시간 측정 및 집계
//! - Context: 위 구성요소를 묶는 PerfContext
//! - Config / Storage: 통합 설정 (MediMindConfig), JsonStore
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  PerfContext::run_cached(operation, fingerprint, ..)      │
//! │                     │                                     │
//! │   PerformanceMonitor::measure_async                       │
//! │                     │                                     │
//! │          ResultCache::get ── hit ──► value                │
//! │                     │ miss                                │
//! │      compute (LazyResource::acquire + delegate)           │
//! │                     │                                     │
//! │   ResultCache::put(ttl) ─► MemoryReclaimer::maybe_reclaim │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod resource;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Cache (캐시 시스템)
// ============================================================================
pub use cache::{
    content_hash, fingerprint, operations, CacheConfig, CacheEntry, CacheStats, ContentHash,
    Fingerprint, FingerprintBuilder, ResultCache,
};

// ============================================================================
// Resource (지연 초기화)
// ============================================================================
pub use resource::{LazyResource, ResourceInitError, ResourceStatus};

// ============================================================================
// Memory (메모리 회수)
// ============================================================================
pub use memory::{
    format_bytes, process_in_chunks, process_text_in_chunks, process_text_in_chunks_async,
    split_text_chunks, AllocatorTrim, MemoryFootprint, MemoryReclaimer, MemoryUsage,
    ReclaimConfig, ReclaimHook, ReclaimStats,
};

// ============================================================================
// Monitor (성능 측정)
// ============================================================================
pub use monitor::{MetricRecord, MetricsAggregate, Outcome, PerformanceMonitor};

// ============================================================================
// Context
// ============================================================================
pub use context::PerfContext;

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    GeneratorConfig, LiteratureConfig, MediMindConfig, TranslatorConfig, MEDIMIND_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{merge_json, JsonStore};
