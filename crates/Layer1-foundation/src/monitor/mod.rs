//! Monitor - 작업별 지연 시간 측정 및 집계
//!
//! [`PerformanceMonitor::measure`] / [`PerformanceMonitor::measure_async`]
//! wrap an operation, record one [`MetricRecord`] per invocation and fold it
//! into a per-name [`MetricsAggregate`].

mod performance;
mod types;

pub use performance::PerformanceMonitor;
pub use types::{MetricRecord, MetricsAggregate, Outcome};
