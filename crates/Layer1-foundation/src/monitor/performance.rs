//! Performance Monitor
//!
//! Every invocation is recorded, success or failure. The aggregate table sits
//! behind one short-lived lock that is never held while the measured
//! operation runs.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, debug_span, Instrument};

use super::types::{MetricRecord, MetricsAggregate, Outcome};

/// 작업별 성능 집계
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    aggregates: Mutex<BTreeMap<String, MetricsAggregate>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time a synchronous operation
    ///
    /// The result is returned unchanged. A panic inside `f` is recorded as a
    /// failure before it unwinds further.
    pub fn measure<T, E, F>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let _entered = debug_span!("measure", operation).entered();
        let span = Span::start(self, operation);
        let result = f();
        span.finish(outcome_of(&result));
        result
    }

    /// Time an asynchronous operation
    ///
    /// If the returned future is dropped before completion the invocation is
    /// recorded as a failure.
    pub async fn measure_async<T, E, Fut>(&self, operation: &str, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let span = Span::start(self, operation);
        let result = fut.instrument(debug_span!("measure", operation)).await;
        span.finish(outcome_of(&result));
        result
    }

    /// Fold a record into its aggregate
    pub fn record(&self, record: MetricRecord) {
        debug!(
            operation = %record.operation_name,
            duration_ms = record.duration_ms,
            outcome = %record.outcome,
            "operation finished"
        );

        let mut aggregates = self.aggregates.lock();
        match aggregates.get_mut(&record.operation_name) {
            Some(agg) => agg.apply(&record),
            None => {
                aggregates.insert(
                    record.operation_name.clone(),
                    MetricsAggregate::from_record(&record),
                );
            }
        }
    }

    /// All aggregates, sorted by operation name
    pub fn snapshot(&self) -> Vec<MetricsAggregate> {
        self.aggregates.lock().values().cloned().collect()
    }

    pub fn get(&self, operation: &str) -> Option<MetricsAggregate> {
        self.aggregates.lock().get(operation).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.lock().is_empty()
    }

    /// Plain text table of the current aggregates
    pub fn render_table(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();
        if snapshot.is_empty() {
            out.push_str("No operations recorded yet.\n");
            return out;
        }

        let width = snapshot
            .iter()
            .map(|a| a.operation_name.len())
            .max()
            .unwrap_or(0)
            .max("Operation".len());

        let _ = writeln!(
            out,
            "{:<width$}  {:>6}  {:>6}  {:>10}  {:>10}  {:>10}  {:>10}  {:<7}",
            "Operation", "Calls", "Failed", "Avg (ms)", "Min (ms)", "Max (ms)", "Last (ms)", "Last"
        );
        for agg in &snapshot {
            let _ = writeln!(
                out,
                "{:<width$}  {:>6}  {:>6}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:<7}",
                agg.operation_name,
                agg.count,
                agg.failures,
                agg.average_duration_ms(),
                agg.min_duration_ms,
                agg.max_duration_ms,
                agg.last_duration_ms,
                agg.last_outcome,
            );
        }
        out
    }
}

fn outcome_of<T, E>(result: &Result<T, E>) -> Outcome {
    if result.is_ok() {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

/// In-flight measurement; dropping it unfinished records a failure
struct Span<'a> {
    monitor: &'a PerformanceMonitor,
    operation: String,
    started: Instant,
    start_time: chrono::DateTime<Utc>,
    finished: bool,
}

impl<'a> Span<'a> {
    fn start(monitor: &'a PerformanceMonitor, operation: &str) -> Self {
        Self {
            monitor,
            operation: operation.to_string(),
            started: Instant::now(),
            start_time: Utc::now(),
            finished: false,
        }
    }

    fn finish(mut self, outcome: Outcome) {
        self.finished = true;
        self.commit(outcome);
    }

    fn commit(&mut self, outcome: Outcome) {
        self.monitor.record(MetricRecord {
            operation_name: std::mem::take(&mut self.operation),
            start_time: self.start_time,
            duration_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            outcome,
        });
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.commit(Outcome::Failure);
        }
    }
}
