//! Metric types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 작업 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// 단일 호출 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    /// 소요 시간 (ms)
    pub duration_ms: f64,
    pub outcome: Outcome,
}

/// 작업별 누적 지표
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsAggregate {
    pub operation_name: String,

    /// 총 호출 수 (성공 + 실패)
    pub count: u64,

    /// 실패 수
    pub failures: u64,

    pub total_duration_ms: f64,
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub last_duration_ms: f64,
    pub last_outcome: Outcome,
    pub last_started_at: DateTime<Utc>,
}

impl MetricsAggregate {
    /// First record for an operation
    pub fn from_record(record: &MetricRecord) -> Self {
        Self {
            operation_name: record.operation_name.clone(),
            count: 1,
            failures: u64::from(!record.outcome.is_success()),
            total_duration_ms: record.duration_ms,
            min_duration_ms: record.duration_ms,
            max_duration_ms: record.duration_ms,
            last_duration_ms: record.duration_ms,
            last_outcome: record.outcome,
            last_started_at: record.start_time,
        }
    }

    /// Fold one more record in
    pub fn apply(&mut self, record: &MetricRecord) {
        self.count += 1;
        if !record.outcome.is_success() {
            self.failures += 1;
        }
        self.total_duration_ms += record.duration_ms;
        self.min_duration_ms = self.min_duration_ms.min(record.duration_ms);
        self.max_duration_ms = self.max_duration_ms.max(record.duration_ms);
        self.last_duration_ms = record.duration_ms;
        self.last_outcome = record.outcome;
        self.last_started_at = record.start_time;
    }

    pub fn average_duration_ms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_duration_ms / self.count as f64
    }

    /// 성공률 (0.0 ~ 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.count - self.failures) as f64 / self.count as f64
    }
}
