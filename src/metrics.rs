//! Execution-time log for engine operations
//!
//! Append-only: one record per facade call. Nothing is evicted automatically;
//! the owner inspects, truncates or clears the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub function_name: String,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub cache_hit: bool,
}

/// Aggregates for one function name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSummary {
    pub count: usize,
    #[serde(with = "duration_ms")]
    pub total: Duration,
    #[serde(with = "duration_ms")]
    pub mean: Duration,
    #[serde(with = "duration_ms")]
    pub max: Duration,
}

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: Vec<PerformanceMetric>,
}

impl PerformanceMonitor {
    /// Create an empty monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one call's timing and outcome
    pub fn record(&mut self, function_name: &str, execution_time: Duration, success: bool, cache_hit: bool) {
        log::debug!(
            "{} finished in {:?} (success={}, cache_hit={})",
            function_name,
            execution_time,
            success,
            cache_hit
        );
        self.metrics.push(PerformanceMetric {
            function_name: function_name.to_string(),
            execution_time,
            timestamp: Utc::now(),
            success,
            cache_hit,
        });
    }

    /// All records, oldest first
    pub fn metrics(&self) -> &[PerformanceMetric] {
        &self.metrics
    }

    /// Get number of recorded calls
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Keep only the newest `keep_last` records
    pub fn truncate(&mut self, keep_last: usize) {
        if self.metrics.len() > keep_last {
            let drop = self.metrics.len() - keep_last;
            self.metrics.drain(..drop);
        }
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.metrics.clear();
    }

    /// Aggregate the records per function name
    pub fn summary(&self) -> BTreeMap<String, FunctionSummary> {
        let mut summary: BTreeMap<String, FunctionSummary> = BTreeMap::new();
        for metric in &self.metrics {
            let entry = summary
                .entry(metric.function_name.clone())
                .or_insert_with(|| FunctionSummary {
                    count: 0,
                    total: Duration::ZERO,
                    mean: Duration::ZERO,
                    max: Duration::ZERO,
                });
            entry.count += 1;
            entry.total += metric.execution_time;
            entry.max = entry.max.max(metric.execution_time);
        }
        for entry in summary.values_mut() {
            entry.mean = entry.total / entry.count as u32;
        }
        summary
    }
}

/// Durations as fractional milliseconds on the wire
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_nanos() as f64 / 1e6)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64((ms / 1000.0).max(0.0)).map_err(serde::de::Error::custom)
    }
}
