//! Poll cycle health metrics
//!
//! Tracks cycle outcomes, durations and the last successful publish, both as
//! exported collectors and as in-memory state for the health report.

use crate::{constants::METRIC_PREFIX, error::RegistryError};
use chrono::{DateTime, Utc};
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Duration;
use tokio::sync::RwLock;

const SUBSYSTEM: &str = "exporter";

/// Snapshot of cycle counters
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    pub successful_cycles: u64,
    pub failed_cycles: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Collects and exports metrics about poll cycles
pub struct CycleMetrics {
    cycles: IntCounterVec,
    duration: Histogram,
    last_success_timestamp: Gauge,
    assets_published: IntGauge,
    registered_series: IntGauge,
    last_success: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
}

impl CycleMetrics {
    /// Creates the collectors and registers them with `registry`
    pub fn new(registry: &Registry) -> Result<Self, RegistryError> {
        let cycles = IntCounterVec::new(
            Self::opts("cycles_total", "Poll cycles by outcome"),
            &["outcome"],
        )
        .map_err(|source| RegistryError::Register {
            name: "cycles_total",
            source,
        })?;

        let duration = Histogram::with_opts(
            HistogramOpts::new("cycle_duration_seconds", "Wall time of a poll cycle")
                .namespace(METRIC_PREFIX)
                .subsystem(SUBSYSTEM)
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )
        .map_err(|source| RegistryError::Register {
            name: "cycle_duration_seconds",
            source,
        })?;

        let last_success_timestamp = Gauge::with_opts(Self::opts(
            "last_success_timestamp_seconds",
            "Unix time of the last successful poll cycle",
        ))
        .map_err(|source| RegistryError::Register {
            name: "last_success_timestamp_seconds",
            source,
        })?;

        let assets_published = IntGauge::with_opts(Self::opts(
            "assets_published",
            "Assets published by the last successful poll cycle",
        ))
        .map_err(|source| RegistryError::Register {
            name: "assets_published",
            source,
        })?;

        let registered_series = IntGauge::with_opts(Self::opts(
            "registered_series",
            "Asset series currently registered",
        ))
        .map_err(|source| RegistryError::Register {
            name: "registered_series",
            source,
        })?;

        let collectors: [(&'static str, Box<dyn prometheus::core::Collector>); 5] = [
            ("cycles_total", Box::new(cycles.clone())),
            ("cycle_duration_seconds", Box::new(duration.clone())),
            (
                "last_success_timestamp_seconds",
                Box::new(last_success_timestamp.clone()),
            ),
            ("assets_published", Box::new(assets_published.clone())),
            ("registered_series", Box::new(registered_series.clone())),
        ];
        for (name, collector) in collectors {
            registry
                .register(collector)
                .map_err(|source| RegistryError::Register { name, source })?;
        }

        Ok(Self {
            cycles,
            duration,
            last_success_timestamp,
            assets_published,
            registered_series,
            last_success: RwLock::new(None),
            last_error: RwLock::new(None),
        })
    }

    fn opts(name: &str, help: &str) -> Opts {
        Opts::new(name, help)
            .namespace(METRIC_PREFIX)
            .subsystem(SUBSYSTEM)
    }

    /// Records a cycle that fetched and published successfully
    pub async fn record_success(&self, elapsed: Duration, assets: usize, series: usize) {
        let now = Utc::now();
        self.cycles.with_label_values(&["success"]).inc();
        self.duration.observe(elapsed.as_secs_f64());
        self.last_success_timestamp
            .set(now.timestamp_millis() as f64 / 1000.0);
        self.assets_published.set(assets as i64);
        self.registered_series.set(series as i64);

        *self.last_success.write().await = Some(now);
    }

    /// Records a cycle abandoned before publishing
    pub async fn record_failure(&self, elapsed: Duration, error: &str) {
        self.cycles.with_label_values(&["failure"]).inc();
        self.duration.observe(elapsed.as_secs_f64());

        *self.last_error.write().await = Some(error.to_string());
    }

    /// Time of the last successful cycle
    pub async fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.read().await
    }

    pub async fn stats(&self) -> CycleStats {
        CycleStats {
            successful_cycles: self.cycles.with_label_values(&["success"]).get(),
            failed_cycles: self.cycles.with_label_values(&["failure"]).get(),
            last_success: *self.last_success.read().await,
            last_error: self.last_error.read().await.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cycle_metrics_record() {
        let registry = Registry::new();
        let metrics = CycleMetrics::new(&registry).unwrap();

        assert!(metrics.last_success().await.is_none());

        metrics
            .record_success(Duration::from_millis(120), 2, 14)
            .await;
        metrics
            .record_failure(Duration::from_millis(80), "Request timeout")
            .await;

        let stats = metrics.stats().await;
        assert_eq!(stats.successful_cycles, 1);
        assert_eq!(stats.failed_cycles, 1);
        assert!(stats.last_success.is_some());
        assert_eq!(stats.last_error.as_deref(), Some("Request timeout"));
    }

    #[tokio::test]
    async fn test_cycle_metrics_exported() {
        let registry = Registry::new();
        let metrics = CycleMetrics::new(&registry).unwrap();
        metrics.record_success(Duration::from_secs(1), 3, 21).await;

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"cryptos_exporter_cycles_total".to_string()));
        assert!(names.contains(&"cryptos_exporter_cycle_duration_seconds".to_string()));
        assert!(names.contains(&"cryptos_exporter_registered_series".to_string()));
    }

    #[test]
    fn test_double_registration_rejected() {
        let registry = Registry::new();
        CycleMetrics::new(&registry).unwrap();
        assert!(matches!(
            CycleMetrics::new(&registry),
            Err(RegistryError::Register { .. })
        ));
    }
}
