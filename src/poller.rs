//! Poll-transform-publish pipeline
//!
//! One cycle fetches every configured page from the data source, then
//! publishes each record through the `Publisher`. A failed or timed-out fetch
//! abandons the cycle before anything is published, so the registry keeps the
//! values of the last successful cycle.

use crate::{
    constants::{
        DEFAULT_ASSET_FIELDS, DEFAULT_ASSET_LIMIT, DEFAULT_MAX_PAGES, DEFAULT_POLL_INTERVAL_SECS,
        DEFAULT_REQUEST_TIMEOUT_SECS, STALE_AFTER_INTERVALS,
    },
    error::{PollError, RegistryError, SchedulerError},
    metrics::CycleMetrics,
    provider::AssetDataSource,
    publisher::Publisher,
    registry::MetricRegistry,
    scheduler::Scheduler,
    types::{AssetQuery, AssetRecord, ComponentHealth, HealthStatus},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// Settings for the poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PollerOptions {
    /// Period between cycle starts
    pub interval: Duration,
    /// Deadline for fetching every page of one cycle
    pub fetch_timeout: Duration,
    /// Field paths requested from the provider
    pub fields: Vec<String>,
    /// Records per page
    pub limit: u32,
    /// Upper bound on pages fetched per cycle
    pub max_pages: u32,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            fields: DEFAULT_ASSET_FIELDS.iter().map(|f| f.to_string()).collect(),
            limit: DEFAULT_ASSET_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Outcome of a successful cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub pages: u32,
    pub assets: usize,
    pub skipped: usize,
    pub series_updated: usize,
    pub elapsed: Duration,
}

/// Drives fetch-then-publish cycles against one data source
pub struct Poller {
    source: Arc<dyn AssetDataSource>,
    publisher: Publisher,
    metrics: CycleMetrics,
    options: PollerOptions,
}

impl Poller {
    /// Creates a poller publishing into `registry`
    ///
    /// Cycle metrics are registered alongside the asset series.
    pub fn new(
        source: Arc<dyn AssetDataSource>,
        registry: Arc<MetricRegistry>,
        options: PollerOptions,
    ) -> Result<Self, RegistryError> {
        let metrics = CycleMetrics::new(registry.collectors())?;
        Ok(Self {
            source,
            publisher: Publisher::new(registry),
            metrics,
            options,
        })
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        self.publisher.registry()
    }

    pub fn options(&self) -> &PollerOptions {
        &self.options
    }

    pub fn metrics(&self) -> &CycleMetrics {
        &self.metrics
    }

    /// Starts scheduled cycles in the background
    pub fn start(self: Arc<Self>) -> Result<JoinHandle<()>, SchedulerError> {
        let scheduler = Scheduler::every(self.options.interval)?;
        Ok(scheduler.start(move || {
            let poller = self.clone();
            async move { poller.tick().await }
        }))
    }

    /// Runs one cycle, swallowing the error
    ///
    /// The outcome is already logged and recorded by `run_cycle`.
    pub async fn tick(&self) {
        let _ = self.run_cycle().await;
    }

    /// Runs one fetch-then-publish cycle
    pub async fn run_cycle(&self) -> Result<CycleReport, PollError> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "poll_cycle",
            %cycle_id,
            provider = self.source.provider_name()
        );
        self.execute(cycle_id).instrument(span).await
    }

    async fn execute(&self, cycle_id: Uuid) -> Result<CycleReport, PollError> {
        let start = Instant::now();
        tracing::info!("Getting data from assets");

        let fetched = match tokio::time::timeout(self.options.fetch_timeout, self.fetch_all()).await
        {
            Ok(result) => result,
            Err(_) => Err(PollError::Timeout(self.options.fetch_timeout)),
        };

        let (records, pages) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                let elapsed = start.elapsed();
                tracing::warn!(
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Failed getting assets; keeping previous values"
                );
                self.metrics.record_failure(elapsed, &e.to_string()).await;
                return Err(e);
            }
        };

        let mut assets = 0;
        let mut skipped = 0;
        let mut series_updated = 0;
        for record in &records {
            if record.slug.is_empty() {
                tracing::warn!(
                    symbol = %record.symbol,
                    asset_name = %record.name,
                    "Skipping asset without slug"
                );
                skipped += 1;
                continue;
            }
            series_updated += self.publisher.publish(record).await;
            assets += 1;
        }

        let elapsed = start.elapsed();
        let series = self.registry().len().await;
        self.metrics.record_success(elapsed, assets, series).await;

        tracing::info!(
            pages,
            assets,
            skipped,
            series_updated,
            registered_series = series,
            elapsed_ms = elapsed.as_millis() as u64,
            "Poll cycle complete"
        );

        Ok(CycleReport {
            cycle_id,
            pages,
            assets,
            skipped,
            series_updated,
            elapsed,
        })
    }

    /// Fetches pages until one comes back short or `max_pages` is reached
    async fn fetch_all(&self) -> Result<(Vec<AssetRecord>, u32), PollError> {
        let base = AssetQuery {
            fields: self.options.fields.clone(),
            limit: Some(self.options.limit),
            page: None,
        };

        let mut records = Vec::new();
        let mut pages = 0;
        for page in 1..=self.options.max_pages {
            let batch = self
                .source
                .fetch_assets(&base.with_page(page))
                .await
                .map_err(|source| PollError::Fetch { page, source })?;

            pages = page;
            let short = batch.len() < self.options.limit as usize;
            tracing::debug!(page, count = batch.len(), "Fetched page");
            records.extend(batch);
            if short {
                break;
            }
        }

        Ok((records, pages))
    }

    /// Perform a health check on the poller
    ///
    /// # Returns
    /// ComponentHealth reflecting how recently a cycle succeeded
    pub async fn health_check(&self) -> ComponentHealth {
        let stats = self.metrics.stats().await;
        let stale_after = self
            .options
            .interval
            .checked_mul(STALE_AFTER_INTERVALS)
            .unwrap_or(Duration::MAX);
        let now = Utc::now();
        let status = classify(stats.last_success, now, stale_after);

        let mut details = HashMap::new();
        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.source.provider_name()),
        );
        details.insert(
            "registered_series".to_string(),
            serde_json::json!(self.registry().len().await),
        );
        details.insert(
            "successful_cycles".to_string(),
            serde_json::json!(stats.successful_cycles),
        );
        details.insert(
            "failed_cycles".to_string(),
            serde_json::json!(stats.failed_cycles),
        );
        details.insert(
            "last_success".to_string(),
            serde_json::json!(stats.last_success.map(|t| t.to_rfc3339())),
        );
        details.insert("last_error".to_string(), serde_json::json!(stats.last_error));

        let message = match status {
            HealthStatus::Healthy => "Poller is publishing fresh data".to_string(),
            HealthStatus::Degraded => format!(
                "No successful cycle in the last {}s; serving stale values",
                stale_after.as_secs()
            ),
            HealthStatus::Unhealthy => "No poll cycle has succeeded yet".to_string(),
        };

        ComponentHealth {
            name: "asset_poller".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: now,
        }
    }
}

fn classify(
    last_success: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> HealthStatus {
    match last_success {
        None => HealthStatus::Unhealthy,
        Some(at) => {
            let age = now.signed_duration_since(at).to_std().unwrap_or_default();
            if age > stale_after {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            }
        }
    }
}
