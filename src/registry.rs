//! Metric registry with get-or-create semantics
//!
//! Maps a structured `(metric, slug)` key to a live gauge. Each gauge is
//! registered with the collector registry exactly once, the first time its
//! key is seen, and kept for the lifetime of the process.

use crate::{
    constants::METRIC_PREFIX,
    error::RegistryError,
    types::AssetRecord,
};
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The per-asset series published for every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricName {
    PriceBtc,
    PriceUsd,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl MetricName {
    /// Every published metric
    pub const ALL: [MetricName; 7] = [
        MetricName::PriceBtc,
        MetricName::PriceUsd,
        MetricName::Open,
        MetricName::High,
        MetricName::Low,
        MetricName::Close,
        MetricName::Volume,
    ];

    /// Short name used in keys and logs
    pub fn key(&self) -> &'static str {
        match self {
            MetricName::PriceBtc => "price_btc",
            MetricName::PriceUsd => "price_usd",
            MetricName::Open => "open",
            MetricName::High => "high",
            MetricName::Low => "low",
            MetricName::Close => "close",
            MetricName::Volume => "volume",
        }
    }

    /// Series name under the `cryptos` namespace
    pub fn series_name(&self) -> &'static str {
        match self {
            MetricName::PriceBtc => "price_btc",
            MetricName::PriceUsd => "price_usd",
            MetricName::Open => "open_1_hour",
            MetricName::High => "high_1_hour",
            MetricName::Low => "low_1_hour",
            MetricName::Close => "close_1_hour",
            MetricName::Volume => "volume_1_hour",
        }
    }

    /// Fully qualified name as it appears in the exposition
    pub fn exposed_name(&self) -> String {
        format!("{}_{}", METRIC_PREFIX, self.series_name())
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricName::PriceBtc => "Spot price denominated in BTC",
            MetricName::PriceUsd => "Spot price denominated in USD",
            MetricName::Open => "Open price of the last 1 hour window",
            MetricName::High => "High price of the last 1 hour window",
            MetricName::Low => "Low price of the last 1 hour window",
            MetricName::Close => "Close price of the last 1 hour window",
            MetricName::Volume => "Traded volume of the last 1 hour window",
        }
    }

    /// Reads the source field for this metric from a record
    pub fn value_of(&self, record: &AssetRecord) -> f64 {
        let market = record.market_data();
        let ohlcv = &market.ohlcv_last_1_hour;
        match self {
            MetricName::PriceBtc => market.price_btc,
            MetricName::PriceUsd => market.price_usd,
            MetricName::Open => ohlcv.open,
            MetricName::High => ohlcv.high,
            MetricName::Low => ohlcv.low,
            MetricName::Close => ohlcv.close,
            MetricName::Volume => ohlcv.volume,
        }
    }
}

/// Identity of one series: derived from metric and slug only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub metric: MetricName,
    pub slug: String,
}

impl MetricKey {
    pub fn new(metric: MetricName, slug: impl Into<String>) -> Self {
        Self {
            metric,
            slug: slug.into(),
        }
    }
}

/// Static labels attached when a series is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLabels {
    pub asset: String,
    pub symbol: String,
    pub name: String,
}

impl SeriesLabels {
    pub fn new(
        asset: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            asset: asset.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    pub fn from_record(record: &AssetRecord) -> Self {
        Self::new(&record.slug, &record.symbol, &record.name)
    }

    fn to_const_labels(&self) -> HashMap<String, String> {
        HashMap::from([
            ("asset".to_string(), self.asset.clone()),
            ("symbol".to_string(), self.symbol.clone()),
            ("name".to_string(), self.name.clone()),
        ])
    }
}

/// A single-value series handle
///
/// Labels are fixed at creation. `set` is last-write-wins.
#[derive(Debug)]
pub struct MetricSeries {
    key: MetricKey,
    labels: SeriesLabels,
    gauge: Gauge,
}

impl MetricSeries {
    pub fn key(&self) -> &MetricKey {
        &self.key
    }

    pub fn labels(&self) -> &SeriesLabels {
        &self.labels
    }

    pub fn set(&self, value: f64) {
        self.gauge.set(value);
    }

    pub fn get(&self) -> f64 {
        self.gauge.get()
    }
}

/// Process-wide registry of asset series
///
/// Owns the collector registry that the scrape endpoint encodes, so any
/// other collector (e.g. cycle metrics) registers against it as well.
pub struct MetricRegistry {
    collectors: Registry,
    series: RwLock<HashMap<MetricKey, Arc<MetricSeries>>>,
}

impl MetricRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            collectors: Registry::new(),
            series: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying collector registry
    pub fn collectors(&self) -> &Registry {
        &self.collectors
    }

    /// Returns the series for `key`, creating it with `labels` if absent
    ///
    /// When the key already exists the passed labels are ignored and the
    /// original handle is returned.
    pub async fn get_or_create(
        &self,
        key: MetricKey,
        labels: SeriesLabels,
    ) -> Result<Arc<MetricSeries>, RegistryError> {
        {
            let series = self.series.read().await;
            if let Some(existing) = series.get(&key) {
                Self::note_label_drift(existing, &labels);
                return Ok(existing.clone());
            }
        }

        let mut series = self.series.write().await;
        match series.entry(key) {
            Entry::Occupied(entry) => {
                Self::note_label_drift(entry.get(), &labels);
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let handle = Arc::new(self.register(entry.key().clone(), labels)?);
                tracing::debug!(
                    metric = handle.key.metric.key(),
                    asset = %handle.key.slug,
                    "Registered new series"
                );
                Ok(entry.insert(handle).clone())
            }
        }
    }

    fn register(
        &self,
        key: MetricKey,
        labels: SeriesLabels,
    ) -> Result<MetricSeries, RegistryError> {
        let name = key.metric.key();
        let opts = Opts::new(key.metric.series_name(), key.metric.help())
            .namespace(METRIC_PREFIX)
            .const_labels(labels.to_const_labels());

        let gauge =
            Gauge::with_opts(opts).map_err(|source| RegistryError::Register { name, source })?;
        self.collectors
            .register(Box::new(gauge.clone()))
            .map_err(|source| RegistryError::Register { name, source })?;

        Ok(MetricSeries { key, labels, gauge })
    }

    fn note_label_drift(existing: &MetricSeries, labels: &SeriesLabels) {
        if existing.labels != *labels {
            tracing::debug!(
                metric = existing.key.metric.key(),
                asset = %existing.key.slug,
                kept_symbol = %existing.labels.symbol,
                kept_name = %existing.labels.name,
                reported_symbol = %labels.symbol,
                reported_name = %labels.name,
                "Asset labels changed; keeping labels from first registration"
            );
        }
    }

    /// Looks up an existing series
    pub async fn get(&self, key: &MetricKey) -> Option<Arc<MetricSeries>> {
        self.series.read().await.get(key).cloned()
    }

    /// Number of registered asset series
    pub async fn len(&self) -> usize {
        self.series.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.series.read().await.is_empty()
    }

    /// Serializes every registered collector in the text exposition format
    pub fn encode_text(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let families = self.collectors.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Content type matching `encode_text`
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
