//! Maps asset records onto their metric series

use crate::{
    registry::{MetricKey, MetricName, MetricRegistry, SeriesLabels},
    types::AssetRecord,
};
use std::sync::Arc;

/// Publishes the fields of one asset record as gauge updates
#[derive(Clone)]
pub struct Publisher {
    registry: Arc<MetricRegistry>,
}

impl Publisher {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Updates every metric in `MetricName::ALL` for the record
    ///
    /// Never fails: a series that cannot be registered is logged and skipped,
    /// the remaining metrics are still updated.
    ///
    /// # Returns
    /// Number of series that were set
    pub async fn publish(&self, record: &AssetRecord) -> usize {
        let labels = SeriesLabels::from_record(record);
        let mut updated = 0;

        for metric in MetricName::ALL {
            let key = MetricKey::new(metric, record.slug.as_str());
            match self.registry.get_or_create(key, labels.clone()).await {
                Ok(series) => {
                    series.set(metric.value_of(record));
                    updated += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        metric = metric.key(),
                        asset = %record.slug,
                        "Failed to publish series"
                    );
                }
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ohlcv;

    fn bitcoin() -> AssetRecord {
        let mut record = AssetRecord::new("bitcoin", "BTC", "Bitcoin");
        record.metrics.market_data.price_usd = 65000.5;
        record.metrics.market_data.price_btc = 1.0;
        record.metrics.market_data.ohlcv_last_1_hour = Ohlcv {
            open: 64000.0,
            high: 66000.0,
            low: 63500.0,
            close: 65000.5,
            volume: 12345.6,
        };
        record
    }

    async fn value(registry: &MetricRegistry, metric: MetricName, slug: &str) -> f64 {
        registry
            .get(&MetricKey::new(metric, slug))
            .await
            .map(|series| series.get())
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_bitcoin_sets_all_seven_series() {
        let registry = Arc::new(MetricRegistry::new());
        let publisher = Publisher::new(registry.clone());

        assert_eq!(publisher.publish(&bitcoin()).await, 7);
        assert_eq!(registry.len().await, 7);

        let expected = [
            (MetricName::PriceUsd, 65000.5),
            (MetricName::PriceBtc, 1.0),
            (MetricName::Open, 64000.0),
            (MetricName::High, 66000.0),
            (MetricName::Low, 63500.0),
            (MetricName::Close, 65000.5),
            (MetricName::Volume, 12345.6),
        ];
        for (metric, want) in expected {
            assert_eq!(value(&registry, metric, "bitcoin").await, want, "{:?}", metric);
            let series = registry
                .get(&MetricKey::new(metric, "bitcoin"))
                .await
                .unwrap();
            assert_eq!(series.labels(), &SeriesLabels::new("bitcoin", "BTC", "Bitcoin"));
        }
    }

    #[tokio::test]
    async fn test_republish_reuses_handles_and_overwrites() {
        let registry = Arc::new(MetricRegistry::new());
        let publisher = Publisher::new(registry.clone());

        publisher.publish(&bitcoin()).await;
        let before = registry
            .get(&MetricKey::new(MetricName::PriceUsd, "bitcoin"))
            .await
            .unwrap();

        let mut next = bitcoin();
        next.metrics.market_data.price_usd = 66100.0;
        next.symbol = "XBT".into();
        publisher.publish(&next).await;

        let after = registry
            .get(&MetricKey::new(MetricName::PriceUsd, "bitcoin"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.get(), 66100.0);
        assert_eq!(after.labels().symbol, "BTC");
        assert_eq!(registry.len().await, 7);
    }

    #[tokio::test]
    async fn test_zeroed_record_publishes_zeros() {
        let registry = Arc::new(MetricRegistry::new());
        let publisher = Publisher::new(registry.clone());

        publisher
            .publish(&AssetRecord::new("tether", "USDT", "Tether"))
            .await;

        for metric in MetricName::ALL {
            assert_eq!(value(&registry, metric, "tether").await, 0.0);
        }
    }

    #[tokio::test]
    async fn test_multiple_assets_grow_registry() {
        let registry = Arc::new(MetricRegistry::new());
        let publisher = Publisher::new(registry.clone());

        publisher.publish(&bitcoin()).await;
        publisher
            .publish(&AssetRecord::new("ethereum", "ETH", "Ethereum"))
            .await;

        assert_eq!(registry.len().await, 14);
        let text = registry.encode_text().unwrap();
        assert!(text.contains(r#"asset="ethereum""#));
        assert!(text.contains(r#"asset="bitcoin""#));
    }
}
