//! Types for the asset poller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Decodes `null` the same way as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One asset as returned by the provider for a single poll cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Unique identifier within a cycle (e.g. "bitcoin")
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,

    /// Display symbol (e.g. "BTC")
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,

    /// Display name (e.g. "Bitcoin")
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: AssetMetrics,
}

impl AssetRecord {
    /// Creates a record with identity fields and zeroed metrics
    pub fn new(
        slug: impl Into<String>,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            symbol: symbol.into(),
            name: name.into(),
            metrics: AssetMetrics::default(),
        }
    }

    /// Shortcut to the market data block
    pub fn market_data(&self) -> &MarketData {
        &self.metrics.market_data
    }
}

/// Nested metric groups of an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub market_data: MarketData,

    #[serde(default, rename = "marketcap", deserialize_with = "null_as_default")]
    pub market_cap: MarketCap,

    #[serde(default, deserialize_with = "null_as_default")]
    pub misc_data: MiscData,
}

/// Spot prices and rolling-window figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_usd: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub price_btc: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub volume_last_24_hours: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_usd_last_24_hours: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub ohlcv_last_1_hour: Ohlcv,
}

/// Open/high/low/close/volume over a fixed window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    #[serde(default, deserialize_with = "null_as_default")]
    pub open: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub high: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub low: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub close: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketCap {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_marketcap_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiscData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sectors: Vec<String>,
}

/// Query options passed to a data source on each fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    /// Field paths to request; empty means provider default
    pub fields: Vec<String>,
    /// Maximum records per call
    pub limit: Option<u32>,
    /// 1-based page cursor
    pub page: Option<u32>,
}

impl AssetQuery {
    /// Returns a copy pointing at the given page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

/// Overall component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Recent cycle succeeded
    Healthy,
    /// Serving stale values
    Degraded,
    /// No cycle has succeeded yet
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_record() {
        let json = r#"{
            "id": "1e31218a-e44e-4285-820c-8282ee222035",
            "slug": "bitcoin",
            "symbol": "BTC",
            "name": "Bitcoin",
            "metrics": {
                "market_data": {
                    "price_usd": 65000.5,
                    "price_btc": 1.0,
                    "volume_last_24_hours": 1000.0,
                    "percent_change_usd_last_24_hours": -1.25,
                    "ohlcv_last_1_hour": {
                        "open": 64000, "high": 66000, "low": 63500,
                        "close": 65000.5, "volume": 12345.6
                    }
                },
                "marketcap": { "current_marketcap_usd": 1.2e12 },
                "misc_data": { "tags": ["pow"], "sectors": null }
            }
        }"#;

        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.slug, "bitcoin");
        assert_eq!(record.market_data().price_usd, 65000.5);
        assert_eq!(record.market_data().percent_change_usd_last_24_hours, -1.25);
        assert_eq!(record.market_data().ohlcv_last_1_hour.volume, 12345.6);
        assert_eq!(record.metrics.market_cap.current_marketcap_usd, 1.2e12);
        assert_eq!(record.metrics.misc_data.tags, vec!["pow".to_string()]);
        assert!(record.metrics.misc_data.sectors.is_empty());
    }

    #[test]
    fn test_missing_and_null_numbers_default_to_zero() {
        let json = r#"{
            "slug": "dogecoin",
            "symbol": "DOGE",
            "name": "Dogecoin",
            "metrics": {
                "market_data": { "price_usd": null, "ohlcv_last_1_hour": null }
            }
        }"#;

        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.market_data().price_usd, 0.0);
        assert_eq!(record.market_data().price_btc, 0.0);
        assert_eq!(record.market_data().ohlcv_last_1_hour, Ohlcv::default());
    }

    #[test]
    fn test_query_with_page_keeps_other_options() {
        let query = AssetQuery {
            fields: vec!["slug".into()],
            limit: Some(50),
            page: None,
        };
        let paged = query.with_page(3);
        assert_eq!(paged.page, Some(3));
        assert_eq!(paged.limit, Some(50));
        assert_eq!(paged.fields, query.fields);
    }
}
