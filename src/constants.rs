//! Constants for the Coinspeed exporter
//!
//! Defaults for every setting that `application.yaml` may override, plus the
//! fixed names used on the wire and in the exposition output.

/// How often to poll the provider (in seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// HTTP request timeout and cycle fetch deadline (in seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum number of assets requested per page
pub const DEFAULT_ASSET_LIMIT: u32 = 200;

/// Number of pages fetched per cycle
pub const DEFAULT_MAX_PAGES: u32 = 1;

/// A cycle is considered stale after this many intervals without success
pub const STALE_AFTER_INTERVALS: u32 = 3;

/// Fields requested from the provider by default
pub const DEFAULT_ASSET_FIELDS: &[&str] = &[
    "id",
    "slug",
    "name",
    "symbol",
    "metrics/market_data/price_usd",
    "metrics/market_data/price_btc",
    "metrics/market_data/ohlcv_last_1_hour",
];

/// Messari v2 API base URL
pub const MESSARI_API_URL: &str = "https://data.messari.io/api/v2";

/// Messari endpoint listing all assets
pub const MESSARI_ASSETS_ENDPOINT: &str = "/assets";

/// Header carrying the Messari API key
pub const MESSARI_API_KEY_HEADER: &str = "x-messari-api-key";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coinspeed-exporter/0.1.0";

/// Default config file, resolved against the working directory
pub const DEFAULT_CONFIG_PATH: &str = "application.yaml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "COINSPEED_CONFIG";

/// Environment variable overriding the configured API key
pub const API_KEY_ENV: &str = "MESSARI_API_KEY";

/// Address the scrape endpoint listens on
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";

/// Path serving the text exposition
pub const DEFAULT_METRICS_PATH: &str = "/";

/// Path serving the JSON health report
pub const HEALTH_PATH: &str = "/health";

/// Prefix shared by every exposed series
pub const METRIC_PREFIX: &str = "cryptos";
