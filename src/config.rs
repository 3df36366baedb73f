//! `application.yaml` loading and logging initialization

use crate::{
    constants::{
        API_KEY_ENV, CONFIG_PATH_ENV, DEFAULT_ASSET_FIELDS, DEFAULT_ASSET_LIMIT,
        DEFAULT_CONFIG_PATH, DEFAULT_LISTEN_ADDR, DEFAULT_MAX_PAGES, DEFAULT_METRICS_PATH,
        DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, HEALTH_PATH, MESSARI_API_URL,
    },
    error::ConfigError,
    poller::PollerOptions,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub messari: MessariConfig,
    pub poll: PollConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Provider connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessariConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for MessariConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: MESSARI_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl MessariConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Poll cycle settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub limit: u32,
    pub max_pages: u32,
    pub fields: Vec<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            limit: DEFAULT_ASSET_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
            fields: DEFAULT_ASSET_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Scrape endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    /// Initialize the tracing subscriber; `RUST_LOG` wins over `level`
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Config {
    /// Config path from `COINSPEED_CONFIG`, else `application.yaml`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Reads, parses and validates a config file
    ///
    /// A `MESSARI_API_KEY` environment variable replaces the file's key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&contents).map_err(|err| match err {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.messari.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Parses and validates YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
                path: PathBuf::new(),
                source,
            })?
        };

        config.messari.api_key = config.messari.api_key.filter(|key| !key.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::invalid("poll.interval_secs", "must be greater than zero"));
        }
        if self.poll.limit == 0 {
            return Err(ConfigError::invalid("poll.limit", "must be greater than zero"));
        }
        if self.poll.max_pages == 0 {
            return Err(ConfigError::invalid("poll.max_pages", "must be at least 1"));
        }
        if self.messari.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "messari.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.messari.base_url.is_empty() {
            return Err(ConfigError::invalid("messari.base_url", "must not be empty"));
        }
        if !self.server.metrics_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "server.metrics_path",
                format!("{:?} must start with '/'", self.server.metrics_path),
            ));
        }
        if self.server.metrics_path == HEALTH_PATH {
            return Err(ConfigError::invalid(
                "server.metrics_path",
                format!("{} is reserved for the health report", HEALTH_PATH),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.listen_addr.parse().map_err(|e| {
            ConfigError::invalid(
                "server.listen_addr",
                format!("{:?}: {}", self.server.listen_addr, e),
            )
        })
    }

    /// Poll cycle settings; the fetch deadline matches the request timeout
    pub fn poller_options(&self) -> PollerOptions {
        PollerOptions {
            interval: Duration::from_secs(self.poll.interval_secs),
            fetch_timeout: self.messari.request_timeout(),
            fields: self.poll.fields.clone(),
            limit: self.poll.limit,
            max_pages: self.poll.max_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_full_config() {
        let yaml = r#"
messari:
  api_key: abc123
  base_url: https://example.test/api/v2
  request_timeout_secs: 30
poll:
  interval_secs: 120
  limit: 50
  max_pages: 4
  fields: [slug, symbol]
server:
  listen_addr: 127.0.0.1:9000
  metrics_path: /metrics
logging:
  level: debug
  format: json
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.messari.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.listen_addr().unwrap().port(), 9000);
        assert_eq!(config.logging.format, "json");

        let options = config.poller_options();
        assert_eq!(options.interval, Duration::from_secs(120));
        assert_eq!(options.fetch_timeout, Duration::from_secs(30));
        assert_eq!(options.fields, vec!["slug".to_string(), "symbol".to_string()]);
        assert_eq!(options.limit, 50);
        assert_eq!(options.max_pages, 4);
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_yaml("messari:\n  api_key: k\n").unwrap();
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.messari.api_key.as_deref(), Some("k"));
        assert_eq!(config.poll.limit, 200);
        assert_eq!(config.messari.base_url, MESSARI_API_URL);
        assert_eq!(config.server.metrics_path, "/");
        assert_eq!(config.listen_addr().unwrap().port(), 2112);
        assert!(config
            .poll
            .fields
            .contains(&"metrics/market_data/ohlcv_last_1_hour".to_string()));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert!(config.messari.api_key.is_none());
        assert_eq!(config.poller_options(), PollerOptions::default());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Config::from_yaml("poll:\n  interval_secs: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "poll.interval_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_paths_and_addresses() {
        assert!(matches!(
            Config::from_yaml("server:\n  metrics_path: metrics\n"),
            Err(ConfigError::InvalidValue {
                field: "server.metrics_path",
                ..
            })
        ));
        assert!(matches!(
            Config::from_yaml("server:\n  metrics_path: /health\n"),
            Err(ConfigError::InvalidValue {
                field: "server.metrics_path",
                ..
            })
        ));
        assert!(matches!(
            Config::from_yaml("server:\n  listen_addr: not-an-address\n"),
            Err(ConfigError::InvalidValue {
                field: "server.listen_addr",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_and_malformed_yaml() {
        assert!(matches!(
            Config::from_yaml("poll:\n  intervall_secs: 10\n"),
            Err(ConfigError::Yaml { .. })
        ));
        assert!(matches!(
            Config::from_yaml("poll: [unterminated"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll:\n  interval_secs: 15").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.poll.interval_secs, 15);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("application.yaml");

        match Config::load(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll: [").unwrap();

        match Config::load(file.path()) {
            Err(ConfigError::Yaml { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected yaml error, got {:?}", other),
        }
    }
}
