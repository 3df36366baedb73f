//! Error types for the Coinspeed exporter

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching assets from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded, with the provider's message
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

impl ProviderError {
    /// Maps a transport error, keeping timeouts distinguishable
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

/// Errors raised while registering metric series
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The collector registry refused the series
    #[error("Failed to register series {name}: {source}")]
    Register {
        name: &'static str,
        #[source]
        source: prometheus::Error,
    },

    /// The text exposition could not be produced
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    /// Encoded exposition was not valid UTF-8
    #[error("Encoded metrics are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors loading `application.yaml`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File missing or unreadable
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML for the expected schema
    #[error("Failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A field parsed but holds an unusable value
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    /// Creates an InvalidValue error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors constructing the scheduler
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A zero period would spin
    #[error("Scheduler interval must be greater than zero")]
    ZeroInterval,
}

/// Errors that abort a single poll cycle
#[derive(Debug, Error)]
pub enum PollError {
    /// The provider returned an error for one of the pages
    #[error("Fetching page {page} failed: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: ProviderError,
    },

    /// The cycle deadline expired before the fetch completed
    #[error("Fetch did not complete within {0:?}")]
    Timeout(Duration),
}

/// Errors from the scrape endpoint
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: hyper::Error,
    },

    /// Server stopped with an error
    #[error("Server error: {0}")]
    Serve(#[from] hyper::Error),
}

/// Startup and runtime errors surfaced by the binary
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Server(#[from] ServerError),
}
