//! # Coinspeed Exporter
//!
//! Periodically polls the Messari asset listing and republishes selected
//! market data fields as Prometheus gauges for scraping.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (every poll.interval_secs)
//!     ↓
//! Poller::run_cycle
//!     ↓
//! AssetDataSource (Messari /assets)
//!     ↓
//! Publisher::publish  ×  each record
//!     ↓
//! MetricRegistry::get_or_create(key).set(value)  ×  7 metrics
//!     ↑
//! ExpositionServer (GET /)
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use coinspeed_exporter::{MessariProvider, MetricRegistry, Poller, PollerOptions};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = MessariProvider::new(
//!     "https://data.messari.io/api/v2",
//!     None,
//!     Duration::from_secs(60),
//! )?;
//! let registry = Arc::new(MetricRegistry::new());
//! let poller = Arc::new(Poller::new(
//!     Arc::new(source),
//!     registry.clone(),
//!     PollerOptions::default(),
//! )?);
//!
//! let report = poller.run_cycle().await?;
//! println!("published {} assets", report.assets);
//! println!("{}", registry.encode_text()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Series identity
//!
//! A series is keyed by `(MetricName, slug)`. The first record seen for a
//! slug fixes the `asset`, `symbol` and `name` labels; later cycles only
//! update the value. Series are never removed.

pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod provider;
pub mod providers;
pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ConfigError, PollError, ProviderError, RegistryError};
pub use poller::{CycleReport, Poller, PollerOptions};
pub use provider::AssetDataSource;
pub use providers::MessariProvider;
pub use publisher::Publisher;
pub use registry::{MetricKey, MetricName, MetricRegistry, MetricSeries, SeriesLabels};
pub use scheduler::Scheduler;
pub use server::ExpositionServer;
pub use types::{AssetQuery, AssetRecord, ComponentHealth, HealthStatus};
