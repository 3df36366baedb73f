use coinspeed_exporter::{
    AppError, Config, ExpositionServer, MessariProvider, MetricRegistry, Poller,
};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("coinspeed-exporter: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::load(Config::default_path())?;
    config.logging.init();

    let source = MessariProvider::new(
        config.messari.base_url.clone(),
        config.messari.api_key.clone(),
        config.messari.request_timeout(),
    )?;

    let registry = Arc::new(MetricRegistry::new());
    let poller = Arc::new(Poller::new(
        Arc::new(source),
        registry,
        config.poller_options(),
    )?);

    let server = ExpositionServer::bind(
        config.listen_addr()?,
        config.server.metrics_path.clone(),
        poller.clone(),
    )?;

    tracing::info!(
        interval_secs = config.poll.interval_secs,
        limit = config.poll.limit,
        max_pages = config.poll.max_pages,
        api_key_configured = config.messari.api_key.is_some(),
        "Starting coinspeed exporter"
    );

    let cycles = poller.start()?;

    let result = server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await;

    cycles.abort();
    result.map_err(AppError::from)
}
