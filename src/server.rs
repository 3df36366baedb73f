//! Scrape endpoint
//!
//! Serves the text exposition of every registered series on the configured
//! path and a JSON health report on `/health`. Read-only: requests never
//! touch the poll cycle.

use crate::{
    constants::HEALTH_PATH,
    error::ServerError,
    poller::Poller,
    types::HealthStatus,
};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::AddrIncoming;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

struct ServerState {
    metrics_path: String,
    poller: Arc<Poller>,
}

/// HTTP server exposing the poller's registry
pub struct ExpositionServer {
    incoming: AddrIncoming,
    state: Arc<ServerState>,
}

impl ExpositionServer {
    /// Binds the listener; serving starts with `serve`
    pub fn bind(
        addr: SocketAddr,
        metrics_path: impl Into<String>,
        poller: Arc<Poller>,
    ) -> Result<Self, ServerError> {
        let incoming =
            AddrIncoming::bind(&addr).map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            incoming,
            state: Arc::new(ServerState {
                metrics_path: metrics_path.into(),
                poller,
            }),
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.incoming.local_addr()
    }

    /// Serves until the process is killed
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `signal` resolves, then drains open connections
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr();
        let state = self.state;

        let make_svc = make_service_fn(move |_conn| {
            let state = Arc::clone(&state);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let state = Arc::clone(&state);
                    handle_request(req, state)
                }))
            }
        });

        tracing::info!(%addr, "Exposition endpoint listening");

        Server::builder(self.incoming)
            .serve(make_svc)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Exposition endpoint stopped");
        Ok(())
    }
}

fn respond(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

async fn handle_request(
    req: Request<Body>,
    state: Arc<ServerState>,
) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path();
    tracing::debug!(method = %req.method(), path, "Scrape request");

    if req.method() != Method::GET {
        return Ok(respond(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain",
            "Method not allowed",
        ));
    }

    if path == state.metrics_path {
        return Ok(handle_metrics(&state.poller));
    }
    if path == HEALTH_PATH {
        return Ok(handle_health(&state.poller).await);
    }

    Ok(respond(StatusCode::NOT_FOUND, "text/plain", "Not found"))
}

fn handle_metrics(poller: &Poller) -> Response<Body> {
    let registry = poller.registry();
    match registry.encode_text() {
        Ok(text) => respond(StatusCode::OK, &registry.content_type(), text),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                e.to_string(),
            )
        }
    }
}

async fn handle_health(poller: &Poller) -> Response<Body> {
    let health = poller.health_check().await;
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    match serde_json::to_string(&health) {
        Ok(body) => respond(status, "application/json", body),
        Err(e) => respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain",
            e.to_string(),
        ),
    }
}
