//! Messari asset data source implementation

use crate::{
    constants::{MESSARI_API_KEY_HEADER, MESSARI_ASSETS_ENDPOINT, USER_AGENT},
    error::ProviderError,
    provider::AssetDataSource,
    types::{AssetQuery, AssetRecord},
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Messari envelope for successful list responses
#[derive(Debug, Deserialize)]
struct AssetsEnvelope {
    #[serde(default)]
    data: Option<Vec<AssetRecord>>,
}

/// Messari error bodies come in two shapes depending on the failing layer
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<ErrorStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    error_message: Option<String>,
}

/// Messari v2 data source
pub struct MessariProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MessariProvider {
    /// Creates a new Messari data source
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://data.messari.io/api/v2`
    /// * `api_key` - Sent as `x-messari-api-key` when present
    /// * `timeout` - Whole-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    fn build_url(&self) -> String {
        format!("{}{}", self.base_url, MESSARI_ASSETS_ENDPOINT)
    }

    /// Translates query options into URL parameters
    fn query_params(query: &AssetQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if !query.fields.is_empty() {
            params.push(("fields", query.fields.join(",")));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        params
    }

    /// Extracts the provider's message from an error body, if any
    fn error_message(status: StatusCode, body: &str) -> String {
        let decoded = serde_json::from_str::<ErrorBody>(body).ok().and_then(|err| {
            err.message
                .or_else(|| err.status.and_then(|s| s.error_message))
                .filter(|msg| !msg.is_empty())
        });

        decoded.unwrap_or_else(|| format!("unknown error, status code: {}", status.as_u16()))
    }
}

#[async_trait]
impl AssetDataSource for MessariProvider {
    async fn fetch_assets(&self, query: &AssetQuery) -> Result<Vec<AssetRecord>, ProviderError> {
        let url = self.build_url();
        let params = Self::query_params(query);
        tracing::debug!(url = %url, ?params, "Fetching assets from Messari");

        let mut request = self
            .client
            .get(&url)
            .query(&params)
            .header(ACCEPT, "application/json; charset=utf-8");
        if let Some(key) = &self.api_key {
            request = request.header(MESSARI_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(ProviderError::from_transport)?;
        let status = response.status();

        let body = response.text().await.map_err(ProviderError::from_transport)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimitExceeded(Self::error_message(
                status, &body,
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::ApiError(Self::error_message(status, &body)));
        }

        let envelope: AssetsEnvelope = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Messari response: {}", e))
        })?;

        let assets = envelope.data.unwrap_or_default();
        tracing::debug!(count = assets.len(), "Fetched assets from Messari");

        Ok(assets)
    }

    fn provider_name(&self) -> &'static str {
        "messari"
    }
}
