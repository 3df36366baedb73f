//! Data source abstraction for fetching asset snapshots from external APIs

use crate::{
    error::ProviderError,
    types::{AssetQuery, AssetRecord},
};
use async_trait::async_trait;

/// Trait for asset data sources
///
/// A data source is pure request/response: it holds no per-cycle state and
/// never retries. Retry policy belongs to the caller.
#[async_trait]
pub trait AssetDataSource: Send + Sync {
    /// Fetches one page of assets
    ///
    /// # Arguments
    /// * `query` - Field selection, page size and page cursor
    ///
    /// # Returns
    /// The decoded records, or an error. A decode failure never yields a
    /// partial list.
    async fn fetch_assets(&self, query: &AssetQuery) -> Result<Vec<AssetRecord>, ProviderError>;

    /// Returns the name of this data source
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted response for one fetch
    pub enum MockResponse {
        Assets(Vec<AssetRecord>),
        Error(ProviderError),
        /// Sleeps before answering with the records
        Delayed(Duration, Vec<AssetRecord>),
    }

    /// Mock data source for testing
    ///
    /// Responses are consumed in order; once exhausted every call returns an
    /// empty list.
    #[derive(Clone, Default)]
    pub struct MockDataSource {
        responses: Arc<Mutex<VecDeque<MockResponse>>>,
        queries: Arc<Mutex<Vec<AssetQuery>>>,
    }

    impl MockDataSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_assets(&self, assets: Vec<AssetRecord>) {
            self.push(MockResponse::Assets(assets));
        }

        pub fn push_error(&self, error: ProviderError) {
            self.push(MockResponse::Error(error));
        }

        pub fn push_delayed(&self, delay: Duration, assets: Vec<AssetRecord>) {
            self.push(MockResponse::Delayed(delay, assets));
        }

        fn push(&self, response: MockResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn call_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }

        pub fn queries(&self) -> Vec<AssetQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AssetDataSource for MockDataSource {
        async fn fetch_assets(
            &self,
            query: &AssetQuery,
        ) -> Result<Vec<AssetRecord>, ProviderError> {
            self.queries.lock().unwrap().push(query.clone());
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(MockResponse::Assets(assets)) => Ok(assets),
                Some(MockResponse::Error(err)) => Err(err),
                Some(MockResponse::Delayed(delay, assets)) => {
                    tokio::time::sleep(delay).await;
                    Ok(assets)
                }
                None => Ok(Vec::new()),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
