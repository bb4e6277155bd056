//! Module catalog fetching.
//!
//! The registry consumes the catalog through the [`ConfigFetcher`] trait so
//! tests can drive reconciliation with a mock instead of a live backend.
//! The real implementation is a thin `reqwest` client against the backend's
//! resource-type endpoint.
//!
//! Every fetch appends a `t=<millis>` query parameter.  Intermediate caches
//! between the shell and the backend have served stale catalogs before;
//! busting them per request keeps an explicit reload honest.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use simhub_core::domain::module::RawModuleItem;

/// Failures fetching or decoding the module catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level or JSON-decode failure from the HTTP client.
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("catalog endpoint returned HTTP {status}")]
    Status { status: u16 },
}

/// Source of the declarative module catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Fetches the raw catalog list.
    ///
    /// # Errors
    ///
    /// [`FetchError`] on transport, status, or decode failure.
    async fn fetch_catalog(&self) -> Result<Vec<RawModuleItem>, FetchError>;
}

/// `reqwest`-backed catalog fetcher.
pub struct HttpConfigFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpConfigFetcher {
    /// Builds a fetcher for the given catalog endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch_catalog(&self) -> Result<Vec<RawModuleItem>, FetchError> {
        let bust = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        debug!(endpoint = %self.endpoint, "fetching module catalog");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("t", bust.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_drives_the_trait() {
        // Arrange
        let mut mock = MockConfigFetcher::new();
        mock.expect_fetch_catalog().times(1).returning(|| {
            Ok(vec![serde_json::from_value(serde_json::json!({
                "type_key": "model", "type_name": "Model"
            }))
            .unwrap()])
        });

        // Act
        let catalog = mock.fetch_catalog().await.unwrap();

        // Assert
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].type_key, "model");
    }

    #[tokio::test]
    async fn test_fetch_against_closed_port_surfaces_http_error() {
        // Port 1 is never listening; the request must fail, not hang.
        let fetcher = HttpConfigFetcher::new("http://127.0.0.1:1/api/v1/resource-types");
        let err = fetcher.fetch_catalog().await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }
}
