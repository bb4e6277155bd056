//! The backend upload API.
//!
//! The coordinator talks to the backend through the [`UploadApi`] trait,
//! mockable in tests.  [`HttpUploadApi`] is the production implementation
//! over the integration endpoints:
//!
//! ```text
//! POST /api/v1/integration/upload/token              → {ticket_id, presigned_url}
//! POST /api/v1/integration/upload/confirm
//! POST /api/v1/integration/upload/multipart/init     → {upload_id, ticket_id, object_key}
//! POST /api/v1/integration/upload/multipart/part-url → {url}
//! POST /api/v1/integration/upload/multipart/complete
//! ```
//!
//! PUTs to presigned URLs go through a bare client with no auth header:
//! the signature already authorizes the exact request, and object stores
//! reject presigned PUTs that carry an extra Authorization header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::domain::meta::UploadMetadata;
use crate::domain::plan::PartRecord;

/// Failures from the upload endpoints or the object store.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level or JSON-decode failure.
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-success status from an endpoint.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// The object store's PUT response carried no ETag header.
    #[error("object store response for part {part_number} carried no etag")]
    MissingEtag { part_number: u32 },
}

/// Grant for a single-shot upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub ticket_id: String,
    pub presigned_url: String,
}

/// An open multipart session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartSession {
    pub upload_id: String,
    pub ticket_id: String,
    pub object_key: String,
}

/// Everything the coordinator needs from the backend and object store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Issues a single-shot upload grant.
    async fn issue_token(&self, meta: &UploadMetadata) -> Result<TokenGrant, ApiError>;

    /// PUTs the whole object to a presigned URL.
    async fn put_object(&self, presigned_url: &str, body: Vec<u8>) -> Result<(), ApiError>;

    /// Confirms a completed single-shot upload.
    async fn confirm(&self, ticket_id: &str, meta: &UploadMetadata) -> Result<(), ApiError>;

    /// Opens a multipart session for `part_count` parts.
    async fn init_multipart(
        &self,
        meta: &UploadMetadata,
        part_count: u64,
    ) -> Result<MultipartSession, ApiError>;

    /// Issues a one-time URL for exactly one part number.
    async fn part_url(
        &self,
        session: &MultipartSession,
        part_number: u32,
    ) -> Result<String, ApiError>;

    /// PUTs one part and returns the raw (possibly quoted) ETag.
    async fn upload_part(
        &self,
        url: &str,
        part_number: u32,
        body: Vec<u8>,
    ) -> Result<String, ApiError>;

    /// Stitches the session together from the sorted manifest.
    async fn complete(
        &self,
        session: &MultipartSession,
        parts: &[PartRecord],
        meta: &UploadMetadata,
    ) -> Result<(), ApiError>;
}

// ── HTTP implementation ───────────────────────────────────────────────────────

/// `reqwest`-backed implementation against the integration endpoints.
pub struct HttpUploadApi {
    /// Authenticated client for backend endpoints.
    api_client: reqwest::Client,
    /// Bare client for presigned PUTs.
    store_client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PartUrlResponse {
    url: String,
}

impl HttpUploadApi {
    /// Builds an API over `base_url` using `api_client` for backend calls.
    ///
    /// Callers attach their auth header via the client's default headers;
    /// presigned PUTs always use a separate bare client.
    pub fn new(base_url: impl Into<String>, api_client: reqwest::Client) -> Self {
        Self {
            api_client,
            store_client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/api/v1/integration/upload/{suffix}", self.base_url)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self
            .api_client
            .post(self.endpoint(endpoint))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn post_unit(
        &self,
        endpoint: &'static str,
        body: serde_json::Value,
    ) -> Result<(), ApiError> {
        let response = self
            .api_client
            .post(self.endpoint(endpoint))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn issue_token(&self, meta: &UploadMetadata) -> Result<TokenGrant, ApiError> {
        self.post_json("token", json!({ "meta": meta })).await
    }

    async fn put_object(&self, presigned_url: &str, body: Vec<u8>) -> Result<(), ApiError> {
        let response = self.store_client.put(presigned_url).body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: "presigned-put",
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn confirm(&self, ticket_id: &str, meta: &UploadMetadata) -> Result<(), ApiError> {
        self.post_unit("confirm", json!({ "ticket_id": ticket_id, "meta": meta }))
            .await
    }

    async fn init_multipart(
        &self,
        meta: &UploadMetadata,
        part_count: u64,
    ) -> Result<MultipartSession, ApiError> {
        debug!(part_count, "opening multipart session");
        self.post_json("multipart/init", json!({ "meta": meta, "part_count": part_count }))
            .await
    }

    async fn part_url(
        &self,
        session: &MultipartSession,
        part_number: u32,
    ) -> Result<String, ApiError> {
        let response: PartUrlResponse = self
            .post_json(
                "multipart/part-url",
                json!({
                    "upload_id": session.upload_id,
                    "object_key": session.object_key,
                    "part_number": part_number,
                }),
            )
            .await?;
        Ok(response.url)
    }

    async fn upload_part(
        &self,
        url: &str,
        part_number: u32,
        body: Vec<u8>,
    ) -> Result<String, ApiError> {
        let response = self.store_client.put(url).body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: "presigned-part-put",
                status: status.as_u16(),
            });
        }
        response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(ApiError::MissingEtag { part_number })
    }

    async fn complete(
        &self,
        session: &MultipartSession,
        parts: &[PartRecord],
        meta: &UploadMetadata,
    ) -> Result<(), ApiError> {
        self.post_unit(
            "multipart/complete",
            json!({
                "upload_id": session.upload_id,
                "ticket_id": session.ticket_id,
                "object_key": session.object_key,
                "parts": parts,
                "meta": meta,
            }),
        )
        .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths_follow_the_integration_prefix() {
        let api = HttpUploadApi::new("http://backend.local", reqwest::Client::new());
        assert_eq!(
            api.endpoint("multipart/init"),
            "http://backend.local/api/v1/integration/upload/multipart/init"
        );
        assert_eq!(
            api.endpoint("token"),
            "http://backend.local/api/v1/integration/upload/token"
        );
    }

    #[tokio::test]
    async fn test_issue_token_against_closed_port_surfaces_http_error() {
        let api = HttpUploadApi::new("http://127.0.0.1:1", reqwest::Client::new());
        let err = api.issue_token(&UploadMetadata::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }
}
