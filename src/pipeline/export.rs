//! Remote export: the only stage with network I/O.
//!
//! [`ExportClient`] is the seam between the pipeline and Google Drive. The
//! orchestrator only needs "give me this document as this MIME type", so
//! tests substitute an in-memory client and never touch the network.
//!
//! There is no retry here. A failed export surfaces immediately; wrapping
//! the client in a retrying one is left to callers that want it.

use crate::config::ExportConfig;
use crate::credentials::AccessToken;
use crate::error::GDocDownError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Anything that can export a Drive document to a MIME type.
pub trait ExportClient: Send + Sync {
    /// Export `document_id` as `mime_type` and return the payload.
    fn export(
        &self,
        document_id: &str,
        mime_type: &str,
    ) -> impl Future<Output = Result<Vec<u8>, GDocDownError>> + Send;
}

/// Drive v3 `files/{id}/export` over HTTPS with a bearer token.
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    token: AccessToken,
    timeout_secs: u64,
}

impl DriveClient {
    pub fn new(token: AccessToken, config: &ExportConfig) -> Result<Self, GDocDownError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("gdoc-down/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GDocDownError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            token,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Export endpoint for one document. The id is one percent-encoded path
    /// segment, so `/`, `?` and `#` in it cannot change the request target.
    pub fn export_url(&self, document_id: &str) -> Result<reqwest::Url, GDocDownError> {
        let invalid = || {
            GDocDownError::InvalidConfig(format!("API base URL '{}' cannot take a path", self.base_url))
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["files", document_id, "export"]);
        Ok(url)
    }
}

impl ExportClient for DriveClient {
    async fn export(&self, document_id: &str, mime_type: &str) -> Result<Vec<u8>, GDocDownError> {
        let url = self.export_url(document_id)?;
        info!("Exporting {} as {}", document_id, mime_type);

        let request_failed = |e: reqwest::Error| {
            if e.is_timeout() {
                GDocDownError::ExportTimeout {
                    document_id: document_id.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                GDocDownError::ExportRequestFailed {
                    document_id: document_id.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .http
            .get(url)
            .query(&[("mimeType", mime_type)])
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            debug!("Export of {} answered {}", document_id, status);
            return Err(GDocDownError::ExportFailed {
                document_id: document_id.to_string(),
                mime_type: mime_type.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_failed)?;
        debug!("Export of {}: {} bytes", document_id, bytes.len());
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_url_uses_base() {
        let config = ExportConfig::builder()
            .api_base_url("http://127.0.0.1:1/drive/v3/")
            .build()
            .unwrap();
        let client = DriveClient::new(AccessToken::new("t"), &config).unwrap();
        assert_eq!(
            client.export_url("abc").unwrap().as_str(),
            "http://127.0.0.1:1/drive/v3/files/abc/export"
        );
    }

    #[test]
    fn export_url_encodes_the_id_as_one_segment() {
        let config = ExportConfig::builder()
            .api_base_url("http://127.0.0.1:1/drive/v3")
            .build()
            .unwrap();
        let client = DriveClient::new(AccessToken::new("t"), &config).unwrap();
        let url = client.export_url("a/b?x=1#frag").unwrap();
        assert_eq!(url.path(), "/drive/v3/files/a%2Fb%3Fx=1%23frag/export");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let bare = DriveClient::new(
            AccessToken::new("t"),
            &ExportConfig::builder().api_base_url("http://127.0.0.1:1").build().unwrap(),
        )
        .unwrap();
        assert_eq!(bare.export_url("abc").unwrap().path(), "/files/abc/export");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_failure() {
        // Port 1 on loopback refuses connections immediately.
        let config = ExportConfig::builder()
            .api_base_url("http://127.0.0.1:1")
            .request_timeout_secs(5)
            .build()
            .unwrap();
        let client = DriveClient::new(AccessToken::new("t"), &config).unwrap();
        let err = client.export("abc", "application/pdf").await.unwrap_err();
        assert!(
            matches!(
                err,
                GDocDownError::ExportRequestFailed { .. } | GDocDownError::ExportTimeout { .. }
            ),
            "{err}"
        );
    }
}
