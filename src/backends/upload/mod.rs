// SPDX-License-Identifier: MPL-2.0

//! Upload services for sharing composites
//!
//! An uploader turns PNG bytes into a public URL that fits in a QR code.
//! Which service is used comes from the saved configuration; without
//! credentials the [`DisabledUploader`] skips uploads for the session.

pub mod http;
pub mod storage;

pub use http::HttpUploader;
pub use storage::StorageUploader;

use crate::config::UploadConfig;
use crate::constants::QR_MAX_BYTES;
use crate::errors::UploadError;
use crate::pipelines::photo::CompositeResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Give up on an upload after this long
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that publishes a composite and returns where it lives
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Short service name for logs
    fn name(&self) -> &'static str;

    /// False when uploads are skipped for the whole session
    fn is_enabled(&self) -> bool {
        true
    }

    /// Upload `image`, named after its capture time
    async fn upload(&self, image: &CompositeResult, captured_at_ms: i64) -> Result<String, UploadError>;
}

/// Uploader used when no credentials are configured
#[derive(Debug, Default)]
pub struct DisabledUploader;

#[async_trait]
impl Uploader for DisabledUploader {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn upload(&self, _image: &CompositeResult, _captured_at_ms: i64) -> Result<String, UploadError> {
        Err(UploadError::Disabled)
    }
}

/// Build the uploader for a saved configuration
pub fn from_config(config: &UploadConfig) -> Arc<dyn Uploader> {
    let built = match config {
        UploadConfig::Disabled => return Arc::new(DisabledUploader),
        UploadConfig::Http { endpoint, api_key } => {
            HttpUploader::new(endpoint, api_key.clone()).map(|u| Arc::new(u) as Arc<dyn Uploader>)
        }
        UploadConfig::Storage {
            base_url,
            bucket,
            token,
            public_base_url,
        } => StorageUploader::new(base_url, bucket, token, public_base_url)
            .map(|u| Arc::new(u) as Arc<dyn Uploader>),
    };

    built.unwrap_or_else(|e| {
        warn!(error = %e, "Upload service unusable, uploads disabled");
        Arc::new(DisabledUploader)
    })
}

pub(crate) fn build_client() -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .timeout(UPLOAD_TIMEOUT)
        .build()
        .map_err(|e| UploadError::Network(format!("HTTP client: {}", e)))
}

/// Check that a returned locator can be shared as a QR code
pub fn validate_url(url: &str) -> Result<String, UploadError> {
    let url = url.trim();
    let parsed =
        reqwest::Url::parse(url).map_err(|e| UploadError::InvalidResponse(format!("{}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UploadError::InvalidResponse(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if url.len() > QR_MAX_BYTES {
        return Err(UploadError::InvalidResponse(format!(
            "URL of {} bytes does not fit a QR code",
            url.len()
        )));
    }
    Ok(url.to_string())
}

/// Map a non-success response to an error
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read error body");
        String::new()
    });
    match status.as_u16() {
        401 | 403 => Err(UploadError::Service(format!("credentials rejected ({}): {}", status, text))),
        413 => Err(UploadError::Service("image too large for the service".into())),
        _ => Err(UploadError::Service(format!("{}: {}", status, text))),
    }
}

fn network_error(e: reqwest::Error) -> UploadError {
    UploadError::Network(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_https() {
        assert_eq!(
            validate_url(" https://img.example/abc.png\n").unwrap(),
            "https://img.example/abc.png"
        );
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://img.example/a.png").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_validate_url_rejects_oversized() {
        let url = format!("https://img.example/{}", "a".repeat(QR_MAX_BYTES));
        assert!(matches!(validate_url(&url), Err(UploadError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_credentials_disable_uploads() {
        assert!(!from_config(&UploadConfig::Disabled).is_enabled());
    }
}
