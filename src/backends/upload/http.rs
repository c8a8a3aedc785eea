// SPDX-License-Identifier: GPL-3.0-only

//! Image host uploader
//!
//! POSTs the raw PNG and expects `{"success": true, "url": "..."}` back.

use super::{Uploader, build_client, check_response, network_error, validate_url};
use crate::errors::UploadError;
use crate::pipelines::photo::CompositeResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct HostResponse {
    success: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Uploader for an image host taking `POST bytes -> {success, url}`
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpUploader {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, UploadError> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn upload(&self, image: &CompositeResult, captured_at_ms: i64) -> Result<String, UploadError> {
        debug!(endpoint = %self.endpoint, bytes = image.len(), "Uploading composite");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .header("x-capture-time", captured_at_ms.to_string())
            .body(image.png.to_vec());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = check_response(request.send().await.map_err(network_error)?).await?;
        let body: HostResponse = resp
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        if !body.success {
            return Err(UploadError::Service(
                body.error.unwrap_or_else(|| "upload rejected".into()),
            ));
        }
        let url = body
            .url
            .ok_or_else(|| UploadError::InvalidResponse("no url in response".into()))
            .and_then(|url| validate_url(&url))?;

        info!(url = %url, "Composite uploaded");
        Ok(url)
    }
}
