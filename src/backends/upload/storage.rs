// SPDX-License-Identifier: GPL-3.0-only

//! Object storage uploader
//!
//! PUTs the PNG to `<base>/<bucket>/photobooth_<ms>.png` and returns the
//! same path under the public base URL.

use super::{Uploader, build_client, check_response, network_error, validate_url};
use crate::constants::photo_file_name;
use crate::errors::UploadError;
use crate::pipelines::photo::CompositeResult;
use async_trait::async_trait;
use tracing::{debug, info};

/// Uploader for a bucket taking `PUT bytes to path`
pub struct StorageUploader {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: String,
    public_base_url: String,
}

impl StorageUploader {
    pub fn new(
        base_url: &str,
        bucket: &str,
        token: &str,
        public_base_url: &str,
    ) -> Result<Self, UploadError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            token: token.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Object path inside the bucket
    fn object_path(&self, captured_at_ms: i64) -> String {
        format!("{}/{}", self.bucket, photo_file_name(captured_at_ms))
    }
}

#[async_trait]
impl Uploader for StorageUploader {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn upload(&self, image: &CompositeResult, captured_at_ms: i64) -> Result<String, UploadError> {
        let path = self.object_path(captured_at_ms);
        let target = format!("{}/{}", self.base_url, path);
        debug!(target = %target, bytes = image.len(), "Uploading composite");

        let resp = self
            .client
            .put(&target)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(image.png.to_vec())
            .send()
            .await
            .map_err(network_error)?;
        check_response(resp).await?;

        let url = validate_url(&format!("{}/{}", self.public_base_url, path))?;
        info!(url = %url, "Composite stored");
        Ok(url)
    }
}
