// SPDX-License-Identifier: MPL-2.0

//! Photo compositing pipeline
//!
//! ```text
//! CameraFrame ─▶ Compositor ─▶ PNG Encoding ─▶ CompositeResult
//!                    ▲
//!              Overlay (per mode)
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Crop and scale**: Center crop to the mode's aspect, scale to its size
//! 2. **Mirror**: Horizontal flip of the video only
//! 3. **Overlay**: Drawn over the whole canvas when one is loaded
//! 4. **Encoding**: Lossless PNG

pub mod compositor;
pub mod encoding;
pub mod overlay;

pub use compositor::{CropPlan, crop_plan};
pub use encoding::CompositeResult;
pub use overlay::{Overlay, OverlaySet};

use crate::backends::camera::types::CameraFrame;
use crate::config::Config;
use crate::constants::{CaptureMode, LANDSCAPE_TARGET, PORTRAIT_TARGET, Resolution};
use crate::errors::PhotoError;
use image::RgbaImage;
use std::sync::Arc;
use tracing::info;

/// Compose and encode one still
///
/// Pure function of its inputs. The output is exactly `target` sized.
pub fn compose(
    frame: &CameraFrame,
    overlay: Option<&RgbaImage>,
    mode: CaptureMode,
    target: Resolution,
) -> Result<CompositeResult, PhotoError> {
    let canvas = compositor::render(frame, overlay, target)?;
    encoding::encode_png(&canvas, mode)
}

/// Photo pipeline with per-mode target sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoPipeline {
    portrait: Resolution,
    landscape: Resolution,
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self {
            portrait: PORTRAIT_TARGET,
            landscape: LANDSCAPE_TARGET,
        }
    }
}

impl PhotoPipeline {
    pub fn new(portrait: Resolution, landscape: Resolution) -> Self {
        Self {
            portrait,
            landscape,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.portrait, config.landscape)
    }

    /// Output size for `mode`
    pub fn target(&self, mode: CaptureMode) -> Resolution {
        match mode {
            CaptureMode::Portrait => self.portrait,
            CaptureMode::Landscape => self.landscape,
        }
    }

    /// Compose synchronously
    pub fn compose(
        &self,
        frame: &CameraFrame,
        overlay: Option<&RgbaImage>,
        mode: CaptureMode,
    ) -> Result<CompositeResult, PhotoError> {
        compose(frame, overlay, mode, self.target(mode))
    }

    /// Compose on the blocking pool
    pub async fn compose_async(
        &self,
        frame: CameraFrame,
        overlay: Option<Arc<RgbaImage>>,
        mode: CaptureMode,
    ) -> Result<CompositeResult, PhotoError> {
        let pipeline = *self;
        let result = tokio::task::spawn_blocking(move || {
            pipeline.compose(&frame, overlay.as_deref(), mode)
        })
        .await
        .map_err(|e| PhotoError::EncodingFailed(format!("compose task failed: {}", e)))??;

        info!(
            mode = ?mode,
            width = result.width,
            height = result.height,
            bytes = result.len(),
            "Composite ready"
        );
        Ok(result)
    }
}
