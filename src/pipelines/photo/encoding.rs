// SPDX-License-Identifier: GPL-3.0-only

//! PNG encoding of composites
//!
//! The composite is encoded once and then shared: the same bytes are shown
//! on the result screen, saved to disk and uploaded.

use crate::constants::CaptureMode;
use crate::errors::PhotoError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::sync::Arc;
use tracing::debug;

/// An encoded still at a mode's exact target size
#[derive(Clone, PartialEq, Eq)]
pub struct CompositeResult {
    /// PNG file bytes
    pub png: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub mode: CaptureMode,
}

impl CompositeResult {
    /// `data:image/png;base64,...` for embedding in a page
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Decode back to pixels, e.g. for a preview
    pub fn decode(&self) -> Result<RgbaImage, PhotoError> {
        image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)
            .map(|image| image.into_rgba8())
            .map_err(|e| PhotoError::EncodingFailed(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}

impl std::fmt::Debug for CompositeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CompositeResult({}x{} {:?}, {} bytes)",
            self.width,
            self.height,
            self.mode,
            self.png.len()
        )
    }
}

/// Encode pixels as PNG
pub fn encode_png(image: &RgbaImage, mode: CaptureMode) -> Result<CompositeResult, PhotoError> {
    let (width, height) = image.dimensions();
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| PhotoError::EncodingFailed(e.to_string()))?;

    debug!(width, height, bytes = png.len(), "Encoded PNG");
    Ok(CompositeResult {
        png: Arc::from(png),
        width,
        height,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_prefix() {
        let result = encode_png(&RgbaImage::new(2, 2), CaptureMode::Portrait).unwrap();
        assert!(result.to_data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_encoded_size_matches() {
        let result = encode_png(&RgbaImage::new(5, 3), CaptureMode::Landscape).unwrap();
        let decoded = result.decode().unwrap();
        assert_eq!(decoded.dimensions(), (5, 3));
    }
}
