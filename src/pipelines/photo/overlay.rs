// SPDX-License-Identifier: GPL-3.0-only

//! Frame overlays
//!
//! One overlay per capture mode. An overlay is decoded once, never changes
//! afterwards, and is replaced wholesale when a new file is loaded. A file
//! that fails to decode is remembered as unreadable and simply not drawn.

use crate::constants::CaptureMode;
use crate::errors::PhotoError;
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A loaded overlay, or the reason it could not be used
#[derive(Debug, Clone)]
pub enum Overlay {
    Ready(Arc<RgbaImage>),
    Unreadable(String),
}

impl Overlay {
    /// The image to draw, if any
    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            Overlay::Ready(image) => Some(image.as_ref()),
            Overlay::Unreadable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Overlay::Ready(_))
    }
}

impl From<Result<RgbaImage, PhotoError>> for Overlay {
    fn from(result: Result<RgbaImage, PhotoError>) -> Self {
        match result {
            Ok(image) => Overlay::Ready(Arc::new(image)),
            Err(e) => Overlay::Unreadable(e.to_string()),
        }
    }
}

/// Decode an image off the async executor
pub async fn decode(bytes: Vec<u8>) -> Result<RgbaImage, PhotoError> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|image| image.into_rgba8())
            .map_err(|e| PhotoError::UnsupportedFrame(format!("overlay: {}", e)))
    })
    .await
    .map_err(|e| PhotoError::UnsupportedFrame(format!("overlay decode task failed: {}", e)))?
}

/// Read and decode an overlay file
///
/// Never fails: unreadable files become [`Overlay::Unreadable`].
pub async fn load_file(path: &Path) -> Overlay {
    let overlay = match tokio::fs::read(path).await {
        Ok(bytes) => Overlay::from(decode(bytes).await),
        Err(e) => Overlay::Unreadable(format!("{}: {}", path.display(), e)),
    };

    match &overlay {
        Overlay::Ready(image) => info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Overlay loaded"
        ),
        Overlay::Unreadable(reason) => {
            warn!(path = %path.display(), reason = %reason, "Overlay unusable, capturing without it")
        }
    }
    overlay
}

/// The overlay for each capture mode
#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    portrait: Option<Overlay>,
    landscape: Option<Overlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, mode: CaptureMode) -> &mut Option<Overlay> {
        match mode {
            CaptureMode::Portrait => &mut self.portrait,
            CaptureMode::Landscape => &mut self.landscape,
        }
    }

    /// Replace the overlay for `mode`
    pub fn set(&mut self, mode: CaptureMode, overlay: Overlay) {
        *self.slot(mode) = Some(overlay);
    }

    pub fn clear(&mut self, mode: CaptureMode) {
        *self.slot(mode) = None;
    }

    /// The overlay entry for `mode`, readable or not
    pub fn get(&self, mode: CaptureMode) -> Option<&Overlay> {
        match mode {
            CaptureMode::Portrait => self.portrait.as_ref(),
            CaptureMode::Landscape => self.landscape.as_ref(),
        }
    }

    /// The drawable image for `mode`, shared
    pub fn image(&self, mode: CaptureMode) -> Option<Arc<RgbaImage>> {
        match self.get(mode)? {
            Overlay::Ready(image) => Some(Arc::clone(image)),
            Overlay::Unreadable(_) => None,
        }
    }
}
