// SPDX-License-Identifier: GPL-3.0-only

//! Frame compositor
//!
//! Turns one camera frame into a still at an exact target size:
//!
//! ```text
//! frame ─▶ center crop to target aspect ─▶ scale ─▶ mirror ─▶ overlay
//! ```
//!
//! The crop fills the canvas on both axes, so there is never letterboxing
//! and never distortion. The overlay is drawn last and is not mirrored.

use crate::backends::camera::types::CameraFrame;
use crate::constants::Resolution;
use crate::errors::PhotoError;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Region of the source frame kept by the crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropPlan {
    /// Pixels discarded on the left and right
    pub fn horizontal_margins(&self, source: Resolution) -> (u32, u32) {
        (self.x, source.width - self.x - self.width)
    }

    /// Pixels discarded on the top and bottom
    pub fn vertical_margins(&self, source: Resolution) -> (u32, u32) {
        (self.y, source.height - self.y - self.height)
    }
}

/// Center crop of `source` with the aspect ratio of `target`
///
/// A source wider than the target keeps its full height and loses equal
/// strips left and right; otherwise it keeps its full width and loses equal
/// strips top and bottom. The kept span is nudged by at most one pixel so
/// both margins are identical.
pub fn crop_plan(source: Resolution, target: Resolution) -> CropPlan {
    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width.max(1) as u64, target.height.max(1) as u64);

    // sw/sh > tw/th without floating point
    if sw * th > tw * sh {
        let width = symmetric_span(sw, (sh * tw + th / 2) / th);
        CropPlan {
            x: ((sw - width) / 2) as u32,
            y: 0,
            width: width as u32,
            height: source.height,
        }
    } else {
        let height = symmetric_span(sh, (sw * th + tw / 2) / tw);
        CropPlan {
            x: 0,
            y: ((sh - height) / 2) as u32,
            width: source.width,
            height: height as u32,
        }
    }
}

/// Clamp `span` into `1..=full` with the same parity as `full`
fn symmetric_span(full: u64, span: u64) -> u64 {
    if full == 0 {
        return 0;
    }
    let span = span.clamp(1, full);
    if (full - span) % 2 == 1 { span + 1 } else { span }
}

/// Render the composite as raw pixels
///
/// Pure: the same frame, overlay and target always give the same image.
pub fn render(
    frame: &CameraFrame,
    overlay: Option<&RgbaImage>,
    target: Resolution,
) -> Result<RgbaImage, PhotoError> {
    if target.width == 0 || target.height == 0 {
        return Err(PhotoError::UnsupportedFrame(format!(
            "target size {} is empty",
            target
        )));
    }

    let source = frame.to_rgba()?;
    let plan = crop_plan(frame.resolution(), target);
    debug!(
        source = %frame.resolution(),
        target = %target,
        crop_x = plan.x,
        crop_y = plan.y,
        crop_width = plan.width,
        crop_height = plan.height,
        "Compositing frame"
    );

    let cropped = imageops::crop_imm(&source, plan.x, plan.y, plan.width, plan.height).to_image();
    let mut canvas = if cropped.dimensions() == (target.width, target.height) {
        cropped
    } else {
        imageops::resize(&cropped, target.width, target.height, FilterType::Triangle)
    };

    // Selfie convention: the preview and the still read like a mirror
    imageops::flip_horizontal_in_place(&mut canvas);

    if let Some(overlay) = overlay {
        if overlay.dimensions() == (target.width, target.height) {
            imageops::overlay(&mut canvas, overlay, 0, 0);
        } else {
            let stretched =
                imageops::resize(overlay, target.width, target.height, FilterType::Triangle);
            imageops::overlay(&mut canvas, &stretched, 0, 0);
        }
    }

    Ok(canvas)
}
