// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use super::format_converters;
use crate::constants::Resolution;
use crate::errors::{CameraError, PhotoError};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, CameraError>;

/// Represents a camera device
///
/// `id` is stable for the lifetime of the device (a device node path for
/// V4L2, a fixed name for virtual devices); `label` is for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
    /// V4L2 device information (card, driver, bus), when known
    pub device_info: Option<DeviceInfo>,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            device_info: None,
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Bus the device hangs off (e.g. usb-0000:00:14.0-1)
    pub bus: String,
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
    /// Motion JPEG - each buffer is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// FourCC code as reported by V4L2
    pub fn fourcc(&self) -> &'static str {
        match self {
            Self::RGBA => "AB24",
            Self::RGB24 => "RGB3",
            Self::YUYV => "YUYV",
            Self::MJPEG => "MJPG",
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(code: &str) -> Option<Self> {
        match code {
            "AB24" | "RGBA" => Some(Self::RGBA),
            "RGB3" => Some(Self::RGB24),
            "YUYV" | "YUY2" => Some(Self::YUYV),
            "MJPG" | "JPEG" => Some(Self::MJPEG),
            _ => None,
        }
    }

    /// Bytes per pixel for packed formats, `None` for compressed ones
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::RGBA => Some(4),
            Self::RGB24 => Some(3),
            Self::YUYV => Some(2),
            Self::MJPEG => None,
        }
    }
}

/// Negotiated stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl CameraFormat {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Refuse formats whose frames could never be converted
    ///
    /// Checked once when a stream is negotiated so that frames never fail
    /// for a reason that is known up front.
    pub fn check_convertible(&self) -> BackendResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::StreamFailed(format!("{} has no pixels", self)));
        }
        // YUYV shares chroma between pixel pairs
        if self.pixel_format == PixelFormat::YUYV && self.width % 2 == 1 {
            return Err(CameraError::StreamFailed(format!(
                "{} has an odd width",
                self
            )));
        }
        Ok(())
    }

    /// Row stride of frames in this format
    ///
    /// `bytes_per_line` is what the driver reports and may include padding;
    /// anything shorter than a packed row is ignored.
    pub fn row_stride(&self, bytes_per_line: u32) -> u32 {
        match self.pixel_format.bytes_per_pixel() {
            Some(bpp) => bytes_per_line.max(bpp * self.width),
            None => 0,
        }
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} {}",
            self.width,
            self.height,
            self.pixel_format.fourcc()
        )
    }
}

/// A single frame from the camera
///
/// Frames are cheap to clone: the pixel buffer is shared.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes for packed formats
    pub stride: u32,
    /// When the frame left the device
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap an RGBA image as a frame
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Decode or convert the frame to RGBA pixels
    pub fn to_rgba(&self) -> Result<RgbaImage, PhotoError> {
        if self.width == 0 || self.height == 0 {
            return Err(PhotoError::UnsupportedFrame("empty frame".into()));
        }

        let rgba = match self.format {
            PixelFormat::MJPEG => {
                let decoded =
                    image::load_from_memory_with_format(&self.data, image::ImageFormat::Jpeg)
                        .map_err(|e| PhotoError::UnsupportedFrame(e.to_string()))?;
                if (decoded.width(), decoded.height()) != (self.width, self.height) {
                    return Err(PhotoError::UnsupportedFrame(format!(
                        "JPEG is {}x{}, stream declared {}x{}",
                        decoded.width(),
                        decoded.height(),
                        self.width,
                        self.height
                    )));
                }
                return Ok(decoded.into_rgba8());
            }
            PixelFormat::RGBA => self.packed_rows(4)?,
            PixelFormat::RGB24 => format_converters::rgb24_to_rgba(&self.packed_rows(3)?),
            PixelFormat::YUYV => {
                format_converters::yuyv_to_rgba(&self.packed_rows(2)?, self.width, self.height)
            }
        };

        RgbaImage::from_raw(self.width, self.height, rgba).ok_or_else(|| {
            PhotoError::UnsupportedFrame(format!(
                "{}x{} buffer too short",
                self.width, self.height
            ))
        })
    }

    /// Copy the visible part of each row, dropping stride padding
    fn packed_rows(&self, bytes_per_pixel: u32) -> Result<Vec<u8>, PhotoError> {
        let row_len = (self.width * bytes_per_pixel) as usize;
        let stride = (self.stride as usize).max(row_len);
        let needed = stride * (self.height as usize - 1) + row_len;
        if self.data.len() < needed {
            return Err(PhotoError::UnsupportedFrame(format!(
                "{} bytes for a {}x{} {:?} frame",
                self.data.len(),
                self.width,
                self.height,
                self.format
            )));
        }

        if stride == row_len {
            return Ok(self.data[..row_len * self.height as usize].to_vec());
        }

        let mut packed = Vec::with_capacity(row_len * self.height as usize);
        for row in self.data.chunks(stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_len]);
        }
        Ok(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_rgba_rows_are_packed() {
        // 2x2 RGBA with 4 bytes of padding per row
        let mut data = Vec::new();
        data.extend_from_slice(&[1, 1, 1, 255, 2, 2, 2, 255, 0, 0, 0, 0]);
        data.extend_from_slice(&[3, 3, 3, 255, 4, 4, 4, 255, 0, 0, 0, 0]);
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data),
            format: PixelFormat::RGBA,
            stride: 12,
            captured_at: Instant::now(),
        };

        let image = frame.to_rgba().unwrap();
        assert_eq!(image.get_pixel(1, 0).0, [2, 2, 2, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [3, 3, 3, 255]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = CameraFrame {
            width: 4,
            height: 4,
            data: Arc::from(vec![0u8; 10]),
            format: PixelFormat::YUYV,
            stride: 8,
            captured_at: Instant::now(),
        };
        assert!(matches!(
            frame.to_rgba(),
            Err(PhotoError::UnsupportedFrame(_))
        ));
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
        bytes.into_inner()
    }

    fn mjpeg_frame(data: Vec<u8>, width: u32, height: u32) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::MJPEG,
            stride: 0,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_mjpeg_matching_size_decodes() {
        let frame = mjpeg_frame(jpeg(8, 6), 8, 6);
        assert_eq!(frame.to_rgba().unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn test_mjpeg_size_mismatch_is_rejected() {
        let frame = mjpeg_frame(jpeg(8, 6), 16, 12);
        assert!(matches!(
            frame.to_rgba(),
            Err(PhotoError::UnsupportedFrame(_))
        ));
    }

    #[test]
    fn test_odd_width_yuyv_frame_converts() {
        // 3x1: Y0 U Y1 V then a trailing Y2 U for the last column
        let frame = CameraFrame {
            width: 3,
            height: 1,
            data: Arc::from(vec![50, 128, 100, 128, 150, 128]),
            format: PixelFormat::YUYV,
            stride: 6,
            captured_at: Instant::now(),
        };
        let image = frame.to_rgba().unwrap();
        assert_eq!(image.get_pixel(2, 0).0, [150, 150, 150, 255]);
    }

    #[test]
    fn test_odd_width_yuyv_is_refused_at_negotiation() {
        let odd = CameraFormat {
            width: 641,
            height: 480,
            pixel_format: PixelFormat::YUYV,
        };
        assert!(matches!(
            odd.check_convertible(),
            Err(CameraError::StreamFailed(_))
        ));

        let even = CameraFormat { width: 640, ..odd };
        assert!(even.check_convertible().is_ok());
        let mjpeg = CameraFormat {
            pixel_format: PixelFormat::MJPEG,
            ..odd
        };
        assert!(mjpeg.check_convertible().is_ok());
    }

    #[test]
    fn test_row_stride_keeps_driver_padding() {
        let format = CameraFormat {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::YUYV,
        };
        assert_eq!(format.row_stride(1344), 1344);
        assert_eq!(format.row_stride(0), 1280);
        let mjpeg = CameraFormat {
            pixel_format: PixelFormat::MJPEG,
            ..format
        };
        assert_eq!(mjpeg.row_stride(1344), 0);
    }

    #[test]
    fn test_padded_yuyv_rows_stay_aligned() {
        // 2x2 YUYV, each 4 byte row padded to 8
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(vec![
                10, 128, 20, 128, 0, 0, 0, 0, //
                30, 128, 40, 128, 0, 0, 0, 0,
            ]),
            format: PixelFormat::YUYV,
            stride: 8,
            captured_at: Instant::now(),
        };
        let image = frame.to_rgba().unwrap();
        assert_eq!(image.get_pixel(0, 1).0, [30, 30, 30, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [40, 40, 40, 255]);
    }

    #[test]
    fn test_fourcc_round_trip() {
        for format in [PixelFormat::RGBA, PixelFormat::RGB24, PixelFormat::YUYV, PixelFormat::MJPEG] {
            assert_eq!(PixelFormat::from_fourcc(format.fourcc()), Some(format));
        }
    }
}
