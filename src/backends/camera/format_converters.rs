// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion to RGBA
//!
//! Camera sources deliver packed YUV or RGB; the compositor works on RGBA.

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// `data` holds packed rows of `width * 2` bytes. With an odd width the
/// last column is a lone `Y U` pair and is converted with neutral V.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let row_len = width as usize * 2;
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    if row_len == 0 {
        return rgba;
    }

    for row in data.chunks_exact(row_len).take(height as usize) {
        for group in row.chunks(4) {
            match *group {
                [y0, u, y1, v] => {
                    let (u, v) = (u as f32 - 128.0, v as f32 - 128.0);
                    rgba.extend_from_slice(&yuv_to_rgba(y0 as f32, u, v));
                    rgba.extend_from_slice(&yuv_to_rgba(y1 as f32, u, v));
                }
                [y, u] => rgba.extend_from_slice(&yuv_to_rgba(y as f32, u as f32 - 128.0, 0.0)),
                _ => {}
            }
        }
    }

    rgba
}

/// Convert packed RGB24 to RGBA with an opaque alpha channel
pub fn rgb24_to_rgba(data: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
    for px in data.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

#[inline]
fn yuv_to_rgba(y: f32, u: f32, v: f32) -> [u8; 4] {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b, 255]
}
