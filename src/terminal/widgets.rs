// SPDX-License-Identifier: GPL-3.0-only

//! Terminal widgets
//!
//! Images are drawn with Unicode half-block characters for double the
//! vertical resolution.

use image::RgbaImage;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

/// Widget that renders an image using half-block characters
pub struct ImageWidget<'a> {
    image: Option<&'a RgbaImage>,
    mirror: bool,
    placeholder: &'a str,
}

impl<'a> ImageWidget<'a> {
    pub fn new(image: Option<&'a RgbaImage>) -> Self {
        Self {
            image,
            mirror: false,
            placeholder: "Waiting for camera...",
        }
    }

    /// Flip horizontally, as for a live selfie preview
    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Text shown when there is no image
    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }
}

impl Widget for ImageWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self.image.filter(|i| i.width() > 0 && i.height() > 0) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.chars().count() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_stringn(x, y, msg, area.width as usize, ratatui::style::Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let image_aspect = image.width() as f64 / image.height() as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > image_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * image_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / image_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        let display_width = display_width.max(1);
        let display_height = display_height.max(1);

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = image.width() as f64 / display_width as f64;
        let y_scale = image.height() as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;
                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let mut src_x = ((tx as f64 * x_scale) as u32).min(image.width() - 1);
                if self.mirror {
                    src_x = image.width() - 1 - src_x;
                }
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample(image, src_x, src_y_top));
                    cell.set_bg(sample(image, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample(image: &RgbaImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let [r, g, b, _] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Status bar widget
pub struct StatusBar<'a> {
    pub message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mirrored_preview_swaps_columns() {
        let mut image = RgbaImage::new(2, 2);
        for y in 0..2 {
            image.put_pixel(0, y, Rgba([255, 0, 0, 255]));
            image.put_pixel(1, y, Rgba([0, 0, 255, 255]));
        }
        let area = Rect::new(0, 0, 2, 1);

        let mut plain = Buffer::empty(area);
        ImageWidget::new(Some(&image)).render(area, &mut plain);
        assert_eq!(plain[(0, 0)].fg, Color::Rgb(255, 0, 0));

        let mut mirrored = Buffer::empty(area);
        ImageWidget::new(Some(&image)).mirrored(true).render(area, &mut mirrored);
        assert_eq!(mirrored[(0, 0)].fg, Color::Rgb(0, 0, 255));
        assert_eq!(mirrored[(1, 0)].bg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_placeholder_without_image() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        ImageWidget::new(None).placeholder("No camera").render(area, &mut buf);
        let row: String = (0..20).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(row.contains("No camera"));
    }
}
