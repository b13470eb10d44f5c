use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::plot::font::{self, ADVANCE, GLYPH_WIDTH};

/// An RGB raster with clipped drawing primitives. Coordinates are signed so
/// shapes may extend past the edges.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Canvas {
        Canvas { image: RgbImage::from_pixel(width, height, background) }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put(xx, yy, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    /// Bresenham line, widened to `thickness` pixels with a square pen.
    pub fn line(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64), thickness: u32, color: Rgb<u8>) {
        let (mut x, mut y) = (x0.round() as i64, y0.round() as i64);
        let (xe, ye) = (x1.round() as i64, y1.round() as i64);
        let dx = (xe - x).abs();
        let dy = -(ye - y).abs();
        let sx = if x < xe { 1 } else { -1 };
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness as i64 / 2;
        loop {
            self.fill_rect(x - half, y - half, thickness.max(1) as i64, thickness.max(1) as i64, color);
            if x == xe && y == ye {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled disc centred on `(cx, cy)`.
    pub fn point(&mut self, (cx, cy): (f64, f64), radius: u32, color: Rgb<u8>) {
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        let r = radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Draws `text` with its top-left corner at `(x, y)`.
    pub fn text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let ox = x + i as i64 * (ADVANCE as i64) * s;
            for (row, bits) in font::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.fill_rect(ox + col as i64 * s, y + row as i64 * s, s, s, color);
                    }
                }
            }
        }
    }

    /// Draws `text` rotated 90° counter-clockwise, reading bottom to top,
    /// with the bottom-left of the first glyph at `(x, y)`.
    pub fn text_vertical(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let oy = y - i as i64 * (ADVANCE as i64) * s;
            for (row, bits) in font::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        let px = x + row as i64 * s;
                        let py = oy - (col as i64 + 1) * s;
                        self.fill_rect(px, py, s, s, color);
                    }
                }
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Writes the canvas as a PNG, creating the parent directory if needed.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
