//! Raster canvas: the production [`Surface`].

use super::font::{blend, Typeface};
use super::{Point, Surface};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// An RGB raster being painted with pencil strokes.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// Wrap an existing raster (usually the textured background).
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Encode the canvas as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.image)
    }
}

impl Surface for Canvas {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn draw_text(&mut self, origin: Point, text: &str, face: &Typeface, size: f32, color: Rgb<u8>) {
        face.draw(&mut self.image, origin, text, size, color);
    }

    /// One-pixel Bresenham line; endpoints are rounded to the pixel grid.
    fn draw_line(&mut self, from: Point, to: Point, color: Rgb<u8>) {
        let (mut x0, mut y0) = (from.0.round() as i32, from.1.round() as i32);
        let (x1, y1) = (to.0.round() as i32, to.1.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            blend(&mut self.image, x0, y0, color, 1.0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

/// Encode any RGB raster as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
