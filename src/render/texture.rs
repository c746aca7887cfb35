//! Pencil-texture background: white paper with light gray grain.

use image::{Rgb, RgbImage};
use rand::Rng;
use std::ops::RangeInclusive;

/// Gray levels used for the paper grain dots.
pub const GRAIN_LEVELS: RangeInclusive<u8> = 240..=251;

/// One grain dot per hundred pixels.
pub const GRAIN_DENSITY: usize = 100;

/// Number of grain dots scattered on a `width` × `height` page.
pub fn grain_dot_count(width: u32, height: u32) -> usize {
    width as usize * height as usize / GRAIN_DENSITY
}

/// Create a white page of the given size sprinkled with grain dots.
///
/// Dots land on uniformly random coordinates, so two dots may share a
/// pixel; callers should expect at most [`grain_dot_count`] painted pixels.
pub fn pencil_texture<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> RgbImage {
    let mut page = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    if width == 0 || height == 0 {
        return page;
    }
    for _ in 0..grain_dot_count(width, height) {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let gray = rng.gen_range(GRAIN_LEVELS);
        page.put_pixel(x, y, Rgb([gray, gray, gray]));
    }
    page
}
