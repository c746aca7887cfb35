//! Pencil-style note rendering.
//!
//! ```text
//! texture ──▶ layout ──▶ canvas ──▶ PNG
//! (grain)     (cursor)   (raster)
//! ```
//!
//! The layout routine only talks to a [`Surface`], so tests can record the
//! draw calls instead of inspecting pixels.

pub mod canvas;
pub mod font;
pub mod layout;
pub mod texture;

pub use canvas::{encode_png, Canvas};
pub use font::Typeface;
pub use layout::{paint_error_page, paint_notes_page, render_error_message, render_notes, LayoutStyle};
pub use texture::{grain_dot_count, pencil_texture};

use image::Rgb;

/// A point in canvas pixel coordinates (origin top-left).
pub type Point = (f32, f32);

/// The drawing primitives the layout routine needs.
pub trait Surface {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Draw `text` with its top-left corner at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, face: &Typeface, size: f32, color: Rgb<u8>);

    /// Draw a one-pixel line.
    fn draw_line(&mut self, from: Point, to: Point, color: Rgb<u8>);
}
