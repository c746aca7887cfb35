//! Typefaces used to letter the note pages.
//!
//! The host resolves `ScribbleConfig::font_path` once at startup with
//! [`Typeface::resolve`]. Without a usable font file the notes are lettered
//! with DejaVu Sans Oblique, compiled into the binary (see
//! `assets/fonts/LICENSE-DejaVu.txt`), so accented letters, arrows and dashes
//! render without any file on disk. [`Typeface::Builtin`] is a 5×7 ASCII
//! bitmap face used for the error page.

use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use std::path::Path;
use tracing::{debug, warn};

/// A face the renderer can measure and draw with.
pub enum Typeface {
    /// A scalable TrueType/OpenType font.
    TrueType(Font<'static>),
    /// The embedded 5×7 bitmap font.
    Builtin,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Typeface::TrueType(_) => f.write_str("Typeface::TrueType"),
            Typeface::Builtin => f.write_str("Typeface::Builtin"),
        }
    }
}

/// DejaVu Sans Oblique, the default note face.
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Oblique.ttf");

impl Typeface {
    /// The compiled-in TrueType face.
    pub fn bundled() -> Option<Self> {
        Font::try_from_bytes(BUNDLED_FONT).map(Typeface::TrueType)
    }

    /// Load a font file.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Font::try_from_vec(bytes)
            .map(Typeface::TrueType)
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("'{}' is not a TrueType/OpenType font", path.display()),
                )
            })
    }

    /// Resolve the configured handwriting font, falling back to
    /// [`Typeface::bundled`] when no path is set or the file cannot be used.
    pub fn resolve(path: Option<&Path>) -> Option<Self> {
        if let Some(path) = path {
            match Self::from_file(path) {
                Ok(face) => {
                    debug!("Loaded handwriting font: {}", path.display());
                    return Some(face);
                }
                Err(e) => warn!(
                    "Handwriting font '{}' unavailable ({}); using bundled face",
                    path.display(),
                    e
                ),
            }
        }
        Self::bundled()
    }

    /// Rendered width of `text` at `size` pixels.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        match self {
            Typeface::TrueType(font) => font
                .layout(text, Scale::uniform(size), point(0.0, 0.0))
                .last()
                .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0),
            Typeface::Builtin => {
                let cell = builtin_cell(size);
                text.chars().count() as f32 * cell * BUILTIN_ADVANCE as f32
            }
        }
    }

    /// Line height at `size` pixels.
    pub fn line_height(&self, size: f32) -> f32 {
        match self {
            Typeface::TrueType(font) => {
                let v = font.v_metrics(Scale::uniform(size));
                v.ascent - v.descent + v.line_gap
            }
            Typeface::Builtin => builtin_cell(size) * BUILTIN_ROWS as f32,
        }
    }

    /// Draw `text` with its top-left corner at `origin`.
    pub fn draw(&self, image: &mut RgbImage, origin: (f32, f32), text: &str, size: f32, color: Rgb<u8>) {
        match self {
            Typeface::TrueType(font) => {
                let scale = Scale::uniform(size);
                let ascent = font.v_metrics(scale).ascent;
                for glyph in font.layout(text, scale, point(origin.0, origin.1 + ascent)) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, coverage| {
                            blend(image, bb.min.x + gx as i32, bb.min.y + gy as i32, color, coverage);
                        });
                    }
                }
            }
            Typeface::Builtin => draw_builtin(image, origin, text, size, color),
        }
    }
}

/// Alpha-blend `color` onto the pixel at (x, y); out-of-bounds writes are dropped.
pub(crate) fn blend(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= image.width() || y as u32 >= image.height() {
        return;
    }
    let a = coverage.clamp(0.0, 1.0);
    let px = image.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let mixed = f32::from(px.0[c]) * (1.0 - a) + f32::from(color.0[c]) * a;
        px.0[c] = mixed.round() as u8;
    }
}

// ── Built-in bitmap face ─────────────────────────────────────────────────────

/// Columns advanced per character (5 glyph columns + 1 spacing).
const BUILTIN_ADVANCE: u32 = 6;
/// Rows per character cell (7 glyph rows + 1 spacing).
const BUILTIN_ROWS: u32 = 8;

fn builtin_cell(size: f32) -> f32 {
    (size / BUILTIN_ROWS as f32).max(1.0)
}

fn draw_builtin(image: &mut RgbImage, origin: (f32, f32), text: &str, size: f32, color: Rgb<u8>) {
    let cell = builtin_cell(size);
    for (i, ch) in text.chars().enumerate() {
        let columns = glyph_columns(ch);
        let x0 = origin.0 + i as f32 * cell * BUILTIN_ADVANCE as f32;
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..7 {
                if (*bits >> row) & 1 == 0 {
                    continue;
                }
                let left = (x0 + col as f32 * cell).round() as i32;
                let top = (origin.1 + row as f32 * cell).round() as i32;
                let right = (x0 + (col + 1) as f32 * cell).round() as i32;
                let bottom = (origin.1 + (row + 1) as f32 * cell).round() as i32;
                for y in top..bottom.max(top + 1) {
                    for x in left..right.max(left + 1) {
                        blend(image, x, y, color, 1.0);
                    }
                }
            }
        }
    }
}

/// Column bitmaps for `ch`; bit 0 is the top row. Non-ASCII falls back to '?'.
fn glyph_columns(ch: char) -> [u8; 5] {
    let code = ch as u32;
    if (0x20..0x7F).contains(&code) {
        GLYPHS[(code - 0x20) as usize]
    } else {
        GLYPHS[('?' as u32 - 0x20) as usize]
    }
}

#[rustfmt::skip]
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];
