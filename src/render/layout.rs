//! Column layout for handwritten-looking notes.
//!
//! Items are lettered top to bottom with a little jitter in position, size
//! and ink colour. Some get a broken underline, some get an arrow pointing at
//! them. When the cursor runs off the bottom of the page the layout starts a
//! new column half a page to the right; once the last column is full the
//! remaining items are dropped.

use super::canvas::Canvas;
use super::font::Typeface;
use super::texture::pencil_texture;
use super::{Point, Surface};
use crate::error::ScribbleError;
use crate::output::NoteItem;
use image::{Rgb, RgbImage};
use rand::Rng;
use tracing::debug;

/// Gray used for the error page lettering.
pub const ERROR_INK: Rgb<u8> = Rgb([100, 100, 100]);

/// Letter size of the error page.
pub const ERROR_FONT_SIZE: f32 = 20.0;

/// Top-left corner of the error message.
pub const ERROR_ORIGIN: Point = (50.0, 50.0);

/// Tunable constants of the note layout.
///
/// Ranges are half-open (`min..max`) unless stated otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutStyle {
    /// Distance from every page edge, in pixels. Default: 50.
    pub margin: f32,
    /// Upper bound of the random offset added to the top of each column. Default: 30.
    pub top_jitter: u32,
    /// Upper bound of the random offset added to each item's left edge. Default: 40.
    pub left_jitter: u32,
    /// Smallest letter size. Default: 22.
    pub min_font_size: u32,
    /// Upper bound (exclusive) of the letter size. Default: 32.
    pub max_font_size: u32,
    /// Line advance as a multiple of the letter size. Default: 1.5.
    pub line_spacing: f32,
    /// Per-channel ink range for text, `ink_min..ink_max`. Default: 50..90.
    pub ink_min: u8,
    pub ink_max: u8,
    /// Colour of underlines and arrows. Default: (80, 80, 80).
    pub pencil_color: [u8; 3],
    /// Chance an item is underlined. Default: 0.30.
    pub underline_probability: f64,
    /// Chance an item gets an arrow. Default: 0.15.
    pub arrow_probability: f64,
    /// Columns before remaining items are clipped, 1 or 2. Each column
    /// starts half a canvas further right. Default: 2.
    pub max_columns: usize,
}

/// Columns advance by half the canvas width, so a third would start off-canvas.
const MAX_COLUMNS: usize = 2;

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            margin: 50.0,
            top_jitter: 30,
            left_jitter: 40,
            min_font_size: 22,
            max_font_size: 32,
            line_spacing: 1.5,
            ink_min: 50,
            ink_max: 90,
            pencil_color: [80, 80, 80],
            underline_probability: 0.30,
            arrow_probability: 0.15,
            max_columns: 2,
        }
    }
}

impl LayoutStyle {
    /// Check the constants are usable.
    pub fn validate(&self) -> Result<(), ScribbleError> {
        let fail = |msg: String| Err(ScribbleError::InvalidConfig(msg));
        if !(self.margin >= 0.0) {
            return fail(format!("layout margin must be ≥ 0, got {}", self.margin));
        }
        if self.min_font_size == 0 || self.min_font_size > self.max_font_size {
            return fail(format!(
                "font size range {}..{} is empty or starts at zero",
                self.min_font_size, self.max_font_size
            ));
        }
        if !(self.line_spacing > 0.0) {
            return fail(format!("line spacing must be > 0, got {}", self.line_spacing));
        }
        if self.ink_min > self.ink_max {
            return fail(format!("ink range {}..{} is reversed", self.ink_min, self.ink_max));
        }
        for (name, p) in [
            ("underline", self.underline_probability),
            ("arrow", self.arrow_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return fail(format!("{name} probability must be within 0–1, got {p}"));
            }
        }
        if self.max_columns == 0 {
            return fail("layout needs at least one column".into());
        }
        if self.max_columns > MAX_COLUMNS {
            return fail(format!(
                "layout supports at most {MAX_COLUMNS} columns, got {}",
                self.max_columns
            ));
        }
        Ok(())
    }

    fn pencil(&self) -> Rgb<u8> {
        Rgb(self.pencil_color)
    }
}

/// Uniform integer in `lo..hi`, or `lo` when the range is empty.
fn sample<R: Rng + ?Sized>(rng: &mut R, lo: i32, hi: i32) -> f32 {
    if hi <= lo {
        lo as f32
    } else {
        rng.gen_range(lo..hi) as f32
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, max: u32) -> f32 {
    sample(rng, 0, max as i32)
}

struct Cursor {
    x: f32,
    y: f32,
    column_margin: f32,
    column: usize,
}

impl Cursor {
    fn start<R: Rng + ?Sized>(style: &LayoutStyle, bottom: f32, rng: &mut R) -> Self {
        Self {
            x: style.margin,
            y: (style.margin + jitter(rng, style.top_jitter)).min(bottom),
            column_margin: style.margin,
            column: 0,
        }
    }

    fn next_column<R: Rng + ?Sized>(&mut self, style: &LayoutStyle, width: f32, bottom: f32, rng: &mut R) {
        self.column += 1;
        self.column_margin += width / 2.0;
        self.y = (style.margin + jitter(rng, style.top_jitter)).min(bottom);
    }

    fn place<R: Rng + ?Sized>(&mut self, style: &LayoutStyle, rng: &mut R) {
        self.x = self.column_margin + jitter(rng, style.left_jitter);
    }
}

/// Letter `notes` onto `surface`.
///
/// `handwriting` is the resolved handwriting face; `None` letters with the
/// built-in face. Blank items are skipped without moving the cursor. No
/// text is ever drawn with its top below `height - margin`.
pub fn render_notes<S, R>(
    surface: &mut S,
    notes: &[NoteItem],
    handwriting: Option<&Typeface>,
    style: &LayoutStyle,
    rng: &mut R,
) where
    S: Surface + ?Sized,
    R: Rng + ?Sized,
{
    let builtin = Typeface::Builtin;
    let face = handwriting.unwrap_or(&builtin);
    let (w, h) = surface.dimensions();
    let (width, height) = (w as f32, h as f32);
    let right = width - style.margin;
    let bottom = height - style.margin;

    let mut cursor = Cursor::start(style, bottom, rng);
    let mut drawn = 0usize;
    let mut clipped = 0usize;

    for item in notes {
        let text = item.content.as_str();
        if text.trim().is_empty() {
            continue;
        }
        if cursor.column >= style.max_columns {
            clipped += 1;
            continue;
        }

        cursor.place(style, rng);
        let size = sample(rng, style.min_font_size as i32, style.max_font_size as i32);
        let advance = size * style.line_spacing;
        let text_width = face.text_width(text, size);

        if cursor.x + text_width > right {
            cursor.y += advance;
            cursor.place(style, rng);
        }
        if cursor.y > bottom {
            cursor.next_column(style, width, bottom, rng);
            if cursor.column >= style.max_columns {
                clipped += 1;
                continue;
            }
            cursor.place(style, rng);
        }

        let ink = Rgb([
            sample(rng, style.ink_min as i32, style.ink_max as i32) as u8,
            sample(rng, style.ink_min as i32, style.ink_max as i32) as u8,
            sample(rng, style.ink_min as i32, style.ink_max as i32) as u8,
        ]);
        let (x, y) = (cursor.x, cursor.y);
        surface.draw_text((x, y), text, face, size, ink);
        drawn += 1;

        if rng.gen_bool(style.underline_probability.clamp(0.0, 1.0)) {
            draw_underline(surface, x, y, size, text_width, style, rng);
        }
        if rng.gen_bool(style.arrow_probability.clamp(0.0, 1.0)) {
            draw_arrow(surface, x, y, size, style, rng);
        }

        cursor.y += advance;
        if cursor.y > bottom {
            cursor.next_column(style, width, bottom, rng);
        }
    }

    if clipped > 0 {
        debug!(
            "Note layout full after {} columns: drew {}, dropped {}",
            style.max_columns, drawn, clipped
        );
    } else {
        debug!("Note layout drew {} items", drawn);
    }
}

/// Broken line under the text, one short segment at a time.
fn draw_underline<S, R>(
    surface: &mut S,
    x: f32,
    y: f32,
    size: f32,
    text_width: f32,
    style: &LayoutStyle,
    rng: &mut R,
) where
    S: Surface + ?Sized,
    R: Rng + ?Sized,
{
    let base = y + size + jitter(rng, 5);
    let end = x + text_width;
    let mut cx = x;
    while cx < end {
        let next = (cx + sample(rng, 5, 20)).min(end);
        let dy = rng.gen_range(-2..=2) as f32;
        surface.draw_line((cx, base + dy), (next, base + dy), style.pencil());
        cx = next;
    }
}

/// Arrow left of the text with its tip near the text's left edge.
fn draw_arrow<S, R>(surface: &mut S, x: f32, y: f32, size: f32, style: &LayoutStyle, rng: &mut R)
where
    S: Surface + ?Sized,
    R: Rng + ?Sized,
{
    let tip = (
        x - 20.0 + sample(rng, -10, 10),
        y + size / 2.0 + sample(rng, -10, 10),
    );
    let shaft = sample(rng, 15, 25);
    let pencil = style.pencil();
    surface.draw_line((tip.0 - shaft, tip.1), tip, pencil);
    surface.draw_line(tip, (tip.0 - 5.0, tip.1 - 5.0), pencil);
    surface.draw_line(tip, (tip.0 - 5.0, tip.1 + 5.0), pencil);
}

/// Letter the fixed error message onto `surface`, wrapped to its width.
pub fn render_error_message<S: Surface + ?Sized>(surface: &mut S, message: &str) {
    let face = Typeface::Builtin;
    let (w, _) = surface.dimensions();
    let max_width = (w as f32 - 2.0 * ERROR_ORIGIN.0).max(1.0);
    let text = format!("Error generating notes: {message}");
    let advance = face.line_height(ERROR_FONT_SIZE);

    for (i, line) in wrap_words(&face, &text, ERROR_FONT_SIZE, max_width)
        .iter()
        .enumerate()
    {
        let origin = (ERROR_ORIGIN.0, ERROR_ORIGIN.1 + i as f32 * advance);
        surface.draw_text(origin, line, &face, ERROR_FONT_SIZE, ERROR_INK);
    }
}

/// Greedy word wrap. A single word wider than `max_width` gets a line of its own.
fn wrap_words(face: &Typeface, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if face.text_width(&candidate, size) > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Textured page with `notes` lettered on it.
pub fn paint_notes_page<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    notes: &[NoteItem],
    handwriting: Option<&Typeface>,
    style: &LayoutStyle,
    rng: &mut R,
) -> RgbImage {
    let mut canvas = Canvas::new(pencil_texture(width, height, rng));
    render_notes(&mut canvas, notes, handwriting, style, rng);
    canvas.into_image()
}

/// Textured page carrying `Error generating notes: {message}`.
pub fn paint_error_page<R: Rng + ?Sized>(width: u32, height: u32, message: &str, rng: &mut R) -> RgbImage {
    let mut canvas = Canvas::new(pencil_texture(width, height, rng));
    render_error_message(&mut canvas, message);
    canvas.into_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Text { origin: Point, text: String, size: f32, color: Rgb<u8> },
        Line { from: Point, to: Point },
    }

    struct Recorder {
        size: (u32, u32),
        calls: Vec<Call>,
    }

    impl Recorder {
        fn new(w: u32, h: u32) -> Self {
            Self { size: (w, h), calls: Vec::new() }
        }

        fn texts(&self) -> Vec<(Point, &str, f32, Rgb<u8>)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Text { origin, text, size, color } => Some((*origin, text.as_str(), *size, *color)),
                    _ => None,
                })
                .collect()
        }

        fn lines(&self) -> Vec<(Point, Point)> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Line { from, to } => Some((*from, *to)),
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for Recorder {
        fn dimensions(&self) -> (u32, u32) {
            self.size
        }

        fn draw_text(&mut self, origin: Point, text: &str, _face: &Typeface, size: f32, color: Rgb<u8>) {
            self.calls.push(Call::Text { origin, text: text.to_string(), size, color });
        }

        fn draw_line(&mut self, from: Point, to: Point, _color: Rgb<u8>) {
            self.calls.push(Call::Line { from, to });
        }
    }

    fn items(lines: &[&str]) -> Vec<NoteItem> {
        lines.iter().map(|l| NoteItem::text(*l)).collect()
    }

    fn plain() -> LayoutStyle {
        LayoutStyle {
            underline_probability: 0.0,
            arrow_probability: 0.0,
            ..LayoutStyle::default()
        }
    }

    #[test]
    fn default_style_is_valid() {
        LayoutStyle::default().validate().unwrap();
    }

    #[test]
    fn invalid_probability_is_rejected() {
        let style = LayoutStyle { arrow_probability: 1.5, ..LayoutStyle::default() };
        assert!(matches!(style.validate(), Err(ScribbleError::InvalidConfig(_))));
    }

    #[test]
    fn reversed_font_range_is_rejected() {
        let style = LayoutStyle { min_font_size: 40, max_font_size: 20, ..LayoutStyle::default() };
        assert!(style.validate().is_err());
    }

    #[test]
    fn column_count_outside_one_to_two_is_rejected() {
        for max_columns in [0, 3, 10] {
            let style = LayoutStyle { max_columns, ..LayoutStyle::default() };
            assert!(matches!(style.validate(), Err(ScribbleError::InvalidConfig(_))), "{max_columns}");
        }
        let single = LayoutStyle { max_columns: 1, ..LayoutStyle::default() };
        single.validate().unwrap();
    }

    #[test]
    fn blank_items_are_skipped() {
        let mut s = Recorder::new(800, 1000);
        let notes = items(&["", "   ", "Key idea", "\t", "Second"]);
        render_notes(&mut s, &notes, None, &plain(), &mut StdRng::seed_from_u64(1));
        let texts: Vec<_> = s.texts().iter().map(|t| t.1.to_string()).collect();
        assert_eq!(texts, vec!["Key idea", "Second"]);
    }

    #[test]
    fn items_go_down_the_page_in_order() {
        let mut s = Recorder::new(800, 1000);
        let notes = items(&["one", "two", "three"]);
        render_notes(&mut s, &notes, None, &plain(), &mut StdRng::seed_from_u64(2));
        let t = s.texts();
        assert_eq!(t.len(), 3);
        assert!(t[0].0 .1 >= 50.0 && t[0].0 .1 < 80.0, "first y = {}", t[0].0 .1);
        for pair in t.windows(2) {
            let advance = pair[1].0 .1 - pair[0].0 .1;
            assert!((22.0 * 1.5..=31.0 * 1.5).contains(&advance), "advance {advance}");
        }
        for (origin, _, size, color) in &t {
            assert!((50.0..90.0).contains(&origin.0), "x = {}", origin.0);
            assert!((22.0..32.0).contains(size));
            assert!(color.0.iter().all(|c| (50..90).contains(c)), "{color:?}");
        }
    }

    #[test]
    fn text_origin_never_below_bottom_margin() {
        let style = LayoutStyle::default();
        for seed in 0..50 {
            let mut s = Recorder::new(600, 400);
            let notes: Vec<NoteItem> = (0..40).map(|i| NoteItem::text(format!("note {i}"))).collect();
            render_notes(&mut s, &notes, None, &style, &mut StdRng::seed_from_u64(seed));
            for (origin, text, _, _) in s.texts() {
                assert!(origin.1 <= 400.0 - 50.0, "seed {seed}: '{text}' at y = {}", origin.1);
            }
        }
    }

    #[test]
    fn overflow_moves_to_second_column_then_clips() {
        let mut s = Recorder::new(800, 300);
        let notes: Vec<NoteItem> = (0..60).map(|i| NoteItem::text(format!("n{i}"))).collect();
        render_notes(&mut s, &notes, None, &plain(), &mut StdRng::seed_from_u64(3));
        let t = s.texts();
        assert!(t.len() < 60, "expected clipping, drew {}", t.len());
        assert!(t.iter().any(|(o, ..)| o.0 < 400.0));
        assert!(t.iter().any(|(o, ..)| o.0 >= 450.0), "second column never used");
        assert!(t.iter().all(|(o, ..)| o.0 < 450.0 + 40.0));
    }

    #[test]
    fn long_item_wraps_to_new_line_unsplit() {
        let mut s = Recorder::new(400, 2000);
        // Builtin face at ≥22px is ≥16.5px per char: 30 chars always overflow 300px.
        let long = "x".repeat(30);
        let notes = items(&["short", &long]);
        render_notes(&mut s, &notes, None, &plain(), &mut StdRng::seed_from_u64(4));
        let t = s.texts();
        assert_eq!(t.len(), 2);
        assert_eq!(t[1].1, long);
        // Overflow forces one extra line advance before drawing.
        let gap = t[1].0 .1 - t[0].0 .1;
        assert!(gap >= 22.0 * 1.5 * 2.0 - 0.01, "gap {gap}");
    }

    #[test]
    fn underline_frequency_converges_to_thirty_percent() {
        let style = LayoutStyle { arrow_probability: 0.0, ..LayoutStyle::default() };
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 4000;
        let mut underlined = 0;
        for _ in 0..trials {
            let mut s = Recorder::new(800, 600);
            render_notes(&mut s, &items(&["Photosynthesis"]), None, &style, &mut rng);
            if !s.lines().is_empty() {
                underlined += 1;
            }
        }
        let rate = underlined as f64 / trials as f64;
        assert!((0.27..=0.33).contains(&rate), "underline rate {rate}");
    }

    #[test]
    fn underline_covers_text_width() {
        let style = LayoutStyle { underline_probability: 1.0, arrow_probability: 0.0, ..LayoutStyle::default() };
        let mut s = Recorder::new(800, 600);
        render_notes(&mut s, &items(&["Mitochondria"]), None, &style, &mut StdRng::seed_from_u64(5));
        let (origin, text, size, _) = s.texts()[0];
        let width = Typeface::Builtin.text_width(text, size);
        let lines = s.lines();
        assert!(!lines.is_empty());
        assert_eq!(lines[0].0 .0, origin.0);
        assert!((lines.last().unwrap().1 .0 - (origin.0 + width)).abs() < 1e-3);
        for pair in lines.windows(2) {
            assert_eq!(pair[0].1 .0, pair[1].0 .0, "segments must be contiguous");
        }
        for (from, to) in &lines {
            assert_eq!(from.1, to.1, "segments are horizontal");
            assert!(to.0 - from.0 <= 19.0 + 1e-3);
            let below = from.1 - (origin.1 + size);
            assert!((-2.0..=6.0).contains(&below), "underline offset {below}");
        }
    }

    #[test]
    fn arrow_points_at_text_left_edge() {
        let style = LayoutStyle { underline_probability: 0.0, arrow_probability: 1.0, ..LayoutStyle::default() };
        for seed in 0..20 {
            let mut s = Recorder::new(800, 600);
            render_notes(&mut s, &items(&["Osmosis"]), None, &style, &mut StdRng::seed_from_u64(seed));
            let (origin, _, size, _) = s.texts()[0];
            let lines = s.lines();
            assert_eq!(lines.len(), 3, "shaft + two head strokes");
            let tip = lines[0].1;
            assert_eq!(lines[1].0, tip);
            assert_eq!(lines[2].0, tip);
            let shaft = tip.0 - lines[0].0 .0;
            assert!((15.0..25.0).contains(&shaft), "shaft {shaft}");
            assert!((origin.0 - 30.0..origin.0 - 10.0).contains(&tip.0));
            let mid = origin.1 + size / 2.0;
            assert!((mid - 10.0..mid + 10.0).contains(&tip.1));
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let notes = items(&["a", "b", "c", "d"]);
        let mut a = Recorder::new(800, 600);
        let mut b = Recorder::new(800, 600);
        render_notes(&mut a, &notes, None, &LayoutStyle::default(), &mut StdRng::seed_from_u64(9));
        render_notes(&mut b, &notes, None, &LayoutStyle::default(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a.calls, b.calls);
    }

    #[test]
    fn error_message_is_wrapped_in_gray() {
        let mut s = Recorder::new(400, 600);
        render_error_message(&mut s, "API error (403): API key not valid. Please pass a valid API key.");
        let t = s.texts();
        assert!(t.len() > 1, "long message should wrap");
        assert_eq!(t[0].0, ERROR_ORIGIN);
        assert!(t[0].1.starts_with("Error generating notes:"));
        let joined: Vec<&str> = t.iter().map(|x| x.1).collect();
        assert!(joined.join(" ").contains("API key not valid"));
        for (origin, line, size, color) in t {
            assert_eq!(color, ERROR_INK);
            assert_eq!(origin.0, 50.0);
            if line.contains(' ') {
                assert!(Typeface::Builtin.text_width(line, size) <= 300.0);
            }
        }
    }

    #[test]
    fn painted_pages_have_requested_size() {
        let mut rng = StdRng::seed_from_u64(11);
        let notes = items(&["Key idea: hello", "Key idea: world"]);
        let page = paint_notes_page(320, 240, &notes, None, &LayoutStyle::default(), &mut rng);
        assert_eq!(page.dimensions(), (320, 240));
        let err = paint_error_page(320, 240, "boom", &mut rng);
        assert_eq!(err.dimensions(), (320, 240));
        assert!(err.pixels().any(|p| p.0 == [100, 100, 100]));
    }
}
