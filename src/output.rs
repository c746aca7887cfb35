//! Data types flowing through and out of the pipeline.

use crate::config::ScribbleConfig;
use crate::error::{PageError, ScribbleError};
use crate::pipeline::assemble;
use crate::store;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Extraction ───────────────────────────────────────────────────────────

/// Text, optional bitmap and pixel size of one source page.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw text layer of the page (may be empty for scanned pages).
    pub text: String,
    /// PNG bytes of the rasterised page, when rasterisation is enabled.
    pub image: Option<Vec<u8>>,
    /// Pixel width of the note canvas for this page.
    pub width: u32,
    /// Pixel height of the note canvas for this page.
    pub height: u32,
}

impl PageContent {
    /// 0-based index, as used in file names and URLs.
    pub fn index(&self) -> usize {
        self.page_num.saturating_sub(1)
    }
}

/// Page count and per-page sizes, for `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub pages: Vec<PageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_num: usize,
    pub width_points: f32,
    pub height_points: f32,
    pub text_chars: usize,
}

// ── Notes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStyle {
    Normal,
}

/// One line of annotation destined for the note page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteItem {
    pub content: String,
    pub style: NoteStyle,
    /// Fixed placement; `None` lets the layout choose.
    pub position: Option<(f32, f32)>,
    pub kind: NoteKind,
}

impl NoteItem {
    /// A plain text item with no fixed position.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: NoteStyle::Normal,
            position: None,
            kind: NoteKind::Text,
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// The note page produced for one source page.
///
/// `image` is always set: when `error` is `Some`, it is the error page.
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub notes: Vec<NoteItem>,
    pub image: RgbImage,
    pub error: Option<PageError>,
    /// Wall-clock time for the remote call and rendering.
    pub duration_ms: u64,
}

impl AnnotatedPage {
    pub fn index(&self) -> usize {
        self.page_num.saturating_sub(1)
    }
}

/// Summary numbers for an annotated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationStats {
    pub total_pages: usize,
    pub annotated_pages: usize,
    pub failed_pages: usize,
    pub total_notes: usize,
    pub extract_duration_ms: u64,
    pub notes_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// All note pages for one source PDF.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    pub source_pdf: PathBuf,
    pub pages: Vec<AnnotatedPage>,
    pub stats: AnnotationStats,
}

impl AnnotatedDocument {
    /// Write every note page as `{dir}/{stem}_page_{n}.png` (n is 0-based).
    pub fn save_pngs(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>, ScribbleError> {
        self.pages
            .iter()
            .map(|page| {
                let path = dir.join(store::page_file_name(stem, page.index()));
                store::write_png(&path, &page.image)?;
                Ok(path)
            })
            .collect()
    }

    /// Write a PDF that interleaves each source page with its note page.
    pub async fn finalize_pdf(
        &self,
        output: impl AsRef<Path>,
        config: &ScribbleConfig,
    ) -> Result<(), ScribbleError> {
        assemble::interleave(&self.source_pdf, &self.pages, output.as_ref(), config).await
    }
}

// ── HTTP payloads ────────────────────────────────────────────────────────

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    pub page_count: usize,
}

/// Response to `generate_notes`: where each note page can be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesManifest {
    pub id: String,
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPage {
    /// 0-based page index.
    pub page_index: usize,
    pub file: String,
    pub url: String,
    /// Set when the page carries the error image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}
