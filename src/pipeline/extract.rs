//! Extraction: per-page text, optional bitmap, and canvas size via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to call
//! from async contexts. `tokio::task::spawn_blocking` moves the work onto
//! the blocking pool so the runtime's worker threads never stall on
//! rasterisation.
//!
//! ## Canvas size
//!
//! Note pages match the pixel size of the rendered source page: the page's
//! size in points scaled by `dpi / 72`, with the longest edge capped at
//! `max_rendered_pixels`. When rasterisation is off the same size is
//! computed without rendering, so note pages look the same either way.

use crate::config::ScribbleConfig;
use crate::error::ScribbleError;
use crate::output::{DocumentInfo, PageContent, PageInfo};
use crate::pipeline::encode;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The parts of [`ScribbleConfig`] extraction needs, owned so they can move
/// into a blocking task.
#[derive(Debug, Clone)]
struct ExtractOptions {
    dpi: u32,
    max_pixels: u32,
    rasterize: bool,
    lib_path: Option<PathBuf>,
}

impl From<&ScribbleConfig> for ExtractOptions {
    fn from(config: &ScribbleConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            rasterize: config.rasterize_pages,
            lib_path: config.pdfium_lib_path.clone(),
        }
    }
}

/// Bind to pdfium: the configured library, then one next to the binary,
/// then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ScribbleError> {
    let bindings = match lib_path {
        Some(dir) if dir.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ScribbleError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Pixel size of the note canvas for a page of `width_pts` × `height_pts`.
pub fn canvas_size(width_pts: f32, height_pts: f32, dpi: u32, max_pixels: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    let (mut w, mut h) = (width_pts * scale, height_pts * scale);
    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Extract every page.
pub async fn extract_pages(pdf_path: &Path, config: &ScribbleConfig) -> Result<Vec<PageContent>, ScribbleError> {
    run_blocking(pdf_path, config, None).await
}

/// Extract a single page by 0-based index.
pub async fn extract_page(
    pdf_path: &Path,
    config: &ScribbleConfig,
    index: usize,
) -> Result<PageContent, ScribbleError> {
    let mut pages = run_blocking(pdf_path, config, Some(index)).await?;
    pages
        .pop()
        .ok_or_else(|| ScribbleError::Internal(format!("page {} vanished during extraction", index + 1)))
}

/// Count pages without extracting them.
pub async fn page_count(pdf_path: &Path, config: &ScribbleConfig) -> Result<usize, ScribbleError> {
    Ok(inspect_document(pdf_path, config).await?.page_count)
}

/// Page count, sizes and text lengths. No rasterisation.
pub async fn inspect_document(pdf_path: &Path, config: &ScribbleConfig) -> Result<DocumentInfo, ScribbleError> {
    let path = pdf_path.to_path_buf();
    let opts = ExtractOptions::from(config);
    tokio::task::spawn_blocking(move || inspect_blocking(&path, &opts))
        .await
        .map_err(|e| ScribbleError::Internal(format!("Inspect task panicked: {e}")))?
}

async fn run_blocking(
    pdf_path: &Path,
    config: &ScribbleConfig,
    only: Option<usize>,
) -> Result<Vec<PageContent>, ScribbleError> {
    let path = pdf_path.to_path_buf();
    let opts = ExtractOptions::from(config);
    tokio::task::spawn_blocking(move || extract_blocking(&path, &opts, only))
        .await
        .map_err(|e| ScribbleError::Internal(format!("Extraction task panicked: {e}")))?
}

fn open<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, ScribbleError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ScribbleError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

fn extract_blocking(
    pdf_path: &Path,
    opts: &ExtractOptions,
    only: Option<usize>,
) -> Result<Vec<PageContent>, ScribbleError> {
    let pdfium = bind_pdfium(opts.lib_path.as_deref())?;
    let document = open(&pdfium, pdf_path)?;
    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    let indices: Vec<usize> = match only {
        Some(idx) if idx >= total => {
            return Err(ScribbleError::PageOutOfRange { page: idx, total });
        }
        Some(idx) => vec![idx],
        None => (0..total).collect(),
    };

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.dpi as f32 / 72.0)
        .set_maximum_width(opts.max_pixels as i32)
        .set_maximum_height(opts.max_pixels as i32);

    let mut results = Vec::with_capacity(indices.len());
    for idx in indices {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| ScribbleError::RasterisationFailed {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        let text = page
            .text()
            .map(|t| t.all())
            .map_err(|e| ScribbleError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("text layer of page {page_num}: {e:?}"),
            })?;

        let (image, width, height) = if opts.rasterize {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| ScribbleError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                })?;
            let rendered = bitmap.as_image();
            let (w, h) = (rendered.width(), rendered.height());
            let png = encode::encode_png(&rendered).map_err(|e| ScribbleError::RasterisationFailed {
                page: page_num,
                detail: format!("Image encoding failed: {e}"),
            })?;
            (Some(png), w, h)
        } else {
            let (w, h) = canvas_size(page.width().value, page.height().value, opts.dpi, opts.max_pixels);
            (None, w, h)
        };

        debug!(
            "Extracted page {} → {} chars, {}x{} px{}",
            page_num,
            text.chars().count(),
            width,
            height,
            if image.is_some() { ", rasterised" } else { "" }
        );

        results.push(PageContent {
            page_num,
            text,
            image,
            width,
            height,
        });
    }

    Ok(results)
}

fn inspect_blocking(pdf_path: &Path, opts: &ExtractOptions) -> Result<DocumentInfo, ScribbleError> {
    let pdfium = bind_pdfium(opts.lib_path.as_deref())?;
    let document = open(&pdfium, pdf_path)?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text_chars = page.text().map(|t| t.all().chars().count()).unwrap_or(0);
        pages.push(PageInfo {
            page_num: idx + 1,
            width_points: page.width().value,
            height_points: page.height().value,
            text_chars,
        });
    }

    Ok(DocumentInfo {
        page_count: pages.len(),
        pages,
    })
}
