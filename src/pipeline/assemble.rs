//! Reassemble a PDF that interleaves source pages with their note pages.
//!
//! ```text
//! source p1, notes p1, source p2, notes p2, …
//! ```
//!
//! Each note page gets the point size of the source page it follows, with
//! the note bitmap stretched to fill it. Source pages without a note page
//! (e.g. when only some pages were annotated) are copied alone.

use crate::config::ScribbleConfig;
use crate::error::ScribbleError;
use crate::output::AnnotatedPage;
use crate::pipeline::extract::bind_pdfium;
use crate::store;
use image::{DynamicImage, RgbImage};
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Write the interleaved PDF to `output` via [`store::write_atomic`].
pub async fn interleave(
    source_pdf: &Path,
    pages: &[AnnotatedPage],
    output: &Path,
    config: &ScribbleConfig,
) -> Result<(), ScribbleError> {
    let source = source_pdf.to_path_buf();
    let output = output.to_path_buf();
    let lib_path = config.pdfium_lib_path.clone();
    let notes: HashMap<usize, RgbImage> = pages.iter().map(|p| (p.index(), p.image.clone())).collect();

    tokio::task::spawn_blocking(move || interleave_blocking(&source, &notes, &output, lib_path))
        .await
        .map_err(|e| ScribbleError::Internal(format!("Assembly task panicked: {e}")))?
}

fn interleave_blocking(
    source_pdf: &Path,
    notes: &HashMap<usize, RgbImage>,
    output: &Path,
    lib_path: Option<PathBuf>,
) -> Result<(), ScribbleError> {
    let pdfium = bind_pdfium(lib_path.as_deref())?;
    let source = pdfium
        .load_pdf_from_file(source_pdf, None)
        .map_err(|e| ScribbleError::CorruptPdf {
            path: source_pdf.to_path_buf(),
            detail: format!("{e:?}"),
        })?;
    let mut document = pdfium.create_new_pdf().map_err(internal)?;

    let total = source.pages().len();
    let mut written: u16 = 0;
    for idx in 0..total {
        document
            .pages_mut()
            .copy_page_from_document(&source, idx, written)
            .map_err(internal)?;
        written += 1;

        let Some(image) = notes.get(&(idx as usize)) else {
            continue;
        };
        let src_page = source.pages().get(idx).map_err(internal)?;
        let (width, height) = (src_page.width(), src_page.height());

        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(width, height))
            .map_err(internal)?;
        page.objects_mut()
            .create_image_object(
                PdfPoints::ZERO,
                PdfPoints::ZERO,
                &DynamicImage::ImageRgb8(image.clone()),
                Some(width),
                Some(height),
            )
            .map_err(internal)?;
        written += 1;
        debug!("Interleaved note page after source page {}", idx + 1);
    }

    let bytes = document.save_to_bytes().map_err(|e| ScribbleError::PersistenceFailed {
        path: output.to_path_buf(),
        source: std::io::Error::other(format!("{e:?}")),
    })?;
    store::write_atomic(output, &bytes)?;

    info!("Wrote {} pages → {}", written, output.display());
    Ok(())
}

fn internal(e: PdfiumError) -> ScribbleError {
    ScribbleError::Internal(format!("pdfium: {e:?}"))
}
