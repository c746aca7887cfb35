//! Whole-document and single-page entry points.
//!
//! [`Annotator`] holds what should be resolved once per process (the note
//! generator and the handwriting font); the free functions build one for a
//! single call.

use crate::config::ScribbleConfig;
use crate::error::ScribbleError;
use crate::notes::{resolve_generator, NoteGenerator};
use crate::output::{AnnotatedDocument, AnnotatedPage, AnnotationStats, DocumentInfo};
use crate::pipeline::{extract, intake, page};
use crate::render::Typeface;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Resolved note generator, handwriting face and configuration.
pub struct Annotator {
    config: ScribbleConfig,
    generator: Arc<dyn NoteGenerator>,
    handwriting: Option<Typeface>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("generator", &self.generator.name())
            .field("handwriting", &self.handwriting)
            .finish()
    }
}

impl Annotator {
    /// Resolve the generator and font from `config`.
    ///
    /// Fails only when no generator can be configured; a missing font falls
    /// back to the bundled handwriting face.
    pub fn new(config: ScribbleConfig) -> Result<Self, ScribbleError> {
        let generator = resolve_generator(&config)?;
        let handwriting = Typeface::resolve(config.font_path.as_deref());
        Ok(Self {
            config,
            generator,
            handwriting,
        })
    }

    pub fn config(&self) -> &ScribbleConfig {
        &self.config
    }

    pub fn generator(&self) -> &dyn NoteGenerator {
        self.generator.as_ref()
    }

    /// Random source for one request: seeded when `config.seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Annotate every page of `pdf_path`.
    ///
    /// # Returns
    /// `Ok(AnnotatedDocument)` even if some pages failed (check
    /// `stats.failed_pages`; those pages carry the error image).
    ///
    /// # Errors
    /// Only for fatal errors: unreadable or corrupt PDF, pdfium unavailable.
    pub async fn annotate_document<R: Rng + ?Sized>(
        &self,
        pdf_path: &Path,
        rng: &mut R,
    ) -> Result<AnnotatedDocument, ScribbleError> {
        let total_start = Instant::now();
        info!("Annotating {} with {}", pdf_path.display(), self.generator.name());

        // ── Step 1: Extract ──────────────────────────────────────────────
        let extract_start = Instant::now();
        let contents = extract::extract_pages(pdf_path, &self.config).await?;
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        let total_pages = contents.len();
        info!("Extracted {} pages in {}ms", total_pages, extract_duration_ms);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(total_pages);
        }

        // ── Step 2: Notes, one page at a time ────────────────────────────
        let notes_start = Instant::now();
        let mut pages = Vec::with_capacity(total_pages);
        for content in &contents {
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_page_start(content.page_num, total_pages);
            }
            let result = page::process_page(
                self.generator.as_ref(),
                content,
                self.handwriting.as_ref(),
                &self.config,
                rng,
            )
            .await;
            if let Some(ref cb) = self.config.progress_callback {
                match &result.error {
                    None => cb.on_page_complete(content.page_num, total_pages, result.notes.len()),
                    Some(e) => cb.on_page_error(content.page_num, total_pages, &e.to_string()),
                }
            }
            pages.push(result);
        }
        let notes_duration_ms = notes_start.elapsed().as_millis() as u64;

        // ── Step 3: Stats ────────────────────────────────────────────────
        let failed = pages.iter().filter(|p| p.error.is_some()).count();
        let stats = AnnotationStats {
            total_pages,
            annotated_pages: total_pages - failed,
            failed_pages: failed,
            total_notes: pages.iter().map(|p| p.notes.len()).sum(),
            extract_duration_ms,
            notes_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Annotation complete: {}/{} pages, {} notes, {}ms total",
            stats.annotated_pages, total_pages, stats.total_notes, stats.total_duration_ms
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_complete(total_pages, stats.annotated_pages);
        }

        Ok(AnnotatedDocument {
            source_pdf: pdf_path.to_path_buf(),
            pages,
            stats,
        })
    }

    /// Annotate a single page by 0-based index.
    pub async fn annotate_page<R: Rng + ?Sized>(
        &self,
        pdf_path: &Path,
        index: usize,
        rng: &mut R,
    ) -> Result<AnnotatedPage, ScribbleError> {
        let content = extract::extract_page(pdf_path, &self.config, index).await?;
        debug!("Annotating page {} of {}", content.page_num, pdf_path.display());
        Ok(page::process_page(
            self.generator.as_ref(),
            &content,
            self.handwriting.as_ref(),
            &self.config,
            rng,
        )
        .await)
    }
}

/// Annotate a local PDF file.
///
/// # Example
/// ```rust,no_run
/// use scribblepdf::{annotate_pdf, ScribbleConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Gemini key from GEMINI_API_KEY
/// let config = ScribbleConfig::default();
/// let doc = annotate_pdf("lecture.pdf", &config).await?;
/// doc.save_pngs("notes".as_ref(), "lecture")?;
/// # Ok(())
/// # }
/// ```
pub async fn annotate_pdf(
    pdf_path: impl AsRef<Path>,
    config: &ScribbleConfig,
) -> Result<AnnotatedDocument, ScribbleError> {
    let path = intake::check_local_pdf(pdf_path.as_ref())?;
    let annotator = Annotator::new(config.clone())?;
    let mut rng = annotator.rng();
    annotator.annotate_document(&path, &mut rng).await
}

/// Synchronous wrapper around [`annotate_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn annotate_pdf_sync(
    pdf_path: impl AsRef<Path>,
    config: &ScribbleConfig,
) -> Result<AnnotatedDocument, ScribbleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScribbleError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(annotate_pdf(pdf_path, config))
}

/// Page count and per-page sizes, without a note generator or API key.
pub async fn inspect(pdf_path: impl AsRef<Path>, config: &ScribbleConfig) -> Result<DocumentInfo, ScribbleError> {
    let path = intake::check_local_pdf(pdf_path.as_ref())?;
    extract::inspect_document(&path, config).await
}
