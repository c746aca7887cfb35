//! Per-page annotation: request notes, then paint them.
//!
//! This is the only stage with network I/O. It never fails: a remote error
//! or timeout becomes the error page for that page, and the document goes
//! on to the next one.

use crate::config::ScribbleConfig;
use crate::error::{NotesError, PageError};
use crate::notes::NoteGenerator;
use crate::output::{AnnotatedPage, PageContent};
use crate::pipeline::{cleanup, parse};
use crate::render::{paint_error_page, paint_notes_page, Typeface};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Request notes for `page` and paint the note page.
///
/// ## Return Value
///
/// Always returns an [`AnnotatedPage`] with an image. On failure the image is
/// the error page and `error` says why.
pub async fn process_page<R: Rng + ?Sized>(
    generator: &dyn NoteGenerator,
    page: &PageContent,
    handwriting: Option<&Typeface>,
    config: &ScribbleConfig,
    rng: &mut R,
) -> AnnotatedPage {
    let start = Instant::now();

    match request_notes(generator, page, config).await {
        Ok(raw) => {
            let text = if config.clean_response {
                cleanup::clean_response(&raw)
            } else {
                raw
            };
            let notes = parse::parse_notes(&text);
            debug!("Page {}: {} notes from {}", page.page_num, notes.len(), generator.name());
            let image = paint_notes_page(page.width, page.height, &notes, handwriting, &config.layout, rng);
            AnnotatedPage {
                page_num: page.page_num,
                notes,
                image,
                error: None,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
        Err(e) => {
            warn!("Page {}: note generation failed: {}", page.page_num, e);
            let image = paint_error_page(page.width, page.height, &e.to_string(), rng);
            let error = match e {
                NotesError::Timeout { secs } => PageError::Timeout {
                    page: page.page_num,
                    secs,
                },
                other => PageError::NotesFailed {
                    page: page.page_num,
                    detail: other.to_string(),
                },
            };
            AnnotatedPage {
                page_num: page.page_num,
                notes: Vec::new(),
                image,
                error: Some(error),
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
    }
}

/// One attempt, bounded by `api_timeout_secs`.
async fn request_notes(
    generator: &dyn NoteGenerator,
    page: &PageContent,
    config: &ScribbleConfig,
) -> Result<String, NotesError> {
    let secs = config.api_timeout_secs;
    tokio::time::timeout(Duration::from_secs(secs), generator.generate(page))
        .await
        .map_err(|_| NotesError::Timeout { secs })?
}
