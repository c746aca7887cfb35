//! The three operations behind the HTTP boundary.
//!
//! [`NotesService`] knows nothing about HTTP: it takes bytes and ids and
//! returns payloads or a [`ScribbleError`], which the server maps to a
//! status code.

use crate::annotate::Annotator;
use crate::config::ScribbleConfig;
use crate::error::ScribbleError;
use crate::output::{ManifestPage, NotesManifest, UploadReceipt};
use crate::pipeline::intake::{self, Declared};
use crate::pipeline::extract;
use crate::render::encode_png;
use crate::store;
use std::path::PathBuf;
use tracing::{info, warn};

/// Upload, generate-notes and get-page over the configured directories.
#[derive(Debug)]
pub struct NotesService {
    annotator: Annotator,
}

impl NotesService {
    /// Resolve the note generator and font, and create the storage directories.
    pub fn new(config: ScribbleConfig) -> Result<Self, ScribbleError> {
        Self::with_annotator(Annotator::new(config)?)
    }

    pub fn with_annotator(annotator: Annotator) -> Result<Self, ScribbleError> {
        let config = annotator.config();
        for dir in [&config.upload_dir, &config.generated_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ScribbleError::persistence(dir, e))?;
        }
        Ok(Self { annotator })
    }

    pub fn config(&self) -> &ScribbleConfig {
        self.annotator.config()
    }

    /// Validate and store an uploaded PDF.
    ///
    /// The file is removed again if pdfium cannot open it, so the upload
    /// directory only holds documents that can be annotated.
    pub async fn upload(&self, bytes: &[u8], declared: Declared<'_>) -> Result<UploadReceipt, ScribbleError> {
        let config = self.config();
        intake::validate_upload(bytes, declared, config.max_upload_bytes)?;

        let id = store::new_upload_id();
        let path = store::upload_path(&config.upload_dir, &id);
        store::write_atomic(&path, bytes)?;

        match extract::page_count(&path, config).await {
            Ok(page_count) => {
                info!("Stored upload {} ({} bytes, {} pages)", id, bytes.len(), page_count);
                Ok(UploadReceipt { id, page_count })
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&path) {
                    warn!("Could not remove rejected upload {}: {}", path.display(), rm);
                }
                Err(e)
            }
        }
    }

    /// Annotate every page of an upload and persist the note pages.
    pub async fn generate_notes(&self, id: &str) -> Result<NotesManifest, ScribbleError> {
        let source = self.source_path(id)?;
        let config = self.config();
        let mut rng = self.annotator.rng();
        let document = self.annotator.annotate_document(&source, &mut rng).await?;

        let mut pages = Vec::with_capacity(document.pages.len());
        for page in &document.pages {
            let file = store::page_file_name(id, page.index());
            store::write_png(&config.generated_dir.join(&file), &page.image)?;
            pages.push(ManifestPage {
                page_index: page.index(),
                url: format!("/pages/{id}/{}", page.index()),
                file,
                error: page.error.as_ref().map(|e| e.to_string()),
            });
        }
        info!(
            "Generated {} note pages for {} ({} failed)",
            pages.len(),
            id,
            document.stats.failed_pages
        );
        Ok(NotesManifest {
            id: id.to_string(),
            pages,
        })
    }

    /// PNG bytes of note page `index` (0-based), generating it if needed.
    pub async fn get_page(&self, id: &str, index: usize) -> Result<Vec<u8>, ScribbleError> {
        let source = self.source_path(id)?;
        let config = self.config();
        let path = store::page_path(&config.generated_dir, id, index);
        if path.is_file() {
            return std::fs::read(&path).map_err(|e| ScribbleError::persistence(&path, e));
        }

        info!("Note page {} of {} not materialised; generating", index, id);
        let mut rng = self.annotator.rng();
        let page = self.annotator.annotate_page(&source, index, &mut rng).await?;
        let bytes = encode_png(&page.image)
            .map_err(|e| ScribbleError::Internal(format!("PNG encoding failed: {e}")))?;
        match &page.error {
            // Served once, retried on the next fetch.
            Some(e) => warn!("Note page {} of {} failed ({}); not cached", index, id, e),
            None => store::write_atomic(&path, &bytes)?,
        }
        Ok(bytes)
    }

    fn source_path(&self, id: &str) -> Result<PathBuf, ScribbleError> {
        store::validate_id(id)?;
        let path = store::upload_path(&self.config().upload_dir, id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ScribbleError::UnknownUpload { id: id.to_string() })
        }
    }
}
