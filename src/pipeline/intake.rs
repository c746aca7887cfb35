//! Upload intake: reject anything that is not a PDF before it touches disk.
//!
//! pdfium errors on non-PDF input are opaque ("format error"), so the magic
//! bytes are checked here and the client gets a meaningful 400 instead.

use crate::error::ScribbleError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// First four bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Metadata the client declared alongside the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Declared<'a> {
    pub content_type: Option<&'a str>,
    pub filename: Option<&'a str>,
}

/// Validate an uploaded body.
///
/// Checks run cheapest first: presence, size, declared type, declared name,
/// then the magic bytes.
pub fn validate_upload(bytes: &[u8], declared: Declared<'_>, max_bytes: usize) -> Result<(), ScribbleError> {
    if bytes.is_empty() {
        return Err(ScribbleError::MissingFile);
    }
    if bytes.len() > max_bytes {
        return Err(ScribbleError::UploadTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let content_type = declared.content_type.unwrap_or("");
    if !is_pdf_content_type(content_type) {
        return Err(ScribbleError::UnsupportedContentType {
            content_type: content_type.to_string(),
        });
    }

    if let Some(name) = declared.filename {
        if !has_pdf_extension(name) {
            return Err(ScribbleError::InvalidFilename {
                filename: name.to_string(),
            });
        }
    }

    check_magic(bytes)?;
    debug!("Accepted upload of {} bytes", bytes.len());
    Ok(())
}

/// `application/pdf`, ignoring case and parameters (`; charset=…`).
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false)
}

/// A non-empty stem followed by `.pdf`, ignoring case.
pub fn has_pdf_extension(filename: &str) -> bool {
    let name = filename.trim();
    name.len() > 4
        && name
            .get(name.len() - 4..)
            .map(|ext| ext.eq_ignore_ascii_case(".pdf"))
            .unwrap_or(false)
}

fn check_magic(bytes: &[u8]) -> Result<(), ScribbleError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ScribbleError::NotAPdf { magic })
}

/// Validate a local PDF path for the CLI (existence and magic bytes).
pub fn check_local_pdf(path: &Path) -> Result<PathBuf, ScribbleError> {
    let mut file = std::fs::File::open(path).map_err(|_| ScribbleError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 4];
    let n = file
        .read(&mut magic)
        .map_err(|e| ScribbleError::persistence(path, e))?;
    check_magic(&magic[..n])?;
    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}
