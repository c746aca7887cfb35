//! Error types for the scribblepdf library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ScribbleError`]: **Fatal**: the request cannot proceed at all (wrong
//!   content type, unreadable PDF, disk full). Returned as `Err` from the
//!   pipeline entry points and mapped to an HTTP status by the server.
//!
//! * [`PageError`]: **Non-fatal**: one page's notes could not be generated.
//!   Stored inside [`crate::output::AnnotatedPage`]; the page gets the error
//!   image and the rest of the document still completes.
//!
//! * [`NotesError`]: what a [`crate::notes::NoteGenerator`] returns when the
//!   remote model call fails. The pipeline folds it into a [`PageError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scribblepdf library.
#[derive(Debug, Error)]
pub enum ScribbleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A local input path does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The request carried no file body.
    #[error("No file uploaded")]
    MissingFile,

    /// The declared content type is not `application/pdf`.
    #[error("Only PDF files are accepted (got content type '{content_type}')")]
    UnsupportedContentType { content_type: String },

    /// The declared filename is empty or does not carry a `.pdf` extension.
    #[error("Invalid filename '{filename}': expected a .pdf file")]
    InvalidFilename { filename: String },

    /// The bytes do not start with the PDF magic header.
    #[error("File is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    /// Upload body exceeds the configured limit.
    #[error("Upload of {size} bytes exceeds the {limit}-byte limit")]
    UploadTooLarge { size: usize, limit: usize },

    /// No upload is stored under the given identifier.
    #[error("Unknown upload id '{id}'")]
    UnknownUpload { id: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be parsed: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Requested page index exceeds the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error while reading or rendering a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set SCRIBBLE_PDFIUM_LIB=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Notes backend errors ──────────────────────────────────────────────
    /// No note generator could be built from the configuration.
    #[error("Note generator '{backend}' is not configured.\n{hint}")]
    GeneratorNotConfigured { backend: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a persisted file.
    #[error("Failed to write '{path}': {source}")]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScribbleError {
    pub(crate) fn persistence(path: &std::path::Path, source: std::io::Error) -> Self {
        ScribbleError::PersistenceFailed {
            path: path.to_path_buf(),
            source,
        }
    }

    /// HTTP status the boundary reports for this error.
    ///
    /// Invalid input is a client error; everything that went wrong while
    /// processing an accepted upload is a server error.
    pub fn status_code(&self) -> u16 {
        match self {
            ScribbleError::MissingFile
            | ScribbleError::UnsupportedContentType { .. }
            | ScribbleError::InvalidFilename { .. }
            | ScribbleError::NotAPdf { .. } => 400,
            ScribbleError::FileNotFound { .. }
            | ScribbleError::UnknownUpload { .. }
            | ScribbleError::PageOutOfRange { .. } => 404,
            ScribbleError::UploadTooLarge { .. } => 413,
            ScribbleError::CorruptPdf { .. }
            | ScribbleError::RasterisationFailed { .. }
            | ScribbleError::PdfiumBindingFailed(_)
            | ScribbleError::GeneratorNotConfigured { .. }
            | ScribbleError::PersistenceFailed { .. }
            | ScribbleError::InvalidConfig(_)
            | ScribbleError::Internal(_) => 500,
        }
    }
}

/// A non-fatal error for a single page.
///
/// The page still gets an image (the error page) so callers can show the
/// user what went wrong next to the pages that worked.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The remote model call failed.
    #[error("Page {page}: note generation failed: {detail}")]
    NotesFailed { page: usize, detail: String },

    /// The remote model call did not answer in time.
    #[error("Page {page}: note generation timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

/// Failure of a single remote annotation request.
#[derive(Debug, Error)]
pub enum NotesError {
    /// No API key was configured for the backend.
    #[error("{backend} API key not set")]
    MissingApiKey { backend: &'static str },

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The endpoint answered 2xx but the body had no candidate text.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Error surfaced by an `edgequake_llm` provider.
    #[error("Provider error: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_client_error() {
        let e = ScribbleError::UnsupportedContentType {
            content_type: "text/plain".into(),
        };
        assert_eq!(e.status_code(), 400);
        assert!(e.to_string().contains("text/plain"));
    }

    #[test]
    fn unknown_upload_maps_to_not_found() {
        let e = ScribbleError::UnknownUpload { id: "abc".into() };
        assert_eq!(e.status_code(), 404);
        assert!(e.to_string().contains("abc"));
    }

    #[test]
    fn corrupt_pdf_maps_to_server_error() {
        let e = ScribbleError::CorruptPdf {
            path: PathBuf::from("uploads/x.pdf"),
            detail: "bad xref".into(),
        };
        assert_eq!(e.status_code(), 500);
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn upload_too_large_display() {
        let e = ScribbleError::UploadTooLarge {
            size: 20,
            limit: 10,
        };
        assert_eq!(e.status_code(), 413);
        assert!(e.to_string().contains("10-byte"));
    }

    #[test]
    fn api_error_carries_provider_message() {
        let e = NotesError::Api {
            status: 403,
            message: "API key not valid".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("API key not valid"), "got: {msg}");
    }

    #[test]
    fn page_timeout_display() {
        let e = PageError::Timeout { page: 3, secs: 60 };
        assert!(e.to_string().contains("Page 3"));
        assert!(e.to_string().contains("60s"));
    }
}
