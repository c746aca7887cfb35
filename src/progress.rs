//! Progress-callback trait for per-page annotation events.
//!
//! Inject an [`Arc<dyn AnnotationProgressCallback>`] via
//! [`crate::config::ScribbleConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a document. The CLI uses it to
//! drive its progress bar; the HTTP server leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use scribblepdf::{AnnotationProgressCallback, ScribbleConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl AnnotationProgressCallback for Counter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _note_count: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ScribbleConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it annotates each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnnotationProgressCallback: Send + Sync {
    /// Called once after extraction, before the first page is annotated.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the remote request for a page.
    ///
    /// # Arguments
    /// * `page_num`:    1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's notes were generated and painted.
    ///
    /// `note_count` is the number of parsed note items.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, note_count: usize) {
        let _ = (page_num, total_pages, note_count);
    }

    /// Called when a page fell back to the error image.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_document_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnnotationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScribbleConfig`].
pub type ProgressCallback = Arc<dyn AnnotationProgressCallback>;
