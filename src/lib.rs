//! # scribblepdf
//!
//! Turn the pages of a PDF into pencil-style handwritten note pages.
//!
//! Each page is sent to a generative model (Google Gemini by default, or any
//! provider `edgequake-llm` supports) with a study-notes prompt. The returned
//! notes are drawn on a blank canvas the size of the page using a
//! handwriting font, randomised ink, a pencil-grain background and the odd
//! underline or arrow.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Intake   validate the upload (magic bytes, type, size)
//!  ├─ 2. Extract  page text + raster via pdfium (spawn_blocking)
//!  ├─ 3. Notes    one model call per page, bounded by a timeout
//!  ├─ 4. Parse    cleanup, then one note per non-blank line
//!  ├─ 5. Paint    grain texture + handwriting layout → PNG
//!  └─ 6. Output   PNG per page, optionally an interleaved PDF
//! ```
//!
//! A page whose model call fails gets an error page instead of notes; the
//! rest of the document is still annotated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scribblepdf::{annotate_pdf, ScribbleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key from GEMINI_API_KEY
//!     let config = ScribbleConfig::builder().seed(42).build()?;
//!     let doc = annotate_pdf("lecture.pdf", &config).await?;
//!     doc.save_pngs("notes".as_ref(), "lecture")?;
//!     doc.finalize_pdf("lecture_notes.pdf", &config).await?;
//!     eprintln!("{} notes on {} pages", doc.stats.total_notes, doc.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Service
//!
//! [`serve`] exposes `POST /upload`, `POST /generate_notes` and
//! `GET /pages/{id}/{n}`; see [`server`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scribblepdf` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotate;
pub mod config;
pub mod error;
pub mod notes;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod server;
pub mod service;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotate::{annotate_pdf, annotate_pdf_sync, inspect, Annotator};
pub use config::{ScribbleConfig, ScribbleConfigBuilder};
pub use error::{NotesError, PageError, ScribbleError};
pub use notes::{resolve_generator, GeminiClient, NoteGenerator, ProviderNoteGenerator};
pub use output::{
    AnnotatedDocument, AnnotatedPage, AnnotationStats, DocumentInfo, ManifestPage, NoteItem,
    NoteKind, NoteStyle, NotesManifest, PageContent, PageInfo, UploadReceipt,
};
pub use progress::{AnnotationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use render::{LayoutStyle, Typeface};
pub use server::{serve, Server};
pub use service::NotesService;
