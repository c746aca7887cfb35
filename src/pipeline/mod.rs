//! Pipeline stages for PDF-to-notes annotation.
//!
//! Each submodule implements one step and is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ extract ──▶ encode ──▶ page ──────────────▶ assemble
//! (checks)   (pdfium)    (base64)   (notes, cleanup,     (interleaved
//!                                    parse, paint)        PDF)
//! ```
//!
//! 1. [`intake`]  reject anything that is not a PDF before it touches disk
//! 2. [`extract`] page text, canvas size and optional raster; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]  PNG and base64 wrapping for multimodal requests
//! 4. [`page`]    the model call under a timeout; the only stage with
//!    network I/O. Uses [`cleanup`] and [`parse`] on the reply, then paints
//! 5. [`assemble`] optional PDF with each note page after its source page

pub mod assemble;
pub mod cleanup;
pub mod encode;
pub mod extract;
pub mod intake;
pub mod page;
pub mod parse;
