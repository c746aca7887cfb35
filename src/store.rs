//! On-disk layout of uploads and generated note pages.
//!
//! ```text
//! {upload_dir}/{id}.pdf
//! {generated_dir}/{id}_page_{n}.png      n is 0-based
//! ```
//!
//! Identifiers are UUID v4 in simple (32 hex digit) form. Anything else is
//! treated as unknown, which also keeps request paths from escaping the
//! storage directories. Every write goes to a temp file in the target
//! directory first and is renamed into place, so readers never see a
//! partial file.

use crate::error::ScribbleError;
use crate::render::encode_png;
use image::RgbImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Fresh upload identifier.
pub fn new_upload_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reject identifiers that could not have come from [`new_upload_id`].
pub fn validate_id(id: &str) -> Result<(), ScribbleError> {
    let well_formed = id.len() == 32 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if well_formed {
        Ok(())
    } else {
        Err(ScribbleError::UnknownUpload { id: id.to_string() })
    }
}

pub fn upload_path(upload_dir: &Path, id: &str) -> PathBuf {
    upload_dir.join(format!("{id}.pdf"))
}

pub fn page_file_name(stem: &str, index: usize) -> String {
    format!("{stem}_page_{index}.png")
}

pub fn page_path(generated_dir: &Path, id: &str, index: usize) -> PathBuf {
    generated_dir.join(page_file_name(id, index))
}

/// Write `bytes` to `path` via temp file + rename, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ScribbleError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| ScribbleError::persistence(path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ScribbleError::persistence(path, e))?;
    tmp.write_all(bytes)
        .map_err(|e| ScribbleError::persistence(path, e))?;
    tmp.persist(path)
        .map_err(|e| ScribbleError::persistence(path, e.error))?;

    debug!("Wrote {} bytes → {}", bytes.len(), path.display());
    Ok(())
}

/// PNG-encode `image` and write it atomically.
pub fn write_png(path: &Path, image: &RgbImage) -> Result<(), ScribbleError> {
    let bytes = encode_png(image)
        .map_err(|e| ScribbleError::Internal(format!("PNG encoding failed: {e}")))?;
    write_atomic(path, &bytes)
}
