//! Image encoding for the remote request: PNG bytes and base64.
//!
//! PNG is lossless, so fine print on the rendered page stays legible to the
//! model. The bytes are produced once at extraction; each backend wraps them
//! the way its API expects.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME type of every image sent to a backend.
pub const PNG_MIME: &str = "image/png";

/// Encode a rasterised page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} page → {} PNG bytes", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Standard base64 (with padding), as the Gemini `inline_data` field expects.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Wrap PNG bytes for an `edgequake_llm` vision message.
///
/// `detail: "high"` keeps OpenAI-style tiling from downsampling small text.
pub fn image_data(png: &[u8]) -> ImageData {
    ImageData::new(to_base64(png), PNG_MIME).with_detail("high")
}
