//! Image encoding: PNG file on disk → base64 text for the request body.
//!
//! Ollama's `/api/chat` takes images as bare base64 strings (no data-URI
//! prefix) in the `images` array of a message, so the PNG bytes are encoded
//! with the standard padded alphabet and nothing else.

use crate::error::Pdf2MdError;
use crate::pipeline::render::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// A page image as base64 text, tagged with its page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Standard base64 of the PNG file bytes.
    pub data: String,
}

/// Read `path` and base64-encode its bytes.
///
/// The file handle is closed before this returns, on success or failure.
pub async fn encode_image(page_num: usize, path: &Path) -> Result<EncodedImage, Pdf2MdError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Pdf2MdError::ImageReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    let data = STANDARD.encode(&bytes);
    debug!(
        "Encoded page {} ({} bytes → {} bytes base64)",
        page_num,
        bytes.len(),
        data.len()
    );

    Ok(EncodedImage { page_num, data })
}

/// Encode every rendered page, preserving order.
pub async fn encode_pages(images: &[PageImage]) -> Result<Vec<EncodedImage>, Pdf2MdError> {
    let mut encoded = Vec::with_capacity(images.len());
    for image in images {
        encoded.push(encode_image(image.page_num, &image.path).await?);
    }
    Ok(encoded)
}

/// Decode the base64 payload back to raw bytes.
pub fn decode_image(image: &EncodedImage) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(&image.data)
}
