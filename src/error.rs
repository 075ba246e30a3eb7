//! Error types for the pdf2md-ollama library.
//!
//! Two error types map onto the two tiers of failure in a run:
//!
//! * [`Pdf2MdError`] — **Fatal**: the run cannot continue (missing input,
//!   unreadable PDF, image directory not writable, output file not written).
//!   Returned as `Err(Pdf2MdError)` from [`crate::convert::convert`].
//!
//! * [`PageError`] — **Recovered**: the model request for one page failed.
//!   Stored inside [`crate::output::PageResult`]; the page contributes an
//!   empty (or marked) segment and every other page is processed normally.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the library.
///
/// Per-page request failures use [`PageError`] instead.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium returned an error while rendering a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Page image errors ─────────────────────────────────────────────────
    /// The transient image directory could not be created.
    #[error("Failed to create image directory '{path}': {source}")]
    ImageDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rendered page could not be saved as PNG.
    #[error("Failed to save page {page} to '{path}': {detail}")]
    ImageWriteFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// A page image could not be read back for encoding.
    #[error("Failed to read page image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A page image could not be deleted after extraction.
    #[error("Failed to delete page image '{path}': {source}")]
    ImageCleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide,\n\
or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recovered error for a single page.
///
/// The request is never retried; the page's segment in the output is left
/// empty (or marked, see [`crate::config::FailedPagePolicy`]).
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// No chat endpoint URL was configured.
    #[error("Page {page}: chat endpoint URL is not configured (set OLLAMA_CHAT_COMPLETIONS_URL)")]
    EndpointNotConfigured { page: usize },

    /// Connection refused, DNS failure, timeout, or similar.
    #[error("Page {page}: request failed: {detail}")]
    Transport { page: usize, detail: String },

    /// The endpoint answered with a non-2xx status.
    #[error("Page {page}: endpoint returned HTTP {status}: {body}")]
    HttpStatus { page: usize, status: u16, body: String },

    /// The body was not JSON or had no `message.content` field.
    #[error("Page {page}: unexpected response body: {detail}")]
    InvalidResponse { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::EndpointNotConfigured { page }
            | PageError::Transport { page, .. }
            | PageError::HttpStatus { page, .. }
            | PageError::InvalidResponse { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display() {
        let e = PageError::HttpStatus {
            page: 4,
            status: 503,
            body: "model loading".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 4"), "got: {msg}");
        assert!(msg.contains("503"), "got: {msg}");
    }

    #[test]
    fn endpoint_not_configured_mentions_env_var() {
        let e = PageError::EndpointNotConfigured { page: 1 };
        assert!(e.to_string().contains("OLLAMA_CHAT_COMPLETIONS_URL"));
    }

    #[test]
    fn page_accessor_covers_all_variants() {
        let errors = [
            PageError::EndpointNotConfigured { page: 1 },
            PageError::Transport {
                page: 2,
                detail: "refused".into(),
            },
            PageError::HttpStatus {
                page: 3,
                status: 500,
                body: String::new(),
            },
            PageError::InvalidResponse {
                page: 4,
                detail: "missing field".into(),
            },
        ];
        let pages: Vec<usize> = errors.iter().map(PageError::page).collect();
        assert_eq!(pages, vec![1, 2, 3, 4]);
    }

    #[test]
    fn output_write_failed_keeps_source() {
        use std::error::Error as _;
        let e = Pdf2MdError::OutputWriteFailed {
            path: PathBuf::from("/tmp/extracted_text.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("extracted_text.md"));
    }
}
