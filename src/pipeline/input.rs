//! Input validation: make sure the user-supplied path is a readable PDF.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure. We
//! check existence, permissions and the `%PDF` magic bytes first so callers
//! get an actionable error instead.

use crate::error::Pdf2MdError;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path.
pub fn resolve_local(path: &Path) -> Result<PathBuf, Pdf2MdError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(Pdf2MdError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2MdError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2MdError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2MdError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Path of the output Markdown file: `file_name` in the PDF's directory.
///
/// A bare file name such as `book.pdf` has an empty parent, which resolves
/// to the current directory.
pub fn output_path_for(pdf_path: &Path, file_name: &str) -> PathBuf {
    match pdf_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

/// Refuse an output name that would overwrite the input PDF itself.
pub fn check_output_name(pdf_path: &Path, file_name: &str) -> Result<(), Pdf2MdError> {
    if pdf_path.file_name() == Some(OsStr::new(file_name)) {
        return Err(Pdf2MdError::InvalidConfig(format!(
            "Output file name {file_name:?} would overwrite the input PDF"
        )));
    }
    Ok(())
}
