//! PDF rasterisation: render every page to a PNG file via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and does blocking, CPU-heavy work. The whole open → render → save
//! loop therefore runs on tokio's blocking pool.
//!
//! Pages are rendered at `dpi / 72` scale; the default of 72 DPI yields an
//! image whose pixel size equals the page's size in points.

use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// One rendered page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub path: PathBuf,
}

/// File name for a rendered page: `page_{N}.png`, N 1-indexed.
pub fn page_file_name(page_num: usize) -> String {
    format!("page_{page_num}.png")
}

/// Bind to a pdfium library.
///
/// Lookup order: `PDFIUM_LIB_PATH`, the current directory, then the system
/// library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2MdError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Rasterise every page of `pdf_path` into `image_dir`.
///
/// The directory is created if absent. Returns the images in page order.
/// Any failure is fatal; files written before the failure are left behind.
pub async fn render_pages(
    pdf_path: &Path,
    image_dir: &Path,
    config: &ConversionConfig,
) -> Result<Vec<PageImage>, Pdf2MdError> {
    let path = pdf_path.to_path_buf();
    let dir = image_dir.to_path_buf();
    let scale = config.dpi as f32 / 72.0;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, &dir, scale, password.as_deref())
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Render task panicked: {}", e)))?
}

/// Count the pages of a PDF without rendering anything.
pub async fn page_count(pdf_path: &Path, password: Option<&str>) -> Result<usize, Pdf2MdError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || -> Result<usize, Pdf2MdError> {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, pwd.as_deref())?;
        let count = document.pages().len() as usize;
        debug!("{} has {} pages", path.display(), count);
        Ok(count)
    })
    .await
    .map_err(|e| Pdf2MdError::Internal(format!("Page count task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    image_dir: &Path,
    scale: f32,
    password: Option<&str>,
) -> Result<Vec<PageImage>, Pdf2MdError> {
    std::fs::create_dir_all(image_dir).map_err(|e| Pdf2MdError::ImageDirFailed {
        path: image_dir.to_path_buf(),
        source: e,
    })?;

    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut images = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2MdError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let out = image_dir.join(page_file_name(page_num));
        image
            .save_with_format(&out, image::ImageFormat::Png)
            .map_err(|e| Pdf2MdError::ImageWriteFailed {
                page: page_num,
                path: out.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "Rendered page {} → {}x{} px at {}",
            page_num,
            image.width(),
            image.height(),
            out.display()
        );

        images.push(PageImage {
            page_num,
            path: out,
        });
    }

    Ok(images)
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2MdError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2MdError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2MdError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2MdError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Delete every page image. Files already gone are ignored.
///
/// The image directory itself is kept.
pub async fn remove_page_images(images: &[PageImage]) -> Result<(), Pdf2MdError> {
    for image in images {
        match tokio::fs::remove_file(&image.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Pdf2MdError::ImageCleanupFailed {
                    path: image.path.clone(),
                    source: e,
                })
            }
        }
    }
    debug!("Removed {} page images", images.len());
    Ok(())
}
