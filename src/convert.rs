//! End-to-end run: render, encode, extract batch by batch, clean up, write.
//!
//! Requests are awaited one at a time in page order. Batching only shapes
//! the joins in the assembled text (see [`crate::pipeline::batch`]).

use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use crate::output::{BatchResult, ConversionOutput, ConversionStats, PageResult};
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::llm::{OllamaChatClient, VisionModel};
use crate::pipeline::render::PageImage;
use crate::pipeline::{batch, encode, input, llm, render};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a PDF into a Markdown file beside it.
///
/// # Steps
/// 1. Validate the input path.
/// 2. Render every page to `config.image_dir`.
/// 3. Base64 each page image.
/// 4. Send each image to the model, batch by batch, in page order.
/// 5. Delete the page images.
/// 6. Write the joined text to `config.output_file_name` in the PDF's
///    directory, replacing any previous file.
///
/// # Errors
/// Returns `Err(Pdf2MdError)` only for fatal errors (input, pdfium, file
/// I/O). Failed model requests are recorded per page in
/// [`ConversionOutput::pages`] and never abort the run.
pub async fn convert(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_local(pdf_path.as_ref())?;
    input::check_output_name(&pdf_path, &config.output_file_name)?;
    info!("Starting conversion: {}", pdf_path.display());

    let model = resolve_model(config)?;

    // ── Rasterise ────────────────────────────────────────────────────────
    let render_start = Instant::now();
    let images = render::render_pages(&pdf_path, &config.image_dir, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages into {} in {}ms",
        images.len(),
        config.image_dir.display(),
        render_duration_ms
    );

    // ── Encode ───────────────────────────────────────────────────────────
    let encoded = encode_or_clean_up(&images).await?;

    // ── Extract ──────────────────────────────────────────────────────────
    let llm_start = Instant::now();
    let (pages, batches) = extract_batches(model.as_ref(), &encoded, config).await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Clean up ─────────────────────────────────────────────────────────
    render::remove_page_images(&images).await?;

    // ── Write ────────────────────────────────────────────────────────────
    let markdown = batch::assemble_document(&batches);
    let output_path = input::output_path_for(&pdf_path, &config.output_file_name);
    write_output(&output_path, &markdown).await?;

    let stats = ConversionStats {
        render_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..ConversionStats::from_pages(&pages, batches.len())
    };

    info!(
        "Conversion complete: {}/{} pages extracted, {}ms total → {}",
        stats.processed_pages,
        stats.total_pages,
        stats.total_duration_ms,
        output_path.display()
    );
    if stats.failed_pages > 0 {
        warn!(
            "{} page(s) failed and are empty in the output",
            stats.failed_pages
        );
    }

    Ok(ConversionOutput {
        markdown,
        output_path,
        pages,
        batches,
        stats,
    })
}

/// Send already encoded images through `model`, grouped into batches.
///
/// Returns per-page results in page order and per-batch texts in batch
/// order. Never fails: a failed request becomes a failed [`PageResult`].
pub async fn extract_batches(
    model: &dyn VisionModel,
    images: &[EncodedImage],
    config: &ConversionConfig,
) -> (Vec<PageResult>, Vec<BatchResult>) {
    let total_pages = images.len();
    let batch_size = config.batch_size.max(1);
    let batch_count = batch::batch_count(total_pages, batch_size);
    let callback = config.progress_callback.as_deref();

    if let Some(cb) = callback {
        cb.on_conversion_start(total_pages);
    }

    let mut pages = Vec::with_capacity(total_pages);
    let mut batches = Vec::with_capacity(batch_count);

    for (batch_index, chunk) in images.chunks(batch_size).enumerate() {
        debug!(
            "Batch {}/{}: pages {}..={}",
            batch_index + 1,
            batch_count,
            chunk.first().map_or(0, |i| i.page_num),
            chunk.last().map_or(0, |i| i.page_num)
        );
        if let Some(cb) = callback {
            cb.on_batch_start(batch_index, batch_count, chunk.len());
        }

        let mut batch_results = Vec::with_capacity(chunk.len());
        for image in chunk {
            if let Some(cb) = callback {
                cb.on_page_start(image.page_num, total_pages);
            }

            let result = llm::process_page(model, image, batch_index).await;

            if let Some(cb) = callback {
                match (result.markdown(), result.error()) {
                    (Some(md), _) => {
                        cb.on_page_complete(result.page_num, total_pages, md.chars().count())
                    }
                    (None, Some(e)) => cb.on_page_error(result.page_num, total_pages, &e.to_string()),
                    (None, None) => {}
                }
            }
            batch_results.push(result);
        }

        batches.push(batch::assemble_batch(
            batch_index,
            &batch_results,
            config.failed_pages,
        ));
        pages.extend(batch_results);
    }

    if let Some(cb) = callback {
        let success = pages.iter().filter(|p| p.is_success()).count();
        cb.on_conversion_complete(total_pages, success);
    }

    (pages, batches)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pdf_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(pdf_path, config))
}

/// Count the pages of a PDF without contacting the model.
pub async fn inspect(
    pdf_path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<usize, Pdf2MdError> {
    let pdf_path = input::resolve_local(pdf_path.as_ref())?;
    render::page_count(&pdf_path, password).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the injected model if there is one, else build the HTTP client.
fn resolve_model(config: &ConversionConfig) -> Result<Arc<dyn VisionModel>, Pdf2MdError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }
    Ok(Arc::new(OllamaChatClient::from_config(config)?))
}

/// Encode every page image; on failure delete the images before returning
/// the encode error.
async fn encode_or_clean_up(images: &[PageImage]) -> Result<Vec<EncodedImage>, Pdf2MdError> {
    match encode::encode_pages(images).await {
        Ok(encoded) => Ok(encoded),
        Err(e) => {
            if let Err(cleanup) = render::remove_page_images(images).await {
                warn!("Cleanup after encode failure also failed: {}", cleanup);
            }
            Err(e)
        }
    }
}

/// Write `markdown` to `path` through a sibling temp file and a rename, so
/// an interrupted run never leaves a half-written file.
async fn write_output(path: &Path, markdown: &str) -> Result<(), Pdf2MdError> {
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(|e| Pdf2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2MdError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_output_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extracted_text.md");
        std::fs::write(&path, "old contents").unwrap();

        write_output(&path, "# New").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# New");
        assert!(!dir.path().join("extracted_text.md.tmp").exists());
    }

    #[tokio::test]
    async fn write_output_into_missing_dir_is_fatal() {
        let err = write_output(Path::new("/no/such/dir/extracted_text.md"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2MdError::OutputWriteFailed { .. }));
    }

    #[tokio::test]
    async fn encode_failure_removes_rendered_images() {
        let dir = tempfile::tempdir().unwrap();
        let images: Vec<PageImage> = (1..=3)
            .map(|page_num| PageImage {
                page_num,
                path: dir.path().join(render::page_file_name(page_num)),
            })
            .collect();
        // Page 2 was never written, so reading it back fails.
        std::fs::write(&images[0].path, b"png").unwrap();
        std::fs::write(&images[2].path, b"png").unwrap();

        let err = encode_or_clean_up(&images).await.unwrap_err();

        assert!(matches!(err, Pdf2MdError::ImageReadFailed { .. }), "got: {err:?}");
        assert!(!images[0].path.exists());
        assert!(!images[2].path.exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn encode_success_keeps_images_for_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let image = PageImage {
            page_num: 1,
            path: dir.path().join("page_1.png"),
        };
        std::fs::write(&image.path, b"png").unwrap();

        let encoded = encode_or_clean_up(std::slice::from_ref(&image)).await.unwrap();

        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].page_num, 1);
        assert!(image.path.exists());
    }

    #[tokio::test]
    async fn convert_rejects_non_pdf_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, "plain text").unwrap();

        let config = ConversionConfig::builder()
            .image_dir(dir.path().join("images"))
            .build()
            .unwrap();
        let err = convert(&path, &config).await.unwrap_err();

        assert!(matches!(err, Pdf2MdError::NotAPdf { .. }));
        assert!(!dir.path().join("images").exists());
    }

    #[tokio::test]
    async fn convert_refuses_to_overwrite_its_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        std::fs::write(&path, "%PDF-1.4\n").unwrap();

        let config = ConversionConfig::builder()
            .image_dir(dir.path().join("images"))
            .output_file_name("book.pdf")
            .build()
            .unwrap();
        let err = convert(&path, &config).await.unwrap_err();

        assert!(matches!(err, Pdf2MdError::InvalidConfig(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "%PDF-1.4\n");
        assert!(!dir.path().join("images").exists());
    }
}
