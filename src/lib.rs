//! # pdf2md-ollama
//!
//! Extract the text of a PDF as Markdown by showing each page to a
//! vision-capable model served over an Ollama-style `/api/chat` endpoint.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render   rasterise every page to images/page_N.png (pdfium)
//!  ├─ 2. Encode   PNG bytes → base64
//!  ├─ 3. Extract  one chat request per page, in order, grouped in batches of 6
//!  ├─ 4. Clean    delete the page images
//!  └─ 5. Write    extracted_text.md beside the PDF
//! ```
//!
//! A request that fails (endpoint down, non-2xx, bad body) is logged and that
//! page contributes an empty segment; the run itself still succeeds. Check
//! [`ConversionOutput::failed_pages`] or set
//! [`FailedPagePolicy::Marker`] to make such gaps visible.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_ollama::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint from OLLAMA_CHAT_COMPLETIONS_URL, model from OLLAMA_MODEL
//!     let config = ConversionConfig::from_env().build()?;
//!     let output = convert("book.pdf", &config).await?;
//!     eprintln!(
//!         "{} pages → {} ({} failed)",
//!         output.stats.total_pages,
//!         output.output_path.display(),
//!         output.stats.failed_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, FailedPagePolicy};
pub use convert::{convert, convert_sync, extract_batches, inspect};
pub use error::{PageError, Pdf2MdError};
pub use output::{BatchResult, ConversionOutput, ConversionStats, Extraction, PageResult, Usage};
pub use pipeline::encode::EncodedImage;
pub use pipeline::llm::{ModelReply, OllamaChatClient, VisionModel};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
