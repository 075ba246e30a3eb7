//! Configuration types for a PDF-to-Markdown run.
//!
//! Every operator-tunable value (model, endpoint, batch size, paths, prompts)
//! lives in [`ConversionConfig`], built through [`ConversionConfigBuilder`].
//! Defaults reproduce the plain behaviour: `llama3.2-vision:11b`, temperature
//! 0, batches of 6, images under `./images`, output in `extracted_text.md`
//! beside the input PDF.

use crate::error::Pdf2MdError;
use crate::pipeline::llm::VisionModel;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vision model identifier.
pub const DEFAULT_MODEL: &str = "llama3.2-vision:11b";

/// Default number of images per batch.
pub const DEFAULT_BATCH_SIZE: usize = 6;

/// Default name of the transient page image directory.
pub const DEFAULT_IMAGE_DIR: &str = "images";

/// Default output file name, written beside the input PDF.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "extracted_text.md";

/// Environment variable holding the chat-completions endpoint URL.
pub const CHAT_URL_ENV: &str = "OLLAMA_CHAT_COMPLETIONS_URL";

/// Environment variable overriding the model identifier.
pub const MODEL_ENV: &str = "OLLAMA_MODEL";

/// Configuration for one conversion run.
///
/// # Example
/// ```rust
/// use pdf2md_ollama::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .chat_url("http://localhost:11434/api/chat")
///     .batch_size(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 4);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier sent in every request. Default: `llama3.2-vision:11b`.
    pub model: String,

    /// Chat-completions endpoint, e.g. `http://localhost:11434/api/chat`.
    ///
    /// Left unset, every page request fails with
    /// [`crate::error::PageError::EndpointNotConfigured`] rather than the
    /// run failing upfront.
    pub chat_url: Option<String>,

    /// Sampling temperature. Default: 0 (deterministic).
    pub temperature: f32,

    /// Images per batch. Batches only shape how results are joined. Default: 6.
    pub batch_size: usize,

    /// Rendering DPI. Default: 72, the page's native point size.
    pub dpi: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory for transient page images. Created if absent. Default: `images`.
    pub image_dir: PathBuf,

    /// Output file name, written in the input PDF's directory.
    pub output_file_name: String,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Custom user prompt. If None, uses [`crate::prompts::DEFAULT_USER_PROMPT`].
    pub user_prompt: Option<String>,

    /// Per-request timeout in seconds. None keeps the HTTP client's default.
    pub api_timeout_secs: Option<u64>,

    /// How failed pages appear in the assembled text. Default: empty segment.
    pub failed_pages: FailedPagePolicy,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Pre-constructed vision model. Takes precedence over `chat_url`.
    pub vision_model: Option<Arc<dyn VisionModel>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            chat_url: None,
            temperature: 0.0,
            batch_size: DEFAULT_BATCH_SIZE,
            dpi: 72,
            password: None,
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            system_prompt: None,
            user_prompt: None,
            api_timeout_secs: None,
            failed_pages: FailedPagePolicy::default(),
            progress_callback: None,
            vision_model: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("chat_url", &self.chat_url)
            .field("temperature", &self.temperature)
            .field("batch_size", &self.batch_size)
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("image_dir", &self.image_dir)
            .field("output_file_name", &self.output_file_name)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("failed_pages", &self.failed_pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("vision_model", &self.vision_model.as_ref().map(|_| "<dyn VisionModel>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Builder pre-populated from `OLLAMA_CHAT_COMPLETIONS_URL` and `OLLAMA_MODEL`.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> ConversionConfigBuilder {
        let mut builder = Self::builder();
        if let Some(url) = non_empty_env(CHAT_URL_ENV) {
            builder = builder.chat_url(url);
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            builder = builder.model(model);
        }
        builder
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn chat_url(mut self, url: impl Into<String>) -> Self {
        self.config.chat_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    /// Values below 1 are raised to 1.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 400);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_dir = dir.into();
        self
    }

    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_file_name = name.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.user_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn failed_pages(mut self, policy: FailedPagePolicy) -> Self {
        self.config.failed_pages = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if c.batch_size == 0 {
            return Err(Pdf2MdError::InvalidConfig("Batch size must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2MdError::InvalidConfig("Model must not be empty".into()));
        }
        let name = c.output_file_name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "Output file name must be a bare file name, got {name:?}"
            )));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Pdf2MdError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What a failed page contributes to the assembled Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailedPagePolicy {
    /// Empty segment; indistinguishable from a blank page. (default)
    #[default]
    Empty,
    /// An HTML comment naming the page, so gaps stay visible.
    Marker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plain_run() {
        let c = ConversionConfig::default();
        assert_eq!(c.model, "llama3.2-vision:11b");
        assert_eq!(c.batch_size, 6);
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.dpi, 72);
        assert_eq!(c.image_dir, PathBuf::from("images"));
        assert_eq!(c.output_file_name, "extracted_text.md");
        assert!(c.chat_url.is_none());
        assert_eq!(c.failed_pages, FailedPagePolicy::Empty);
    }

    #[test]
    fn builder_clamps_values() {
        let c = ConversionConfig::builder()
            .batch_size(0)
            .temperature(5.0)
            .dpi(10)
            .build()
            .unwrap();
        assert_eq!(c.batch_size, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.dpi, 36);
    }

    #[test]
    fn build_rejects_path_in_output_name() {
        let err = ConversionConfig::builder()
            .output_file_name("out/extracted.md")
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2MdError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_dot_output_names() {
        for name in [".", ".."] {
            let err = ConversionConfig::builder()
                .output_file_name(name)
                .build()
                .unwrap_err();
            assert!(matches!(err, Pdf2MdError::InvalidConfig(_)), "{name:?} accepted");
        }
    }

    #[test]
    fn build_rejects_empty_model() {
        assert!(ConversionConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn build_rejects_zero_timeout() {
        assert!(ConversionConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
