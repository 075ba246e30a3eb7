//! Vision model interaction: one chat request per page image.
//!
//! [`VisionModel`] is the seam between the coordinator and the network.
//! [`OllamaChatClient`] is the production implementation; tests and library
//! users can inject their own through
//! [`crate::config::ConversionConfigBuilder::vision_model`].
//!
//! ## Request shape
//!
//! ```json
//! {"model": "llama3.2-vision:11b",
//!  "messages": [
//!    {"role": "system", "content": "..."},
//!    {"role": "user", "content": "...", "images": ["<base64>"]}],
//!  "stream": false,
//!  "options": {"temperature": 0}}
//! ```
//!
//! The reply text is read from `message.content`. Requests are not retried:
//! any failure becomes a [`PageError`] for that page.

use crate::config::ConversionConfig;
use crate::error::{PageError, Pdf2MdError};
use crate::output::{Extraction, PageResult, Usage};
use crate::pipeline::encode::EncodedImage;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest slice of an error body kept in [`PageError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Text and accounting returned by a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub usage: Usage,
}

/// Turns one encoded page image into text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract(&self, image: &EncodedImage) -> Result<ModelReply, PageError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Body of a `/api/chat` request.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    total_duration: u64,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

// ── Ollama client ────────────────────────────────────────────────────────

/// Sends page images to an Ollama-compatible `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    client: reqwest::Client,
    url: Option<String>,
    model: String,
    temperature: f32,
    system_prompt: String,
    user_prompt: String,
}

impl OllamaChatClient {
    /// Build a client from the run configuration.
    ///
    /// A missing `chat_url` is not an error here; each request then fails
    /// with [`PageError::EndpointNotConfigured`].
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Pdf2MdError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Pdf2MdError::Internal(format!("HTTP client: {e}")))?;

        if config.chat_url.is_none() {
            warn!("No chat endpoint configured; every page will come back empty");
        }

        Ok(Self {
            client,
            url: config.chat_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            user_prompt: config
                .user_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_PROMPT.to_string()),
        })
    }

    /// Request body for one image.
    pub fn build_request<'a>(&'a self, image: &'a EncodedImage) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                    images: None,
                },
                ChatMessage {
                    role: "user",
                    content: &self.user_prompt,
                    images: Some(vec![image.data.as_str()]),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl VisionModel for OllamaChatClient {
    async fn extract(&self, image: &EncodedImage) -> Result<ModelReply, PageError> {
        let page = image.page_num;
        let url = self
            .url
            .as_deref()
            .ok_or(PageError::EndpointNotConfigured { page })?;

        let response = self
            .client
            .post(url)
            .json(&self.build_request(image))
            .send()
            .await
            .map_err(|e| PageError::Transport {
                page,
                detail: if e.is_timeout() {
                    format!("timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| PageError::Transport {
            page,
            detail: format!("reading body: {e}"),
        })?;

        if !status.is_success() {
            return Err(PageError::HttpStatus {
                page,
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        parse_reply(page, &body)
    }
}

/// Parse a `/api/chat` response body.
fn parse_reply(page: usize, body: &str) -> Result<ModelReply, PageError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| PageError::InvalidResponse {
            page,
            detail: e.to_string(),
        })?;

    Ok(ModelReply {
        content: parsed.message.content,
        usage: Usage {
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
            total_duration_ns: parsed.total_duration,
        },
    })
}

/// Run one page through the model.
///
/// Always returns a `PageResult`; a failed request is logged and recorded
/// as [`Extraction::Failed`] so the rest of the document still converts.
pub async fn process_page(
    model: &dyn VisionModel,
    image: &EncodedImage,
    batch_index: usize,
) -> PageResult {
    let start = Instant::now();
    let outcome = match model.extract(image).await {
        Ok(reply) => {
            debug!(
                "Page {}: {} prompt tokens, {} completion tokens, {:?}",
                image.page_num,
                reply.usage.prompt_tokens,
                reply.usage.completion_tokens,
                start.elapsed()
            );
            Extraction::Extracted {
                markdown: reply.content,
                usage: reply.usage,
            }
        }
        Err(error) => {
            warn!("Error extracting text from page {}: {}", image.page_num, error);
            Extraction::Failed { error }
        }
    };

    PageResult {
        page_num: image.page_num,
        batch_index,
        duration_ms: start.elapsed().as_millis() as u64,
        outcome,
    }
}
