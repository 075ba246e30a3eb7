//! Result types returned by a conversion run.
//!
//! Every page yields a [`PageResult`] whose [`Extraction`] says explicitly
//! whether the model produced text or the request failed. The assembled
//! Markdown is derived from these results, so callers that want to surface
//! gaps can inspect `pages` instead of guessing from empty segments.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Token and timing accounting reported by the model for one request.
///
/// Fields are `0` when the endpoint does not report them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt (text plus image).
    pub prompt_tokens: u64,
    /// Tokens generated in the reply.
    pub completion_tokens: u64,
    /// Server-side wall time in nanoseconds.
    pub total_duration_ns: u64,
}

impl Usage {
    /// Sum two usage records.
    pub fn add(self, other: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_duration_ns: self.total_duration_ns + other.total_duration_ns,
        }
    }
}

/// Outcome of the model request for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// The model replied; `markdown` is its text verbatim.
    Extracted { markdown: String, usage: Usage },
    /// The request failed and was not retried.
    Failed { error: PageError },
}

/// Result for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// 0-indexed batch this page was grouped into.
    pub batch_index: usize,
    /// Client-side wall time of the request.
    pub duration_ms: u64,
    pub outcome: Extraction,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Extraction::Extracted { .. })
    }

    /// Extracted text, or `None` when the request failed.
    pub fn markdown(&self) -> Option<&str> {
        match &self.outcome {
            Extraction::Extracted { markdown, .. } => Some(markdown),
            Extraction::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.outcome {
            Extraction::Failed { error } => Some(error),
            Extraction::Extracted { .. } => None,
        }
    }

    /// Usage for this page; zero when the request failed.
    pub fn usage(&self) -> Usage {
        match &self.outcome {
            Extraction::Extracted { usage, .. } => *usage,
            Extraction::Failed { .. } => Usage::default(),
        }
    }
}

/// The joined text of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub index: usize,
    /// 1-indexed page numbers in this batch, ascending.
    pub page_nums: Vec<usize>,
    /// Per-page segments joined with `"\n"`.
    pub text: String,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub batch_count: usize,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ConversionStats {
    /// Build counters and token totals from per-page results.
    ///
    /// Durations are left at zero for the caller to fill in.
    pub fn from_pages(pages: &[PageResult], batch_count: usize) -> Self {
        let usage = pages
            .iter()
            .fold(Usage::default(), |acc, p| acc.add(p.usage()));
        let processed = pages.iter().filter(|p| p.is_success()).count();
        Self {
            total_pages: pages.len(),
            processed_pages: processed,
            failed_pages: pages.len() - processed,
            batch_count,
            total_prompt_tokens: usage.prompt_tokens,
            total_completion_tokens: usage.completion_tokens,
            ..Default::default()
        }
    }
}

/// Everything produced by [`crate::convert::convert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Full document: batch texts joined with `"\n"`.
    pub markdown: String,
    /// Where `markdown` was written.
    pub output_path: PathBuf,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    /// Per-batch texts in batch order.
    pub batches: Vec<BatchResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Pages whose request failed, in page order.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| !p.is_success())
    }
}
