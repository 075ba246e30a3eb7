//! Batch grouping and text assembly.
//!
//! Batches are contiguous runs of `batch_size` pages (the last may be
//! shorter). They do not change how requests are issued; they only decide
//! how per-page texts are joined:
//!
//! ```text
//! batch text    = page texts  joined with "\n"
//! document text = batch texts joined with "\n"
//! ```

use crate::config::FailedPagePolicy;
use crate::output::{BatchResult, PageResult};

/// Separator between page texts within a batch.
pub const PAGE_JOIN: &str = "\n";

/// Separator between batch texts in the document.
pub const BATCH_JOIN: &str = "\n";

/// Number of batches needed for `total` items.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// Sizes of each batch, in order. `13` items in batches of `6` → `[6, 6, 1]`.
pub fn batch_sizes(total: usize, batch_size: usize) -> Vec<usize> {
    let size = batch_size.max(1);
    (0..batch_count(total, size))
        .map(|i| size.min(total - i * size))
        .collect()
}

/// Marker written in place of a page whose request failed, when
/// [`FailedPagePolicy::Marker`] is selected.
pub fn failed_page_marker(page_num: usize) -> String {
    format!("<!-- page {page_num}: extraction failed -->")
}

/// Text a page contributes to its batch.
pub fn page_segment(result: &PageResult, policy: FailedPagePolicy) -> String {
    match (result.markdown(), policy) {
        (Some(md), _) => md.to_string(),
        (None, FailedPagePolicy::Empty) => String::new(),
        (None, FailedPagePolicy::Marker) => failed_page_marker(result.page_num),
    }
}

/// Join the results of one batch.
pub fn assemble_batch(index: usize, results: &[PageResult], policy: FailedPagePolicy) -> BatchResult {
    let text = results
        .iter()
        .map(|r| page_segment(r, policy))
        .collect::<Vec<_>>()
        .join(PAGE_JOIN);

    BatchResult {
        index,
        page_nums: results.iter().map(|r| r.page_num).collect(),
        text,
    }
}

/// Join batch texts into the final document.
pub fn assemble_document(batches: &[BatchResult]) -> String {
    batches
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(BATCH_JOIN)
}
