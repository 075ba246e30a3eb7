//! Pipeline stages for PDF-to-Markdown extraction.
//!
//! Each submodule implements one step, so each can be tested on its own and
//! the network stage can be swapped for a fake.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ batch
//! (path)    (pdfium)   (base64)   (VLM)   (join)
//! ```
//!
//! 1. [`input`]  — check the path is a readable PDF, derive the output path
//! 2. [`render`] — rasterise every page to `page_N.png`; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — read each PNG back and base64 it for the request body
//! 4. [`llm`]    — one chat request per image; the only stage with network I/O
//! 5. [`batch`]  — group results and join them into the document text

pub mod batch;
pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
