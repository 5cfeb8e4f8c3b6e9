//! Page Processor stages.
//!
//! Each submodule implements one step of turning a PDF page into text.
//! The stages are stateless; the file pipeline in [`crate::convert`] drives
//! them one page at a time.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm
//! (path/URL) (pdfium)  (PNG/b64)  (Ollama / VLM)
//! ```
//!
//! 1. [`input`]  — load a local path or URL into a [`input::SourceDocument`]
//! 2. [`render`] — count pages and rasterise one page; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — lossless PNG encoding and base64 wrapping
//! 4. [`llm`]    — one extraction request per page; the only stage with
//!    model I/O

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
