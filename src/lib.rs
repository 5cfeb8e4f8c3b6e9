//! # pdf2md-ocr
//!
//! Batch OCR of PDF documents into Markdown with a multimodal model.
//!
//! Every page is rendered to an image and sent, on its own, to a vision
//! model with a fixed instruction. The raw answers are stitched into one
//! Markdown file per PDF, with a `## Page <n>` section per page. Pages and
//! files are processed strictly one after another, so a single local model
//! (Ollama by default) is never asked to serve two requests at once.
//!
//! ## Pipeline Overview
//!
//! ```text
//! inputs (paths / URLs)
//!  │
//!  ├─ batch     one file at a time, one outcome per file, input order kept
//!  └─ file      page count → per page: render → extract → budget check
//!      │
//!      ├─ render   pdfium, spawn_blocking, PNG at 2× zoom
//!      ├─ extract  Ollama /api/chat or any edgequake-llm provider
//!      └─ output   "# OCR Output for: …" + page sections, atomic write
//! ```
//!
//! ## Failure model
//!
//! * A page that fails to render or extract gets a placeholder; the file
//!   becomes a partial success.
//! * A page that exceeds the per-page budget stops the file: nothing is
//!   written for it.
//! * A document with no pages, or where no page could be extracted, is a
//!   failure with no output.
//! * Nothing stops the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_ocr::{batch, ConversionConfig, FilePipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .model("llava")
//!         .output_dir("md_docs")
//!         .build()?;
//!     let pipeline = FilePipeline::from_config(config)?;
//!
//!     let inputs = vec!["scan1.pdf".to_string(), "scan2.pdf".to_string()];
//!     let summary = batch::convert_inputs(&pipeline, &inputs).await;
//!     for outcome in &summary.outcomes {
//!         println!("{}: {:?}", outcome.filename, outcome.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-ocr` binary (clap + indicatif + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_inputs, inspect_inputs, process_batch, PageCountReport};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::FilePipeline;
pub use error::{ExtractionFailure, FileFailure, OcrError, RenderFailure};
pub use output::{BatchSummary, FileOutcome, FileStatus, PageOutcome, PageResult};
pub use pipeline::input::SourceDocument;
pub use pipeline::llm::{
    ExtractionRequest, OllamaExtractor, ProviderExtractor, TextExtractor,
};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer, RenderedImage};
pub use progress::{FileProgress, NoopObserver, PageProgress, ProgressObserver};
