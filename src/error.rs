//! Error types for the pdf2md-ocr library.
//!
//! Three layers of failure, matching the three layers of the pipeline:
//!
//! * [`OcrError`] — **Fatal setup errors**: the work cannot even start
//!   (bad configuration, unreadable input path, provider not configured,
//!   PDFium missing). Returned as `Err(OcrError)`.
//!
//! * [`RenderFailure`] / [`ExtractionFailure`] — **Page-level**: one page
//!   could not be rasterised or read by the model. Recovered inside the file
//!   pipeline: the page gets a placeholder and the file continues.
//!
//! * [`FileFailure`] — **File-level**: the reason a file ended with
//!   [`crate::output::FileStatus::Failure`]. Recorded on the
//!   [`crate::output::FileOutcome`]; never aborts the batch.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the pdf2md-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// Reading the input failed for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Extraction backend errors ─────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("Extraction provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A page could not be turned into an image.
///
/// Corrupt documents, out-of-range indices and encoder errors all collapse
/// into this one type; the pipeline only needs to know "render failed".
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("render failed: {reason}")]
pub struct RenderFailure {
    pub reason: String,
}

impl RenderFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn index_out_of_range(page_index: usize, page_count: usize) -> Self {
        Self::new(format!(
            "index out of range (page index {page_index}, document has {page_count} pages)"
        ))
    }
}

/// The text-extraction model could not produce text for a page.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionFailure {
    /// The model (or its server) answered with an error.
    #[error(
        "model '{model}' returned an error: {message}\n\
Ensure the server is running and '{model}' is available and MULTIMODAL (can process images)."
    )]
    Model { model: String, message: String },

    /// The request never got a usable answer (connection refused, reset,
    /// undecodable body, …).
    #[error("communication with the extraction model failed: {message}")]
    Transport { message: String },

    /// The model answered, but with no text at all.
    #[error("model '{model}' returned an empty response")]
    EmptyResponse { model: String },
}

/// Why a file ended with [`crate::output::FileStatus::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FileFailure {
    /// The document has no pages at all.
    #[error("no pages found")]
    EmptyDocument,

    /// The input could not be loaded or its page count could not be read.
    #[error("document could not be opened: {detail}")]
    Unreadable { detail: String },

    /// A page exceeded the per-page budget; remaining pages were skipped.
    #[error("page {page} took {elapsed_ms}ms, over the {budget_ms}ms page budget")]
    Timeout {
        page: usize,
        elapsed_ms: u64,
        budget_ms: u64,
    },

    /// Every attempted page failed to render or extract.
    #[error("no text could be extracted from any of the {attempted} pages")]
    NoOutput { attempted: usize },

    /// Pages were extracted but the Markdown file could not be written.
    #[error("failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },
}
