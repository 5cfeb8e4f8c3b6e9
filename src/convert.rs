//! File pipeline: one PDF in, one Markdown document (or a failure) out.
//!
//! Pages are processed strictly in order, one at a time:
//!
//! ```text
//! page count ─▶ for each page: render ─▶ extract ─▶ budget check ─▶ progress
//!                                                       │
//!                                      over budget: stop, file fails
//! finalise ─▶ classify ─▶ assemble ─▶ atomic write
//! ```
//!
//! Render and extraction failures are recovered into placeholders; the only
//! early abort is a page that exceeds the per-page budget. Each page's work
//! runs under `tokio::time::timeout`, so a hung model call is cancelled at
//! the deadline instead of being waited out.

use crate::config::ConversionConfig;
use crate::error::{FileFailure, OcrError};
use crate::output::{self, FileOutcome, FileStatus, PageOutcome, PageResult};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::llm::{self, TextExtractor};
use crate::pipeline::render::{self, PdfiumRasterizer, Rasterizer};
use crate::progress::{PageProgress, ProgressObserver};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Converts single documents with a fixed configuration and collaborators.
///
/// Cheap to share: collaborators sit behind `Arc`, and no state carries over
/// from one file to the next.
#[derive(Clone)]
pub struct FilePipeline {
    config: ConversionConfig,
    rasterizer: Arc<dyn Rasterizer>,
    extractor: Arc<dyn TextExtractor>,
}

impl FilePipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        config: ConversionConfig,
        rasterizer: Arc<dyn Rasterizer>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            extractor,
        }
    }

    /// Production pipeline: pdfium rasterizer plus the extractor the config
    /// selects.
    ///
    /// # Errors
    /// [`OcrError::PdfiumBindingFailed`] when no pdfium library can be found,
    /// [`OcrError::ProviderNotConfigured`] when the provider cannot be built.
    pub fn from_config(config: ConversionConfig) -> Result<Self, OcrError> {
        let rasterizer: Arc<dyn Rasterizer> = Arc::new(PdfiumRasterizer::new()?);
        let extractor = llm::resolve_extractor(&config)?;
        info!(
            "Extraction via {} with model '{}'",
            extractor.name(),
            config.model
        );
        Ok(Self::new(config, rasterizer, extractor))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn rasterizer(&self) -> &Arc<dyn Rasterizer> {
        &self.rasterizer
    }

    pub(crate) fn observer(&self) -> Option<&dyn ProgressObserver> {
        self.config.progress_observer.as_deref()
    }

    /// Run one document through the pipeline.
    ///
    /// Never returns an error: every way a file can fail is expressed in the
    /// returned [`FileOutcome`]. The observer's `on_file_complete` fires once
    /// with the same outcome.
    pub async fn process_file(&self, document: &SourceDocument) -> FileOutcome {
        let outcome = self.run(document).await;

        match outcome.status {
            FileStatus::Success | FileStatus::PartialSuccess => info!(
                "{}: {:?}, {}/{} pages extracted in {}ms",
                outcome.filename,
                outcome.status,
                outcome.extracted_pages(),
                outcome.total_pages,
                outcome.duration_ms
            ),
            FileStatus::Failure => error!(
                "{}: failed: {}",
                outcome.filename,
                outcome
                    .failure
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
        }

        if let Some(observer) = self.observer() {
            observer.on_file_complete(&outcome);
        }
        outcome
    }

    async fn run(&self, document: &SourceDocument) -> FileOutcome {
        let start = Instant::now();
        let filename = document.name().to_string();
        info!("Processing {} ({} bytes)", filename, document.len());

        // ── Open ─────────────────────────────────────────────────────────
        let total_pages = match render::page_count(&self.rasterizer, document).await {
            Ok(n) => n,
            Err(e) => {
                return FileOutcome::failed(
                    filename,
                    FileFailure::Unreadable { detail: e.reason },
                    0,
                    Vec::new(),
                    start.elapsed(),
                );
            }
        };
        if total_pages == 0 {
            warn!("{}: no pages found", filename);
            return FileOutcome::failed(
                filename,
                FileFailure::EmptyDocument,
                0,
                Vec::new(),
                start.elapsed(),
            );
        }
        info!("{}: {} pages", filename, total_pages);

        // ── Page loop ────────────────────────────────────────────────────
        let budget = self.config.page_budget;
        let mut pages = Vec::with_capacity(total_pages);

        for page_index in 0..total_pages {
            let progress = PageProgress {
                filename: filename.clone(),
                page_num: page_index + 1,
                total_pages,
            };
            if let Some(observer) = self.observer() {
                observer.on_page_start(&progress);
            }

            let page_start = Instant::now();
            let outcome = match tokio::time::timeout(budget, self.process_page(document, page_index)).await
            {
                Ok(outcome) => outcome,
                Err(_) => PageOutcome::TimedOut {
                    elapsed_ms: page_start.elapsed().as_millis() as u64,
                },
            };
            let elapsed = page_start.elapsed();

            // A page that finished right at the deadline still counts as over.
            let outcome = if elapsed > budget && !matches!(outcome, PageOutcome::TimedOut { .. }) {
                PageOutcome::TimedOut {
                    elapsed_ms: elapsed.as_millis() as u64,
                }
            } else {
                outcome
            };

            let result = PageResult {
                page_num: page_index + 1,
                outcome,
                duration_ms: elapsed.as_millis() as u64,
            };
            if let Some(observer) = self.observer() {
                observer.on_page_result(&progress, &result);
            }

            if result.is_timeout() {
                error!(
                    "{}: page {} exceeded the {}s budget ({}ms); skipping remaining {} pages",
                    filename,
                    result.page_num,
                    budget.as_secs_f32(),
                    result.duration_ms,
                    total_pages - result.page_num
                );
                pages.push(result);
                break;
            }

            debug!(
                "{}: page {}/{} done in {}ms",
                filename, result.page_num, total_pages, result.duration_ms
            );
            pages.push(result);

            if let Some(observer) = self.observer() {
                observer.on_page_progress(&progress);
            }
            if !self.config.page_pause.is_zero() {
                tokio::time::sleep(self.config.page_pause).await;
            }
        }

        // ── Finalise ─────────────────────────────────────────────────────
        let status = match output::classify(&pages, budget) {
            Ok(status) => status,
            Err(failure) => {
                return FileOutcome::failed(filename, failure, total_pages, pages, start.elapsed());
            }
        };

        let markdown = output::assemble_document(&filename, &pages);
        let path = output::output_path_for(&self.config.output_dir, &filename);
        if let Err(e) = write_document(&path, &markdown).await {
            return FileOutcome::failed(
                filename,
                FileFailure::OutputWriteFailed {
                    path,
                    detail: e.to_string(),
                },
                total_pages,
                pages,
                start.elapsed(),
            );
        }
        info!("{}: wrote {}", filename, path.display());

        FileOutcome {
            filename,
            status,
            output_path: Some(path),
            failure: None,
            total_pages,
            pages,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Render and extract one page. Failures become placeholder outcomes.
    async fn process_page(&self, document: &SourceDocument, page_index: usize) -> PageOutcome {
        let page_num = page_index + 1;

        let image =
            match render::render_page(&self.rasterizer, document, page_index, self.config.zoom).await {
                Ok(image) => image,
                Err(e) => {
                    warn!("{}: page {} render failed: {}", document.name(), page_num, e);
                    return PageOutcome::RenderFailed { reason: e.reason };
                }
            };
        debug!(
            "{}: page {} rendered {}x{} ({} bytes PNG)",
            document.name(),
            page_num,
            image.width,
            image.height,
            image.png.len()
        );

        match llm::extract_text(self.extractor.as_ref(), &image, &self.config).await {
            Ok(text) => PageOutcome::Extracted { text },
            Err(e) => {
                warn!("{}: page {} extraction failed: {}", document.name(), page_num, e);
                PageOutcome::ExtractionFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Write `markdown` to `path` atomically (temp file + rename), creating the
/// parent directory if needed.
pub async fn write_document(path: &Path, markdown: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_directory_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.md");

        write_document(&path, "# OCR Output for: report.pdf\n").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# OCR Output for: report.pdf\n"
        );
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn write_overwrites_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        write_document(&path, "first").await.unwrap();
        write_document(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn write_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let err = write_document(&blocker.join("out.md"), "x").await;
        assert!(err.is_err());
    }
}
