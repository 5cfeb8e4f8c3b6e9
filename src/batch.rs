//! Batch driver: run the file pipeline over many inputs, one after another.
//!
//! Files never affect each other. A file that cannot be loaded, has no
//! pages or times out still yields exactly one [`FileOutcome`], and the
//! driver moves on. The summary keeps input order.

use crate::convert::FilePipeline;
use crate::error::{FileFailure, OcrError};
use crate::output::{BatchSummary, FileOutcome};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::render::{self, Rasterizer};
use crate::progress::FileProgress;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Process already-loaded documents in order.
pub async fn process_batch(pipeline: &FilePipeline, documents: &[SourceDocument]) -> BatchSummary {
    let names: Vec<String> = documents.iter().map(|d| d.name().to_string()).collect();
    drive(pipeline, names, |i| {
        let document = documents[i].clone();
        async move { Ok(document) }
    })
    .await
}

/// Load and process paths or URLs in order.
///
/// Each input is loaded right before it is processed, so only one document
/// is held in memory at a time. A load failure becomes a `Failure` outcome
/// with [`FileFailure::Unreadable`].
pub async fn convert_inputs(pipeline: &FilePipeline, inputs: &[String]) -> BatchSummary {
    let names: Vec<String> = inputs.iter().map(|i| input::display_name(i)).collect();
    let timeout_secs = pipeline.config().download_timeout_secs;
    drive(pipeline, names, |i| {
        let raw = inputs[i].clone();
        async move { input::load_input(&raw, timeout_secs).await }
    })
    .await
}

async fn drive<F, Fut>(pipeline: &FilePipeline, names: Vec<String>, mut load: F) -> BatchSummary
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<SourceDocument, OcrError>>,
{
    let start = Instant::now();
    let total_files = names.len();
    let observer = pipeline.observer();
    let file_pause = pipeline.config().file_pause;

    info!("Batch of {} file(s)", total_files);
    if let Some(observer) = observer {
        observer.on_batch_start(total_files);
    }

    let mut outcomes = Vec::with_capacity(total_files);
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 && !file_pause.is_zero() {
            tokio::time::sleep(file_pause).await;
        }

        info!("[{}/{}] {}", i + 1, total_files, name);
        if let Some(observer) = observer {
            observer.on_file_start(&FileProgress {
                filename: name.clone(),
                file_num: i + 1,
                total_files,
            });
        }

        let file_start = Instant::now();
        let outcome = match load(i).await {
            Ok(document) => pipeline.process_file(&document).await,
            Err(e) => load_failure(pipeline, name, &e, file_start.elapsed()),
        };
        outcomes.push(outcome);
    }

    let summary = BatchSummary {
        outcomes,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Batch done in {}ms: {} succeeded, {} failed",
        summary.duration_ms,
        summary.succeeded().count(),
        summary.failed().count()
    );
    if let Some(observer) = observer {
        observer.on_batch_complete(&summary);
    }
    summary
}

fn load_failure(pipeline: &FilePipeline, name: String, err: &OcrError, elapsed: Duration) -> FileOutcome {
    warn!("{}: could not be loaded: {}", name, err);
    let outcome = FileOutcome::failed(
        name,
        FileFailure::Unreadable {
            detail: err.to_string(),
        },
        0,
        Vec::new(),
        elapsed,
    );
    if let Some(observer) = pipeline.observer() {
        observer.on_file_complete(&outcome);
    }
    outcome
}

/// Page count of one input, as reported by `--inspect-only`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCountReport {
    pub filename: String,
    pub pages: Option<usize>,
    pub error: Option<String>,
}

/// Load each input and read its page count without rendering or calling
/// the model.
pub async fn inspect_inputs(
    rasterizer: &Arc<dyn Rasterizer>,
    inputs: &[String],
    timeout_secs: u64,
) -> Vec<PageCountReport> {
    let mut reports = Vec::with_capacity(inputs.len());

    for raw in inputs {
        let filename = input::display_name(raw);
        let report = match input::load_input(raw, timeout_secs).await {
            Ok(document) => match render::page_count(rasterizer, &document).await {
                Ok(n) => PageCountReport {
                    filename,
                    pages: Some(n),
                    error: None,
                },
                Err(e) => PageCountReport {
                    filename,
                    pages: None,
                    error: Some(e.to_string()),
                },
            },
            Err(e) => PageCountReport {
                filename,
                pages: None,
                error: Some(e.to_string()),
            },
        };
        reports.push(report);
    }
    reports
}
