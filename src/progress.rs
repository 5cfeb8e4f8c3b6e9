//! Observer trait for batch, file and page progress events.
//!
//! Inject an [`Arc<dyn ProgressObserver>`] via
//! [`crate::config::ConversionConfigBuilder::progress_observer`]. The
//! pipeline never touches presentation state itself; it hands immutable
//! snapshots to the observer and ignores whatever the observer does with
//! them.
//!
//! # Example
//!
//! ```rust
//! use pdf2md_ocr::{ConversionConfig, PageProgress, ProgressObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl ProgressObserver for PageCounter {
//!     fn on_page_progress(&self, page: &PageProgress) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}: page {}/{}", page.filename, page.page_num, page.total_pages);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_observer(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchSummary, FileOutcome, PageResult};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot sent when a file starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileProgress {
    pub filename: String,
    /// 1-indexed position in the batch.
    pub file_num: usize,
    pub total_files: usize,
}

/// Snapshot sent around each page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageProgress {
    pub filename: String,
    /// 1-indexed page number.
    pub page_num: usize,
    pub total_pages: usize,
}

/// Receives progress events from the batch driver and the file pipeline.
///
/// All methods default to no-ops. Events arrive strictly in processing
/// order because processing is sequential.
pub trait ProgressObserver: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is opened.
    fn on_file_start(&self, file: &FileProgress) {
        let _ = file;
    }

    /// Called before a page is rendered.
    fn on_page_start(&self, page: &PageProgress) {
        let _ = page;
    }

    /// Called after a page finished within budget ("page i+1 of N").
    fn on_page_progress(&self, page: &PageProgress) {
        let _ = page;
    }

    /// Called with every page result, including a timed-out page.
    fn on_page_result(&self, page: &PageProgress, result: &PageResult) {
        let _ = (page, result);
    }

    /// Called exactly once per file with its final outcome.
    fn on_file_complete(&self, outcome: &FileOutcome) {
        let _ = outcome;
    }

    /// Called once after the last file.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// Observer that ignores every event, for callers that need a concrete one.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type SharedObserver = Arc<dyn ProgressObserver>;
