//! Result types and the Markdown document format.
//!
//! A file run produces one [`PageResult`] per attempted page, then exactly
//! one [`FileOutcome`]. A batch run produces a [`BatchSummary`] holding the
//! outcomes in input order. The assembled document format is defined here
//! too, so the pipeline and the tests share one definition of it.

use crate::error::FileFailure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Body written in place of a page that could not be rendered.
pub const RENDER_FAILED_PLACEHOLDER: &str = "[Page rendering failed]";

/// Body written in place of a page whose text could not be extracted.
pub const EXTRACTION_FAILED_PLACEHOLDER: &str = "[Text extraction failed for this page]";

/// Note inserted below the title when at least one page failed.
pub const PARTIAL_NOTE: &str = "**Note:** Text extraction or page rendering failed for one or more pages. The output may be incomplete.";

// ── Page level ───────────────────────────────────────────────────────────

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The model's raw response, unmodified.
    Extracted { text: String },
    RenderFailed { reason: String },
    ExtractionFailed { reason: String },
    /// Render + extract took longer than the page budget.
    TimedOut { elapsed_ms: u64 },
}

/// Result for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
    /// Render + extract wall-clock time, pauses excluded.
    pub duration_ms: u64,
}

impl PageResult {
    pub fn is_extracted(&self) -> bool {
        matches!(self.outcome, PageOutcome::Extracted { .. })
    }

    /// Render or extraction failure (recoverable). Timeouts are not included.
    pub fn is_page_failure(&self) -> bool {
        matches!(
            self.outcome,
            PageOutcome::RenderFailed { .. } | PageOutcome::ExtractionFailed { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, PageOutcome::TimedOut { .. })
    }

    /// Markdown body for this page's section.
    pub fn body(&self) -> &str {
        match &self.outcome {
            PageOutcome::Extracted { text } => text,
            PageOutcome::RenderFailed { .. } => RENDER_FAILED_PLACEHOLDER,
            PageOutcome::ExtractionFailed { .. } | PageOutcome::TimedOut { .. } => {
                EXTRACTION_FAILED_PLACEHOLDER
            }
        }
    }
}

// ── File level ───────────────────────────────────────────────────────────

/// Overall classification of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Every page extracted.
    Success,
    /// Some pages extracted, some failed to render or extract; output written.
    PartialSuccess,
    /// Nothing written.
    Failure,
}

impl FileStatus {
    /// True when an output document exists for the file.
    pub fn produced_output(self) -> bool {
        !matches!(self, FileStatus::Failure)
    }
}

/// Final, immutable outcome of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Display name of the input.
    pub filename: String,
    pub status: FileStatus,
    /// Path of the written Markdown file; `None` unless status produced output.
    pub output_path: Option<PathBuf>,
    /// Set whenever `status` is `Failure`.
    pub failure: Option<FileFailure>,
    /// Page count of the document (0 when it could not be read).
    pub total_pages: usize,
    /// One entry per attempted page, in page order.
    pub pages: Vec<PageResult>,
    pub duration_ms: u64,
}

impl FileOutcome {
    /// Outcome for a file that failed before or instead of producing output.
    pub fn failed(
        filename: impl Into<String>,
        failure: FileFailure,
        total_pages: usize,
        pages: Vec<PageResult>,
        duration: Duration,
    ) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Failure,
            output_path: None,
            failure: Some(failure),
            total_pages,
            pages,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn extracted_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_extracted()).count()
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_extracted()).count()
    }
}

/// Classify a file from its page results.
///
/// `Ok` carries `Success` or `PartialSuccess` (output should be written);
/// `Err` carries the reason the file is a `Failure`.
pub fn classify(pages: &[PageResult], page_budget: Duration) -> Result<FileStatus, FileFailure> {
    if let Some(timed_out) = pages.iter().find(|p| p.is_timeout()) {
        let elapsed_ms = match timed_out.outcome {
            PageOutcome::TimedOut { elapsed_ms } => elapsed_ms,
            _ => timed_out.duration_ms,
        };
        return Err(FileFailure::Timeout {
            page: timed_out.page_num,
            elapsed_ms,
            budget_ms: page_budget.as_millis() as u64,
        });
    }

    if !pages.iter().any(PageResult::is_extracted) {
        return Err(FileFailure::NoOutput {
            attempted: pages.len(),
        });
    }

    if pages.iter().any(PageResult::is_page_failure) {
        Ok(FileStatus::PartialSuccess)
    } else {
        Ok(FileStatus::Success)
    }
}

/// Format one page section: heading, body, separator.
pub fn page_section(page: &PageResult) -> String {
    format!("## Page {}\n\n{}\n\n---\n", page.page_num, page.body())
}

/// Assemble the Markdown document for one file.
///
/// The partial-failure note is included when any page failed to render or
/// extract. Sections appear in the order given, which is page order.
pub fn assemble_document(filename: &str, pages: &[PageResult]) -> String {
    let mut doc = format!("# OCR Output for: {filename}\n\n");

    if pages.iter().any(PageResult::is_page_failure) {
        doc.push_str(PARTIAL_NOTE);
        doc.push_str("\n\n---\n\n");
    }

    for page in pages {
        doc.push_str(&page_section(page));
    }

    doc
}

/// `<output_dir>/<stem of filename>.md`.
///
/// Two inputs sharing a stem map to the same path; the later one wins.
/// A name with no stem (empty, or only separators) is written as `output.md`.
pub fn output_path_for(output_dir: &Path, filename: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}.md"))
}

// ── Batch level ──────────────────────────────────────────────────────────

/// Outcomes of a whole batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
    pub duration_ms: u64,
}

impl BatchSummary {
    /// Files that produced an output document (full or partial).
    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.status.produced_output())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.status.produced_output())
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// True when there was at least one file and none produced output.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(n: usize, text: &str) -> PageResult {
        PageResult {
            page_num: n,
            outcome: PageOutcome::Extracted { text: text.into() },
            duration_ms: 10,
        }
    }

    fn render_failed(n: usize) -> PageResult {
        PageResult {
            page_num: n,
            outcome: PageOutcome::RenderFailed {
                reason: "corrupt".into(),
            },
            duration_ms: 1,
        }
    }

    #[test]
    fn document_without_failures_has_no_note() {
        let pages = vec![extracted(1, "Hello"), extracted(2, "World")];
        let doc = assemble_document("scan.pdf", &pages);
        assert_eq!(
            doc,
            "# OCR Output for: scan.pdf\n\n\
             ## Page 1\n\nHello\n\n---\n\
             ## Page 2\n\nWorld\n\n---\n"
        );
    }

    #[test]
    fn document_with_failure_has_note_and_placeholder() {
        let pages = vec![extracted(1, "Hello"), render_failed(2)];
        let doc = assemble_document("scan.pdf", &pages);
        assert!(doc.starts_with(&format!(
            "# OCR Output for: scan.pdf\n\n{PARTIAL_NOTE}\n\n---\n\n## Page 1"
        )));
        assert!(doc.contains(&format!("## Page 2\n\n{RENDER_FAILED_PLACEHOLDER}\n\n---\n")));
    }

    #[test]
    fn classify_all_extracted_is_success() {
        let pages = vec![extracted(1, "a"), extracted(2, "b")];
        assert_eq!(classify(&pages, Duration::from_secs(1)), Ok(FileStatus::Success));
    }

    #[test]
    fn classify_mixed_is_partial() {
        let pages = vec![extracted(1, "a"), render_failed(2)];
        assert_eq!(
            classify(&pages, Duration::from_secs(1)),
            Ok(FileStatus::PartialSuccess)
        );
    }

    #[test]
    fn classify_no_extracted_is_no_output() {
        let pages = vec![render_failed(1), render_failed(2)];
        assert_eq!(
            classify(&pages, Duration::from_secs(1)),
            Err(FileFailure::NoOutput { attempted: 2 })
        );
    }

    #[test]
    fn classify_timeout_wins_over_success() {
        let pages = vec![
            extracted(1, "a"),
            PageResult {
                page_num: 2,
                outcome: PageOutcome::TimedOut { elapsed_ms: 2500 },
                duration_ms: 2500,
            },
        ];
        assert_eq!(
            classify(&pages, Duration::from_secs(2)),
            Err(FileFailure::Timeout {
                page: 2,
                elapsed_ms: 2500,
                budget_ms: 2000
            })
        );
    }

    #[test]
    fn output_path_uses_stem() {
        let dir = Path::new("md_docs");
        assert_eq!(output_path_for(dir, "report.v2.pdf"), dir.join("report.v2.md"));
        assert_eq!(output_path_for(dir, "scan.pdf"), dir.join("scan.md"));
        assert_eq!(output_path_for(dir, ""), dir.join("output.md"));
        assert_eq!(output_path_for(dir, "/"), dir.join("output.md"));
    }

    #[test]
    fn summary_counts() {
        let ok = FileOutcome {
            filename: "a.pdf".into(),
            status: FileStatus::Success,
            output_path: Some("md_docs/a.md".into()),
            failure: None,
            total_pages: 1,
            pages: vec![extracted(1, "x")],
            duration_ms: 5,
        };
        let bad = FileOutcome::failed(
            "b.pdf",
            FileFailure::EmptyDocument,
            0,
            Vec::new(),
            Duration::ZERO,
        );
        let summary = BatchSummary {
            outcomes: vec![ok, bad],
            duration_ms: 5,
        };
        assert_eq!(summary.succeeded().count(), 1);
        assert_eq!(summary.failed().count(), 1);
        assert_eq!(summary.count(FileStatus::Failure), 1);
        assert!(!summary.all_failed());
    }
}
