//! Input loading: turn a user-supplied path or URL into a [`SourceDocument`].
//!
//! The whole PDF is held in memory: pdfium loads documents from a byte
//! slice, and the file pipeline re-opens the document for every page. The
//! `%PDF` magic is checked up front so a stray `.txt` in the batch fails
//! with a clear message instead of a pdfium parse error.

use crate::error::OcrError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One input PDF: immutable bytes plus a display name.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Display name, e.g. `report.pdf`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the bytes (cheap clone).
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Display name for an input: the file name of a path, the last URL segment.
pub fn display_name(input: &str) -> String {
    if is_url(input) {
        return url_filename(input);
    }
    Path::new(input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string())
}

/// Load the input string into memory.
///
/// URLs are downloaded with `timeout_secs`; anything else is read as a
/// local file.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, OcrError> {
    if input.trim().is_empty() {
        return Err(OcrError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Read a local PDF, validating existence, permissions and magic bytes.
pub async fn load_local(path: &Path) -> Result<SourceDocument, OcrError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OcrError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => OcrError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = display_name(&path.to_string_lossy());
    check_magic(&name, &bytes)?;

    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceDocument::new(name, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceDocument, OcrError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OcrError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            OcrError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            OcrError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(OcrError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| OcrError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let name = url_filename(url);
    check_magic(&name, &bytes)?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok(SourceDocument::new(name, bytes.to_vec()))
}

/// Reject buffers that do not start with `%PDF`.
///
/// Buffers shorter than four bytes pass; pdfium reports them as unreadable.
fn check_magic(name: &str, bytes: &[u8]) -> Result<(), OcrError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(OcrError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

/// Last URL path segment that looks like a file name.
fn url_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Expand directories into the `.pdf` files they contain (sorted, non-recursive).
pub fn expand_inputs(inputs: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = PathBuf::from(input);
        if !is_url(input) && path.is_dir() {
            let mut pdfs: Vec<String> = std::fs::read_dir(&path)
                .into_iter()
                .flatten()
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| {
                    p.extension()
                        .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
                })
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            pdfs.sort();
            expanded.extend(pdfs);
        } else {
            expanded.push(input.clone());
        }
    }
    expanded
}
