//! Configuration types for batch PDF OCR.
//!
//! Every knob lives in [`ConversionConfig`], built through
//! [`ConversionConfigBuilder`]. One struct is shared by the batch driver,
//! the file pipeline and the extraction backend, so two runs can be compared
//! by diffing their `Debug` output.

use crate::error::OcrError;
use crate::progress::ProgressObserver;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default extraction model. Must be multimodal.
pub const DEFAULT_MODEL: &str = "gemma-3-4b-it-gpu:latest";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default directory for the generated Markdown files.
pub const DEFAULT_OUTPUT_DIR: &str = "md_docs";

/// Default per-page budget for render + extract.
pub const DEFAULT_PAGE_BUDGET_SECS: u64 = 120;

/// Configuration for a batch OCR run.
///
/// # Example
/// ```rust
/// use pdf2md_ocr::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("llava:13b")
///     .output_dir("out")
///     .page_budget_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.zoom, 2.0);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Identifier of the multimodal model, e.g. "llava", "gemma3:4b", "gpt-4.1-nano".
    pub model: String,

    /// Extraction provider name. `None` or `"ollama"` uses the built-in
    /// Ollama client; anything else ("openai", "anthropic", "gemini", …) is
    /// resolved through `edgequake_llm::ProviderFactory`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub ollama_host: String,

    /// Directory receiving one `<stem>.md` per processed file. Created if absent.
    pub output_dir: PathBuf,

    /// Maximum wall-clock time for rendering + extracting one page. Default: 120 s.
    ///
    /// Exceeding it fails the file and skips its remaining pages. The
    /// in-flight page work is cancelled once the budget runs out.
    pub page_budget: Duration,

    /// Linear rasterisation scale relative to the page's native size. Default: 2.0.
    ///
    /// 2× keeps body text legible for the model without producing images so
    /// large that every request crawls.
    pub zoom: f32,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Ollama `keep_alive` hint. Default: `Some("-1m")` (keep loaded).
    ///
    /// Advisory only; providers that have no such notion ignore it.
    pub keep_alive: Option<String>,

    /// Maximum tokens the model may generate per page (non-Ollama providers). Default: 4096.
    pub max_tokens: usize,

    /// Custom instruction replacing [`crate::prompts::DEFAULT_INSTRUCTION`].
    pub instruction: Option<String>,

    /// Pause after each page so observers get a chance to redraw. Default: 100 ms.
    pub page_pause: Duration,

    /// Pause between two files. Default: 500 ms.
    pub file_pause: Duration,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives page progress and file outcomes. Default: none.
    pub progress_observer: Option<Arc<dyn ProgressObserver>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            page_budget: Duration::from_secs(DEFAULT_PAGE_BUDGET_SECS),
            zoom: 2.0,
            temperature: 0.1,
            keep_alive: Some("-1m".to_string()),
            max_tokens: 4096,
            instruction: None,
            page_pause: Duration::from_millis(100),
            file_pause: Duration::from_millis(500),
            download_timeout_secs: 120,
            progress_observer: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("ollama_host", &self.ollama_host)
            .field("output_dir", &self.output_dir)
            .field("page_budget", &self.page_budget)
            .field("zoom", &self.zoom)
            .field("temperature", &self.temperature)
            .field("keep_alive", &self.keep_alive)
            .field("max_tokens", &self.max_tokens)
            .field("page_pause", &self.page_pause)
            .field("file_pause", &self.file_pause)
            .field(
                "progress_observer",
                &self.progress_observer.as_ref().map(|_| "<dyn ProgressObserver>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when extraction goes through the built-in Ollama client.
    pub fn uses_ollama(&self) -> bool {
        self.provider.is_none()
            && self
                .provider_name
                .as_deref()
                .map_or(true, |p| p.eq_ignore_ascii_case("ollama"))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.config.ollama_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn page_budget(mut self, budget: Duration) -> Self {
        self.config.page_budget = budget;
        self
    }

    pub fn page_budget_secs(self, secs: u64) -> Self {
        self.page_budget(Duration::from_secs(secs))
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    /// `None` omits the hint from requests.
    pub fn keep_alive(mut self, keep_alive: Option<String>) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn page_pause(mut self, pause: Duration) -> Self {
        self.config.page_pause = pause;
        self
    }

    pub fn file_pause(mut self, pause: Duration) -> Self {
        self.config.file_pause = pause;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.config.progress_observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, OcrError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if c.page_budget.is_zero() {
            return Err(OcrError::InvalidConfig(
                "page budget must be greater than zero".into(),
            ));
        }
        if !c.zoom.is_finite() || c.zoom <= 0.0 || c.zoom > 10.0 {
            return Err(OcrError::InvalidConfig(format!(
                "zoom must be in (0, 10], got {}",
                c.zoom
            )));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(OcrError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.page_budget, Duration::from_secs(120));
        assert_eq!(c.zoom, 2.0);
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.output_dir, PathBuf::from("md_docs"));
        assert_eq!(c.keep_alive.as_deref(), Some("-1m"));
        assert!(c.uses_ollama());
    }

    #[test]
    fn builder_rejects_zero_budget() {
        let err = ConversionConfig::builder()
            .page_budget(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("budget"));
    }

    #[test]
    fn builder_rejects_bad_zoom() {
        assert!(ConversionConfig::builder().zoom(0.0).build().is_err());
        assert!(ConversionConfig::builder().zoom(f32::NAN).build().is_err());
        assert!(ConversionConfig::builder().zoom(1.5).build().is_ok());
    }

    #[test]
    fn builder_clamps_temperature_and_trims_host() {
        let c = ConversionConfig::builder()
            .temperature(9.0)
            .ollama_host("http://gpu-box:11434/")
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.ollama_host, "http://gpu-box:11434");
    }

    #[test]
    fn named_provider_disables_ollama_client() {
        let c = ConversionConfig::builder()
            .provider_name("openai")
            .build()
            .unwrap();
        assert!(!c.uses_ollama());

        let c = ConversionConfig::builder()
            .provider_name("Ollama")
            .build()
            .unwrap();
        assert!(c.uses_ollama());
    }
}
