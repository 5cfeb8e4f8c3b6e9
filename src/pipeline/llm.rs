//! Text extraction: send one page image to a multimodal model.
//!
//! The pipeline talks to a [`TextExtractor`]. Two backends exist:
//!
//! * [`OllamaExtractor`] — native `/api/chat` client for a local Ollama
//!   server. Supports the `keep_alive` hint so the model stays loaded
//!   between pages and files, and reports server-side errors (`{"error":
//!   "..."}` bodies) separately from connection failures.
//! * [`ProviderExtractor`] — any `edgequake_llm` provider (OpenAI,
//!   Anthropic, Gemini, …). The keep-alive hint has no meaning there and is
//!   ignored.
//!
//! Neither backend retries. A failed call becomes an
//! [`ExtractionFailure`] and the page gets a placeholder.

use crate::config::ConversionConfig;
use crate::error::{ExtractionFailure, OcrError};
use crate::pipeline::encode;
use crate::pipeline::render::RenderedImage;
use crate::prompts;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A single-turn extraction request: one instruction, one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub model: String,
    pub instruction: String,
    /// Base64-encoded PNG.
    pub image_base64: String,
    pub temperature: f32,
    /// Advisory "keep the model resident" hint.
    pub keep_alive: Option<String>,
    pub max_tokens: usize,
}

impl ExtractionRequest {
    /// Build the request for one rendered page from the run configuration.
    pub fn for_page(image: &RenderedImage, config: &ConversionConfig) -> Self {
        Self {
            model: config.model.clone(),
            instruction: prompts::instruction(config.instruction.as_deref()).to_string(),
            image_base64: image.to_base64(),
            temperature: config.temperature,
            keep_alive: config.keep_alive.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

/// Text extraction model contract.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short backend name for logs, e.g. "ollama".
    fn name(&self) -> &str;

    /// Return the model's raw response text.
    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure>;
}

/// Extract the text of one rendered page.
///
/// The response is returned unmodified. An empty response counts as a
/// failure so the page is flagged instead of silently blank.
pub async fn extract_text(
    extractor: &dyn TextExtractor,
    image: &RenderedImage,
    config: &ConversionConfig,
) -> Result<String, ExtractionFailure> {
    let request = ExtractionRequest::for_page(image, config);
    let text = extractor.extract(&request).await?;
    if text.is_empty() {
        return Err(ExtractionFailure::EmptyResponse {
            model: request.model,
        });
    }
    debug!(
        "Page {}: {} chars from '{}' via {}",
        image.page_index + 1,
        text.len(),
        request.model,
        extractor.name()
    );
    Ok(text)
}

// ── Ollama ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: [OllamaMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

impl<'a> OllamaChatRequest<'a> {
    fn from_request(req: &'a ExtractionRequest) -> Self {
        Self {
            model: &req.model,
            messages: [OllamaMessage {
                role: "user",
                content: &req.instruction,
                images: [&req.image_base64],
            }],
            stream: false,
            keep_alive: req.keep_alive.as_deref(),
            options: OllamaOptions {
                temperature: req.temperature,
            },
        }
    }
}

/// Message for a non-2xx Ollama answer: the `error` field when present,
/// otherwise the status line and a clipped body.
fn ollama_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OllamaErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => {
            let clipped: String = body.chars().take(200).collect();
            if clipped.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {}", clipped.trim())
            }
        }
    }
}

/// Decode a 2xx `/api/chat` body. Ollama can answer 200 with an `error`
/// field (e.g. a model that cannot take images); that is a model error.
fn parse_ollama_body(model: &str, body: &str) -> Result<String, ExtractionFailure> {
    if let Ok(parsed) = serde_json::from_str::<OllamaChatResponse>(body) {
        return Ok(parsed.message.content);
    }
    if let Ok(err) = serde_json::from_str::<OllamaErrorBody>(body) {
        return Err(ExtractionFailure::Model {
            model: model.to_string(),
            message: err.error,
        });
    }
    let clipped: String = body.chars().take(200).collect();
    Err(ExtractionFailure::Transport {
        message: format!("undecodable response: {}", clipped.trim()),
    })
}

/// Native client for Ollama's `/api/chat`.
#[derive(Debug, Clone)]
pub struct OllamaExtractor {
    client: reqwest::Client,
    chat_url: String,
}

impl OllamaExtractor {
    /// No request timeout is set: the page budget bounds each call.
    pub fn new(host: &str) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OcrError::ProviderNotConfigured {
                provider: "ollama".to_string(),
                hint: e.to_string(),
            })?;
        Ok(Self {
            client,
            chat_url: format!("{}/api/chat", host.trim_end_matches('/')),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl TextExtractor for OllamaExtractor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure> {
        let body = OllamaChatRequest::from_request(request);

        let response = self
            .client
            .post(&self.chat_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionFailure::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = ollama_error_message(status, &text);
            warn!("Ollama returned {} for model '{}': {}", status, request.model, message);
            return Err(ExtractionFailure::Model {
                model: request.model.clone(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExtractionFailure::Transport {
                message: e.to_string(),
            })?;
        parse_ollama_body(&request.model, &body)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Extraction through an `edgequake_llm` vision provider.
pub struct ProviderExtractor {
    provider: Arc<dyn LLMProvider>,
    name: String,
}

impl ProviderExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for ProviderExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure> {
        let messages = vec![ChatMessage::user_with_images(
            request.instruction.as_str(),
            vec![encode::to_image_data(&request.image_base64)],
        )];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => Ok(response.content),
            Err(e) => Err(provider_failure(&request.model, e.to_string())),
        }
    }
}

/// Split provider errors into connection trouble and model-side refusals.
fn provider_failure(model: &str, message: String) -> ExtractionFailure {
    const TRANSPORT_MARKERS: &[&str] = &[
        "network",
        "timeout",
        "timed out",
        "connection",
        "connect error",
        "error sending request",
        "dns",
    ];
    let lower = message.to_lowercase();
    if TRANSPORT_MARKERS.iter().any(|m| lower.contains(m)) {
        ExtractionFailure::Transport { message }
    } else {
        ExtractionFailure::Model {
            model: model.to_string(),
            message,
        }
    }
}

/// Build the extractor for a run.
///
/// 1. A pre-built provider in the config wins.
/// 2. No provider name, or `"ollama"`, uses [`OllamaExtractor`].
/// 3. Any other name goes through [`ProviderFactory::create_llm_provider`],
///    which reads that provider's API key from the environment.
pub fn resolve_extractor(config: &ConversionConfig) -> Result<Arc<dyn TextExtractor>, OcrError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderExtractor::new(Arc::clone(provider), "custom")));
    }

    if config.uses_ollama() {
        return Ok(Arc::new(OllamaExtractor::new(&config.ollama_host)?));
    }

    let name = config.provider_name.as_deref().unwrap_or_default();
    let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
        OcrError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })?;
    Ok(Arc::new(ProviderExtractor::new(provider, name)))
}
