//! Ollama completion backend.
//!
//! Talks to a locally hosted Ollama server (<https://ollama.com/>): model
//! discovery through `GET /api/tags` and non-streaming completion through
//! `POST /api/generate`.

use super::{BackendKind, CompletionClient};
use crate::error::BackendError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama server address.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model used when none is selected.
const DEFAULT_MODEL: &str = "llama2";

/// Default timeout for generation requests in seconds. Local models can be slow.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Timeout for model discovery, which should answer immediately.
const LIST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server address without a trailing path (e.g. "http://localhost:11434").
    pub base_url: String,
    /// Model used when the job does not name one.
    pub default_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration builder.
    pub fn builder() -> OllamaConfigBuilder {
        OllamaConfigBuilder::default()
    }
}

/// Builder for [`OllamaConfig`].
#[derive(Default)]
pub struct OllamaConfigBuilder {
    base_url: Option<String>,
    default_model: Option<String>,
    timeout_secs: Option<u64>,
}

impl OllamaConfigBuilder {
    /// Set the server address.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the fallback model.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OllamaConfig {
        OllamaConfig {
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: self
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Completion client for a local Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use json_converter::ai::{OllamaClient, OllamaConfig};
///
/// // Defaults: http://localhost:11434, llama2
/// let client = OllamaClient::new()?;
///
/// let config = OllamaConfig::builder()
///     .base_url("http://gpu-box:11434")
///     .timeout_secs(300)
///     .build();
/// let client = OllamaClient::with_config(config)?;
/// ```
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, BackendError> {
        Self::with_config(OllamaConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn fetch_models(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .timeout(Duration::from_secs(LIST_TIMEOUT_SECS))
            .send()?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                backend: self.name().to_string(),
                status: response.status().as_u16(),
                body: response.text()?,
            });
        }

        let tags: TagsResponse = response.json()?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

impl CompletionClient for OllamaClient {
    fn try_complete(&self, prompt: &str, model: &str) -> Result<String, BackendError> {
        let model = self.resolve_model(model);
        debug!("Ollama generate with model '{}'", model);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                backend: self.name().to_string(),
                status: response.status().as_u16(),
                body: response.text()?,
            });
        }

        // A body without `response` is an empty completion, not a failure.
        let result: GenerateResponse = response.json()?;
        Ok(result.response.unwrap_or_default())
    }

    fn list_models(&self) -> Vec<String> {
        match self.fetch_models() {
            Ok(models) => models,
            Err(e) => {
                warn!("Could not list Ollama models at {}: {}", self.config.base_url, e);
                Vec::new()
            }
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

// ============================================================================
// Tests
// ============================================================================
