//! Groq completion backend.
//!
//! Uses Groq's OpenAI-compatible chat completion API
//! (<https://console.groq.com/docs/api-reference>). The API is rate limited,
//! so the pipeline paces requests to this backend.

use super::{BackendKind, CompletionClient};
use crate::error::BackendError;
use crate::prompt::SYSTEM_INSTRUCTION;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Groq chat completion endpoint.
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model for conversions.
const DEFAULT_MODEL: &str = "groq/compound-mini";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Sampling is greedy for every request so conversions are reproducible.
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

/// Configuration for the Groq backend.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    /// Model used when the job does not name one.
    pub default_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Endpoint URL (useful for proxies or compatible servers).
    pub base_url: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GroqConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GroqConfigBuilder {
        GroqConfigBuilder::default()
    }
}

/// Builder for [`GroqConfig`].
#[derive(Default)]
pub struct GroqConfigBuilder {
    default_model: Option<String>,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
}

impl GroqConfigBuilder {
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

    /// Set a custom endpoint URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> GroqConfig {
        GroqConfig {
            default_model: self
                .default_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// Completion client for the Groq API.
///
/// # Example
///
/// ```rust,ignore
/// use json_converter::ai::{GroqClient, GroqConfig};
///
/// let client = GroqClient::new(std::env::var("GROQ_API_KEY")?)?;
///
/// let config = GroqConfig::builder()
///     .default_model("llama-3.1-8b-instant")
///     .build();
/// let client = GroqClient::with_config("your-api-key", config)?;
/// ```
pub struct GroqClient {
    api_key: String,
    config: GroqConfig,
    client: Client,
}

impl GroqClient {
    /// Create a client with default configuration.
    ///
    /// A blank key is accepted here; every request then fails with
    /// [`BackendError::MissingCredentials`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_config(api_key, GroqConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(api_key: impl Into<String>, config: GroqConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn build_request(&self, prompt: &str, model: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: TEMPERATURE,
        }
    }
}

impl CompletionClient for GroqClient {
    fn try_complete(&self, prompt: &str, model: &str) -> Result<String, BackendError> {
        if !self.has_credentials() {
            return Err(BackendError::MissingCredentials);
        }

        let model = self.resolve_model(model);
        debug!("Groq chat completion with model '{}'", model);

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt, model))
            .send()?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                backend: self.name().to_string(),
                status: response.status().as_u16(),
                body: response.text()?,
            });
        }

        let result: ChatResponse = response.json()?;

        result
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .map(|msg| msg.content)
            .ok_or_else(|| BackendError::EmptyResponse(self.name().to_string()))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    fn name(&self) -> &str {
        "Groq"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}

// ============================================================================
// Tests
// ============================================================================
