//! Completion client trait for abstracting model backends.
//!
//! # Implementing a New Backend
//!
//! 1. Create a new file in `src/ai/` (e.g., `openai.rs`)
//! 2. Implement [`CompletionClient::try_complete`] and the identity methods
//! 3. Export the client in `src/ai/mod.rs`
//!
//! The provided [`CompletionClient::complete`] method turns every
//! [`BackendError`] into an `"Error: <message>"` completion, so callers never
//! see a failing request.

use crate::error::BackendError;
use crate::types::RawCompletion;
use tracing::warn;

/// Where a backend runs. Cloud backends are rate limited and get paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Cloud,
}

/// A backend that turns a prompt into completion text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a client can be shared with the
/// pipeline through an `Arc`.
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` to `model` and return the completion text.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on transport failures, non-success status
    /// codes, missing credentials or an empty answer.
    fn try_complete(&self, prompt: &str, model: &str) -> Result<String, BackendError>;

    /// Send `prompt` to `model`, never failing.
    ///
    /// The text is trimmed. A failed request comes back as the backend error
    /// marker, which the normalizer records as a row failure.
    fn complete(&self, prompt: &str, model: &str) -> RawCompletion {
        match self.try_complete(prompt, model) {
            Ok(text) => RawCompletion::new(text.trim()),
            Err(e) => {
                warn!("{} request failed: {}", self.name(), e);
                RawCompletion::from_backend_error(&e)
            }
        }
    }

    /// Model identifiers the backend offers. Empty when unknown or
    /// unreachable.
    fn list_models(&self) -> Vec<String> {
        Vec::new()
    }

    fn kind(&self) -> BackendKind;

    /// Get the backend name for logging and debugging.
    fn name(&self) -> &str;

    /// Model used when the caller does not pick one.
    fn default_model(&self) -> &str;

    /// `model` unless it is blank, in which case [`Self::default_model`].
    ///
    /// A non-empty identifier is passed through even if the backend does not
    /// know it; the request will then fail per row.
    fn resolve_model<'a>(&'a self, model: &'a str) -> &'a str {
        if model.trim().is_empty() {
            self.default_model()
        } else {
            model
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClient {
        answer: Result<&'static str, &'static str>,
    }

    impl CompletionClient for FixedClient {
        fn try_complete(&self, _prompt: &str, _model: &str) -> Result<String, BackendError> {
            self.answer
                .map(str::to_string)
                .map_err(|e| BackendError::Client(e.to_string()))
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        fn default_model(&self) -> &str {
            "fixed-1"
        }
    }

    #[test]
    fn test_complete_trims_text() {
        let client = FixedClient {
            answer: Ok("  {\"a\": 1}\n"),
        };
        assert_eq!(client.complete("p", "m").as_str(), "{\"a\": 1}");
    }

    #[test]
    fn test_complete_recovers_backend_error() {
        let client = FixedClient {
            answer: Err("connection refused"),
        };
        let raw = client.complete("p", "m");
        assert_eq!(raw.as_str(), "Error: connection refused");
        assert!(raw.is_backend_error());
    }

    #[test]
    fn test_resolve_model() {
        let client = FixedClient { answer: Ok("") };
        assert_eq!(client.resolve_model(""), "fixed-1");
        assert_eq!(client.resolve_model("   "), "fixed-1");
        assert_eq!(client.resolve_model("no-such-model"), "no-such-model");
    }

    #[test]
    fn test_list_models_defaults_to_empty() {
        let client = FixedClient { answer: Ok("") };
        assert!(client.list_models().is_empty());
    }
}
