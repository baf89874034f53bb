//! Completion backends.
//!
//! This module provides a trait-based abstraction over text-completion
//! backends, so the conversion pipeline and schema inference work with any
//! model server.
//!
//! # Feature Flag
//!
//! The concrete HTTP backends require the `ai` feature (enabled by default).
//! The [`CompletionClient`] trait is always available for custom
//! implementations and test doubles.
//!
//! ```toml
//! # Default: Ollama and Groq backends included
//! json-converter = { version = "0.1" }
//!
//! # Trait only
//! json-converter = { version = "0.1", default-features = false }
//! ```
//!
//! # Backends
//!
//! - [`OllamaClient`] - locally hosted models, no pacing (requires `ai` feature)
//! - [`GroqClient`] - hosted chat completion API, paced (requires `ai` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use json_converter::ai::{CompletionClient, OllamaClient};
//! use std::sync::Arc;
//!
//! let client: Arc<dyn CompletionClient> = Arc::new(OllamaClient::new()?);
//! println!("models: {:?}", client.list_models());
//! ```

// Trait is always available (for custom backends)
mod provider;
pub use provider::{BackendKind, CompletionClient};

// Concrete backends require the "ai" feature
#[cfg(feature = "ai")]
mod groq;
#[cfg(feature = "ai")]
mod ollama;

#[cfg(feature = "ai")]
pub use groq::{GroqClient, GroqConfig, GroqConfigBuilder};

#[cfg(feature = "ai")]
pub use ollama::{OllamaClient, OllamaConfig, OllamaConfigBuilder};
