//! Error types for the conversion pipeline.
//!
//! Three failure families exist and they propagate differently:
//!
//! - [`ConversionError`] covers failures that stop a job before any row is
//!   converted (unreadable reference artifact, unreadable input, unconfirmed
//!   schema, bad configuration).
//! - [`BackendError`] covers transport, HTTP and credential failures of a
//!   completion backend. It never crosses the client boundary: the
//!   [`CompletionClient`](crate::ai::CompletionClient) turns it into an
//!   `"Error: <message>"` completion text.
//! - [`ParseError`] covers model output that is not valid JSON after fence
//!   stripping. It becomes a per-row [`FailureRecord`](crate::types::FailureRecord).
//!
//! Errors are serializable so a frontend can receive `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for job-level failures.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The reference artifact could not be read or parsed.
    #[error("Failed to extract schema from '{path}': {reason}")]
    Extraction { path: String, reason: String },

    /// The input dataset could not be read.
    #[error("Failed to load rows from '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The model did not propose a usable schema.
    #[error("Schema inference failed: {0}")]
    SchemaInference(String),

    /// A proposed schema was handed to the pipeline without confirmation.
    #[error("Schema has not been confirmed")]
    SchemaNotConfirmed,

    /// The schema has no fields, so there is nothing to convert into.
    #[error("Schema has no fields")]
    EmptySchema,

    /// A cloud backend was selected without credentials.
    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Completion backend failure outside of row conversion (e.g. client setup).
    #[error("Completion backend error: {0}")]
    Backend(#[from] BackendError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ConversionError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "EXTRACTION_ERROR",
            Self::Load { .. } => "LOAD_ERROR",
            Self::SchemaInference(_) => "SCHEMA_INFERENCE_FAILED",
            Self::SchemaNotConfirmed => "SCHEMA_NOT_CONFIRMED",
            Self::EmptySchema => "EMPTY_SCHEMA",
            Self::MissingCredentials(_) => "MISSING_CREDENTIALS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the user can fix this without changing any file
    /// (confirm the schema, enter a key, adjust a setting).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SchemaNotConfirmed | Self::MissingCredentials(_) | Self::InvalidConfig(_) => {
                true
            }
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl Serialize for ConversionError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ConversionError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Failure of a completion backend request.
#[derive(Error, Debug)]
pub enum BackendError {
    /// No API key was supplied to a backend that needs one.
    #[error("API key is required")]
    MissingCredentials,

    /// Transport-level failure (connection refused, timeout, bad body).
    #[cfg(feature = "ai")]
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{backend} API error {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    /// The backend answered but carried no completion text.
    #[error("No response content from {0}")]
    EmptyResponse(String),

    /// Anything else (client construction, custom backends).
    #[error("{0}")]
    Client(String),
}

/// Model output that could not be parsed as JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid JSON: {message}")]
pub struct ParseError {
    /// Parser message.
    pub message: String,
    /// The completion text as received, before fence stripping.
    pub raw_output: String,
}

/// Result type alias for job-level operations.
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ConversionError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ConversionError::EmptySchema.error_code(), "EMPTY_SCHEMA");
        assert_eq!(
            ConversionError::Extraction {
                path: "ref.xlsx".to_string(),
                reason: "corrupt".to_string(),
            }
            .error_code(),
            "EXTRACTION_ERROR"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ConversionError::SchemaNotConfirmed.is_recoverable());
        assert!(ConversionError::MissingCredentials("Groq".to_string()).is_recoverable());
        assert!(!ConversionError::EmptySchema.is_recoverable());
        assert!(
            ConversionError::SchemaNotConfirmed
                .with_context("Starting run")
                .is_recoverable()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = ConversionError::Load {
            path: "input.csv".to_string(),
            reason: "no such file".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("LOAD_ERROR"));
        assert!(json.contains("input.csv"));
    }

    #[test]
    fn test_with_context() {
        let error = ConversionError::EmptySchema.with_context("Reading reference");
        assert!(error.to_string().contains("Reading reference"));
        assert_eq!(error.error_code(), "EMPTY_SCHEMA");
    }

    #[test]
    fn test_backend_error_messages() {
        let error = BackendError::Status {
            backend: "Groq".to_string(),
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert_eq!(error.to_string(), "Groq API error 401: invalid api key");
        assert_eq!(BackendError::MissingCredentials.to_string(), "API key is required");
    }

    #[test]
    fn test_io_context() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let error = io.context("Writing results").unwrap_err();
        assert_eq!(error.error_code(), "IO_ERROR");
        assert!(error.to_string().starts_with("Writing results"));
    }
}
