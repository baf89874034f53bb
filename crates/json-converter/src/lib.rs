//! LLM-driven conversion of tabular rows into schema-shaped JSON.
//!
//! # Overview
//!
//! Each row of a CSV or Excel file is sent to a language model together with
//! the field names of a target schema, and the model's answer is parsed back
//! into a JSON object:
//!
//! - **Schema Extraction**: target field names from a reference CSV, Excel or JSON file
//! - **Schema Inference**: a proposed schema from the first rows, confirmed before use
//! - **Completion Backends**: a local Ollama server or the Groq API, behind one trait
//! - **Response Normalization**: markdown fences stripped, strict JSON parse, failures kept with their input
//! - **Quality Classification**: parse failures and mostly-empty objects flagged for review
//! - **Progress Reporting**: per-row updates, a pacing countdown and cancellation between rows
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use json_converter::ai::OllamaClient;
//! use json_converter::reporting::ReportWriter;
//! use json_converter::{
//!     load_rows, ConversionPipeline, ConverterConfig, JobContext, ResultClassifier, SchemaExtractor,
//! };
//! use std::sync::Arc;
//!
//! let rows = load_rows("input.csv")?;
//! let schema = SchemaExtractor::extract("reference.xlsx")?;
//! let job = JobContext::with_schema(schema).with_model("llama2");
//!
//! let config = ConverterConfig::default();
//! let run = ConversionPipeline::builder()
//!     .client(Arc::new(OllamaClient::new()?))
//!     .config(config.clone())
//!     .build()?
//!     .run(&rows, &job)?;
//!
//! ReportWriter::from_config(&config).write_results(&run.results)?;
//!
//! let summary = ResultClassifier::default().classify(&run.results).summary();
//! println!("{} valid, {} flagged", summary.valid, summary.flagged);
//! ```
//!
//! # Inferred Schemas
//!
//! Without a reference file, [`SchemaInference`] asks the model for a schema.
//! The proposal must be confirmed before the pipeline accepts it:
//!
//! ```rust,ignore
//! use json_converter::{JobContext, SchemaInference};
//!
//! let proposal = SchemaInference::new(client.as_ref()).propose(&rows, "")?;
//! println!("{}", serde_json::to_string_pretty(proposal.schema())?);
//!
//! let job = JobContext::from_state(proposal).confirm_schema();
//! ```

pub mod ai;
pub mod classifier;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod prompt;
pub mod reporting;
pub mod schema;
pub mod types;

// Re-exports for convenient access
pub use classifier::{
    Classification, ClassificationSummary, ClassifiedResult, Disposition, FlagReason,
    FlaggedResult, ResultClassifier,
};
pub use config::{ConfigValidationError, ConverterConfig, ConverterConfigBuilder};
pub use error::{BackendError, ConversionError, ParseError, Result as ConverterResult, ResultExt};
pub use loader::{TabularFormat, load_rows};
pub use normalizer::ResponseNormalizer;
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, ConversionPipeline, ConversionPipelineBuilder,
    ConversionRun, ConversionStage, JobContext, ProgressReporter, ProgressUpdate,
};
pub use prompt::PromptBuilder;
pub use reporting::{ClassificationReport, ReportWriter};
pub use schema::{Schema, SchemaExtractor, SchemaField, SchemaInference, SchemaState};
pub use types::{ConversionResult, FailureRecord, RawCompletion, Row};
