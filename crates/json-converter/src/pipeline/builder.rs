//! Row-by-row conversion pipeline.
//!
//! This module provides the [`ConversionPipeline`] struct and its builder.

use crate::ai::{BackendKind, CompletionClient};
use crate::config::ConverterConfig;
use crate::error::{ConversionError, Result};
use crate::normalizer::ResponseNormalizer;
use crate::pipeline::job::JobContext;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, ConversionStage, ProgressReporter, ProgressUpdate,
};
use crate::prompt::PromptBuilder;
use crate::types::{ConversionResult, Row};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Length of one pacing slice; cancellation and the countdown are checked
/// once per slice.
const PACING_SLICE: Duration = Duration::from_secs(1);

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRun {
    /// One result per converted row, in input order.
    pub results: Vec<ConversionResult>,
    /// Number of rows handed to the run.
    pub total_rows: usize,
    /// Whether the run stopped early. `results` then holds a prefix.
    pub cancelled: bool,
}

impl ConversionRun {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_failure()).count()
    }
}

/// Converts rows one at a time through a completion backend.
///
/// Use [`ConversionPipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use json_converter::{ConversionPipeline, JobContext, SchemaExtractor};
/// use json_converter::ai::OllamaClient;
/// use std::sync::Arc;
///
/// let schema = SchemaExtractor::extract("reference.csv")?;
/// let job = JobContext::with_schema(schema).with_model("llama2");
///
/// let run = ConversionPipeline::builder()
///     .client(Arc::new(OllamaClient::new()?))
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(&rows, &job)?;
/// ```
pub struct ConversionPipeline {
    config: ConverterConfig,
    client: Arc<dyn CompletionClient>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// Hosts may move a run onto a worker thread.
static_assertions::assert_impl_all!(ConversionPipeline: Send);

impl ConversionPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ConversionPipelineBuilder {
        ConversionPipelineBuilder::default()
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    /// Convert `rows` into the confirmed schema of `job`.
    ///
    /// Rows are processed strictly in order, one backend call each. Every
    /// converted row yields exactly one result; a failed request or an
    /// unparsable answer becomes a failure record instead of aborting.
    ///
    /// Requests to a cloud backend are spaced by the configured pacing
    /// interval. There is no wait after the last row.
    ///
    /// # Errors
    ///
    /// Fails before any row is sent when the job's schema is not confirmed
    /// ([`ConversionError::SchemaNotConfirmed`]) or has no fields
    /// ([`ConversionError::EmptySchema`]). Cancellation is not an error: the
    /// run is returned with `cancelled` set.
    pub fn run(&self, rows: &[Row], job: &JobContext) -> Result<ConversionRun> {
        match self.run_internal(rows, job) {
            Ok(run) => {
                if run.cancelled {
                    self.report_progress(ProgressUpdate::cancelled(run.results.len(), rows.len()));
                } else {
                    self.report_progress(ProgressUpdate::complete(format!(
                        "Converted {} rows",
                        run.results.len()
                    )));
                }
                Ok(run)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Conversion error: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&self, rows: &[Row], job: &JobContext) -> Result<ConversionRun> {
        let start_time = Instant::now();
        self.report_progress(ProgressUpdate::new(
            ConversionStage::Initializing,
            0.0,
            "Starting conversion...",
        ));

        let schema = job.schema().ok_or(ConversionError::SchemaNotConfirmed)?;
        if schema.is_empty() {
            return Err(ConversionError::EmptySchema);
        }

        let schema_keys = schema.keys();
        let model = self.client.resolve_model(job.model());
        let paced = self.client.kind() == BackendKind::Cloud;
        let total_rows = rows.len();

        info!(
            "Converting {} rows into {} fields with {} / {}",
            total_rows,
            schema_keys.len(),
            self.client.name(),
            model
        );

        let mut results = Vec::with_capacity(total_rows);
        let mut cancelled = false;

        for (i, row) in rows.iter().enumerate() {
            if self.cancellation_token.is_cancelled() {
                info!("Conversion cancelled after {}/{} rows", i, total_rows);
                cancelled = true;
                break;
            }

            let prompt = PromptBuilder::conversion_prompt(row, &schema_keys);
            let raw = self.client.complete(&prompt, model);
            let result = ResponseNormalizer::normalize(&raw, row);
            if result.is_failure() {
                warn!(
                    "Row {} failed to generate valid JSON. Raw output saved.",
                    i + 1
                );
            } else {
                debug!("Row {}/{}: converted", i + 1, total_rows);
            }
            results.push(result);

            self.report_progress(ProgressUpdate::row(i + 1, total_rows));

            if paced && i + 1 < total_rows {
                self.wait_between_requests(i + 1, total_rows);
            }
        }

        info!(
            "Conversion finished in {:.2}s ({} results)",
            start_time.elapsed().as_secs_f64(),
            results.len()
        );

        Ok(ConversionRun {
            results,
            total_rows,
            cancelled,
        })
    }

    /// Sleep the pacing interval in one-second slices, reporting a countdown.
    /// Returns early when cancellation is requested.
    fn wait_between_requests(&self, rows_done: usize, total_rows: usize) {
        let mut remaining = self.config.pacing_interval();

        while !remaining.is_zero() {
            if self.cancellation_token.is_cancelled() {
                return;
            }

            let remaining_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            self.report_progress(ProgressUpdate::waiting(rows_done, total_rows, remaining_secs));

            let slice = remaining.min(PACING_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`ConversionPipeline`].
#[derive(Default)]
pub struct ConversionPipelineBuilder {
    config: Option<ConverterConfig>,
    client: Option<Arc<dyn CompletionClient>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(ConversionPipelineBuilder: Send);

impl ConversionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: ConverterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the completion backend (required).
    ///
    /// Use `Arc` so one client can serve schema inference and several runs.
    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the run between rows.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidConfig`] if no client was set or the
    /// configuration is invalid.
    pub fn build(self) -> Result<ConversionPipeline> {
        let client = self.client.ok_or_else(|| {
            ConversionError::InvalidConfig("a completion client is required".to_string())
        })?;

        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(ConversionPipeline {
            config,
            client,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
