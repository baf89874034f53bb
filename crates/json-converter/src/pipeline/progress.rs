//! Progress reporting and cancellation support for conversion runs.
//!
//! A run reports one update per converted row, a countdown while it waits
//! between cloud requests, and a terminal update. A [`CancellationToken`] can
//! stop the run from another thread; the check happens between rows and
//! during the pacing wait, so the row in flight always completes.
//!
//! # Example
//!
//! ```rust,ignore
//! use json_converter::{CancellationToken, ConversionPipeline};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! // In another thread
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(30));
//!     token_clone.cancel();
//! });
//!
//! let run = ConversionPipeline::builder()
//!     .client(client)
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run(&rows, &job)?;
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    /// Preconditions are being checked
    Initializing,
    /// A row has been converted
    Converting,
    /// Waiting before the next cloud request
    Waiting,
    /// All rows converted
    Complete,
    /// Run was cancelled by user
    Cancelled,
    /// Run failed before converting rows
    Failed,
}

impl ConversionStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Converting => "Converting Rows",
            Self::Waiting => "Waiting (rate limit)",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

/// Progress update emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: ConversionStage,

    /// Overall progress (0.0 - 1.0), the share of rows converted
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    /// 1-based index of the row just converted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,

    /// Number of rows in the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,

    /// Seconds left before the next request (pacing countdown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_remaining_secs: Option<u64>,
}

impl ProgressUpdate {
    /// Creates an update without row information.
    pub fn new(stage: ConversionStage, progress: f32, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            row_index: None,
            total_rows: None,
            wait_remaining_secs: None,
        }
    }

    /// Creates an update for row `row_index` (1-based) of `total_rows`.
    pub fn row(row_index: usize, total_rows: usize) -> Self {
        Self {
            row_index: Some(row_index),
            total_rows: Some(total_rows),
            ..Self::new(
                ConversionStage::Converting,
                fraction(row_index, total_rows),
                format!("Processed {}/{} rows", row_index, total_rows),
            )
        }
    }

    /// Creates a pacing countdown update after row `row_index` (1-based).
    pub fn waiting(row_index: usize, total_rows: usize, remaining_secs: u64) -> Self {
        Self {
            row_index: Some(row_index),
            total_rows: Some(total_rows),
            wait_remaining_secs: Some(remaining_secs),
            ..Self::new(
                ConversionStage::Waiting,
                fraction(row_index, total_rows),
                format!("Waiting {}s (rate limit)...", remaining_secs),
            )
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(ConversionStage::Complete, 1.0, message)
    }

    /// Creates a cancelled progress update.
    pub fn cancelled(rows_done: usize, total_rows: usize) -> Self {
        Self {
            row_index: Some(rows_done),
            total_rows: Some(total_rows),
            ..Self::new(
                ConversionStage::Cancelled,
                fraction(rows_done, total_rows),
                format!("Cancelled after {}/{} rows", rows_done, total_rows),
            )
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ConversionStage::Failed, 0.0, message)
    }
}

fn fraction(done: usize, total: usize) -> f32 {
    if total > 0 {
        done as f32 / total as f32
    } else {
        0.0
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync` so a run can move to a worker
/// thread while updates reach a UI on another thread.
///
/// # Example
///
/// ```rust,ignore
/// use json_converter::{ProgressReporter, ProgressUpdate};
///
/// struct StderrReporter;
///
/// impl ProgressReporter for StderrReporter {
///     fn report(&self, update: ProgressUpdate) {
///         eprintln!("{}: {}", update.stage.display_name(), update.message);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Called once per row, once per countdown second, and at the end.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running conversion.
///
/// Clones share one atomic flag; call [`cancel()`](Self::cancel) from any
/// thread. The run stops before the next row and returns the results
/// gathered so far.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
