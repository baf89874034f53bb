//! Pipeline module.
//!
//! This module provides the conversion pipeline, the per-job context it runs
//! against, and progress/cancellation support.

mod builder;
mod job;
pub mod progress;

pub use builder::{ConversionPipeline, ConversionPipelineBuilder, ConversionRun};
pub use job::JobContext;
pub use progress::{
    CancellationToken, ClosureProgressReporter, ConversionStage, ProgressReporter, ProgressUpdate,
};
