//! Output artifacts.
//!
//! Two files can come out of a job:
//! - the converted data (`converted_data.json` by default), a JSON array with
//!   one element per converted row: the object the model produced, or a
//!   failure record `{error, raw_output, input}`
//! - an optional classification report (`--emit-report` CLI flag) listing the
//!   flagged rows and why they were flagged
//!
//! # Example
//!
//! ```rust,ignore
//! use json_converter::reporting::ReportWriter;
//! use json_converter::ResultClassifier;
//!
//! let writer = ReportWriter::from_config(&config);
//! writer.write_results(&run.results)?;
//!
//! let classification = ResultClassifier::default().classify(&run.results);
//! let report = ReportWriter::build_classification_report("input.csv", None, &run, &classification);
//! writer.write_report_to_file(&report, "input")?;
//! ```

mod writer;

pub use writer::{ClassificationReport, ReportWriter};
