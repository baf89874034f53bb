//! Configuration types for the conversion pipeline.
//!
//! Backend-specific settings (endpoints, timeouts, default models) live in
//! [`OllamaConfig`](crate::ai::OllamaConfig) and
//! [`GroqConfig`](crate::ai::GroqConfig); this module covers the job itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default wait between two cloud requests.
pub const DEFAULT_PACING_INTERVAL_MS: u64 = 10_000;

/// Default null density above which a converted object is flagged.
pub const DEFAULT_NULL_DENSITY_THRESHOLD: f64 = 0.5;

/// Default number of rows shown to the model when proposing a schema.
pub const DEFAULT_SCHEMA_SAMPLE_ROWS: usize = 4;

/// Default name of the output artifact.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "converted_data.json";

/// Configuration for a conversion job.
///
/// # Example
///
/// ```rust,ignore
/// use json_converter::ConverterConfig;
/// use std::time::Duration;
///
/// let config = ConverterConfig::builder()
///     .pacing_interval(Duration::from_secs(5))
///     .null_density_threshold(0.6)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Wait between consecutive requests to a cloud backend, in milliseconds.
    /// Never applied after the last row, never applied to local backends.
    /// Default: 10000
    pub pacing_interval_ms: u64,

    /// Objects whose share of empty fields is strictly greater than this
    /// value are flagged (0.0 - 1.0).
    /// Default: 0.5
    pub null_density_threshold: f64,

    /// Rows sampled for schema inference.
    /// Default: 4
    pub schema_sample_rows: usize,

    /// Directory the output artifact is written to.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// File name of the output artifact.
    /// Default: "converted_data.json"
    pub output_file_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: DEFAULT_PACING_INTERVAL_MS,
            null_density_threshold: DEFAULT_NULL_DENSITY_THRESHOLD,
            schema_sample_rows: DEFAULT_SCHEMA_SAMPLE_ROWS,
            output_dir: PathBuf::from("outputs"),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.null_density_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "null_density_threshold".to_string(),
                value: self.null_density_threshold,
            });
        }

        if self.schema_sample_rows == 0 {
            return Err(ConfigValidationError::InvalidSampleRows(
                self.schema_sample_rows,
            ));
        }

        if self.output_file_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyOutputFileName);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid schema sample rows: {0} (must be at least 1)")]
    InvalidSampleRows(usize),

    #[error("Output file name must not be empty")]
    EmptyOutputFileName,
}

impl From<ConfigValidationError> for crate::error::ConversionError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ConversionError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`ConverterConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    pacing_interval_ms: Option<u64>,
    null_density_threshold: Option<f64>,
    schema_sample_rows: Option<usize>,
    output_dir: Option<PathBuf>,
    output_file_name: Option<String>,
}

impl ConverterConfigBuilder {
    /// Set the wait between cloud requests.
    pub fn pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval_ms = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the null density threshold.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = more than half empty)
    pub fn null_density_threshold(mut self, threshold: f64) -> Self {
        self.null_density_threshold = Some(threshold);
        self
    }

    /// Set how many rows are sampled for schema inference.
    pub fn schema_sample_rows(mut self, rows: usize) -> Self {
        self.schema_sample_rows = Some(rows);
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the output file name.
    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.output_file_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ConverterConfig` or an error if validation fails.
    pub fn build(self) -> Result<ConverterConfig, ConfigValidationError> {
        let config = ConverterConfig {
            pacing_interval_ms: self
                .pacing_interval_ms
                .unwrap_or(DEFAULT_PACING_INTERVAL_MS),
            null_density_threshold: self
                .null_density_threshold
                .unwrap_or(DEFAULT_NULL_DENSITY_THRESHOLD),
            schema_sample_rows: self
                .schema_sample_rows
                .unwrap_or(DEFAULT_SCHEMA_SAMPLE_ROWS),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
            output_file_name: self
                .output_file_name
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE_NAME.to_string()),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.pacing_interval(), Duration::from_secs(10));
        assert_eq!(config.null_density_threshold, 0.5);
        assert_eq!(config.schema_sample_rows, 4);
        assert_eq!(config.output_file_name, "converted_data.json");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ConverterConfig::builder()
            .pacing_interval(Duration::from_millis(250))
            .null_density_threshold(0.75)
            .schema_sample_rows(2)
            .output_dir("results")
            .output_file_name("out.json")
            .build()
            .unwrap();

        assert_eq!(config.pacing_interval_ms, 250);
        assert_eq!(config.null_density_threshold, 0.75);
        assert_eq!(config.schema_sample_rows, 2);
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.output_file_name, "out.json");
    }

    #[test]
    fn test_oversized_pacing_saturates() {
        let config = ConverterConfig::builder()
            .pacing_interval(Duration::MAX)
            .build()
            .unwrap();
        assert_eq!(config.pacing_interval_ms, u64::MAX);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = ConverterConfig::builder().null_density_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_zero_sample_rows() {
        let result = ConverterConfig::builder().schema_sample_rows(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidSampleRows(0)
        ));
    }

    #[test]
    fn test_validation_blank_file_name() {
        let result = ConverterConfig::builder().output_file_name("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyOutputFileName
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "pacing_interval_ms": 2000,
            "null_density_threshold": 0.4,
            "schema_sample_rows": 3,
            "output_dir": "exports",
            "output_file_name": "rows.json"
        }"#;

        let config: ConverterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pacing_interval(), Duration::from_secs(2));
        assert_eq!(config.null_density_threshold, 0.4);
        assert_eq!(config.output_dir.to_str().unwrap(), "exports");
    }
}
