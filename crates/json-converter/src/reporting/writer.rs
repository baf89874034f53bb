use crate::classifier::{Classification, ClassificationSummary, FlaggedResult};
use crate::config::ConverterConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::ConversionRun;
use crate::types::ConversionResult;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Review report for a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport<'a> {
    pub generated_at: String,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    pub total_rows: usize,
    pub cancelled: bool,
    pub summary: ClassificationSummary,
    pub flagged: Vec<FlaggedResult<'a>>,
}

/// Writes conversion results and review reports to an output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
    output_file_name: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, output_file_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_file_name: output_file_name.into(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_file_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the converted data is written to.
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file_name)
    }

    /// Write `results` as a pretty-printed JSON array, creating the output
    /// directory if needed. An existing file is replaced.
    pub fn write_results(&self, results: &[ConversionResult]) -> Result<PathBuf> {
        let path = self.results_path();
        write_json(&self.output_dir, &path, &results)?;

        info!("Converted data saved: {} ({} records)", path.display(), results.len());
        Ok(path)
    }

    /// Assemble the review report for a run.
    pub fn build_classification_report<'a>(
        input_file: &str,
        output_file: Option<&str>,
        run: &ConversionRun,
        classification: &Classification<'a>,
    ) -> ClassificationReport<'a> {
        ClassificationReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(String::from),
            total_rows: run.total_rows,
            cancelled: run.cancelled,
            summary: classification.summary(),
            flagged: classification.flagged.clone(),
        }
    }

    /// Write a report to `<report_base_name>_report.json` in the output
    /// directory.
    pub fn write_report_to_file(
        &self,
        report: &ClassificationReport<'_>,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        write_json(&self.output_dir, &path, report)?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, path: &Path, value: &T) -> Result<()> {
    fs::create_dir_all(dir).context(format!("Creating {}", dir.display()))?;

    let text = serde_json::to_string_pretty(value)?;
    let mut file = File::create(path).context(format!("Writing {}", path.display()))?;
    file.write_all(text.as_bytes())
        .context(format!("Writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ResultClassifier;
    use crate::types::{FailureRecord, Row};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn sample_results() -> Vec<ConversionResult> {
        vec![
            ConversionResult::Converted(json!({"name": "Ann", "amount": 12.5})),
            ConversionResult::Failed(FailureRecord::invalid_json(
                "not json",
                Row::from_pairs([("id", json!("TX2"))]),
            )),
        ]
    }

    #[test]
    fn test_write_results_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested");
        let writer = ReportWriter::new(&dir, "converted_data.json");

        let path = writer.write_results(&sample_results()).unwrap();
        assert_eq!(path, dir.join("converted_data.json"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {\n    \"name\": \"Ann\""));

        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            written,
            json!([
                {"name": "Ann", "amount": 12.5},
                {"error": "Invalid JSON", "raw_output": "not json", "input": {"id": "TX2"}}
            ])
        );
    }

    #[test]
    fn test_write_results_replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp.path(), "out.json");

        writer.write_results(&sample_results()).unwrap();
        let path = writer.write_results(&[]).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "[]");
    }

    #[test]
    fn test_classification_report() {
        let temp = TempDir::new().unwrap();
        let writer = ReportWriter::new(temp.path(), "converted_data.json");
        let run = ConversionRun {
            results: sample_results(),
            total_rows: 2,
            cancelled: false,
        };
        let classification = ResultClassifier::default().classify(&run.results);

        let report = ReportWriter::build_classification_report(
            "input.csv",
            Some("outputs/converted_data.json"),
            &run,
            &classification,
        );
        let path = writer.write_report_to_file(&report, "input").unwrap();
        assert_eq!(path, temp.path().join("input_report.json"));

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"], json!({"total": 2, "valid": 1, "flagged": 1}));
        assert_eq!(written["flagged"][0]["index"], json!(2));
        assert_eq!(written["flagged"][0]["reason"], json!("Invalid JSON / Parsing Error"));
        assert!(written["generated_at"].is_string());
    }
}
