//! CLI entry point for the row-to-JSON converter.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use json_converter::ai::CompletionClient;
use json_converter::{
    ClassificationReport, ConversionError, ConversionPipeline, ConversionRun, ConverterConfig,
    JobContext, ReportWriter, ResultClassifier, Row, SchemaExtractor, SchemaInference, load_rows,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[cfg(feature = "ai")]
use json_converter::ai::{GroqClient, OllamaClient, OllamaConfig};
#[cfg(feature = "ai")]
use std::env;

/// Completion backend selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliProvider {
    /// Local Ollama server (no rate limiting)
    Ollama,
    /// Groq cloud API (requires GROQ_API_KEY, requests are paced)
    Groq,
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Convert CSV/Excel rows into schema-shaped JSON with a language model",
    long_about = "Sends every row of a CSV or Excel file to a language model together with the \
                  fields of a target schema, and collects the JSON objects it returns.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GROQ_API_KEY    API key for the Groq backend (also read from .env)\n\n\
                  EXAMPLES:\n  \
                  # Schema from a reference file, local model\n  \
                  json-converter -i input.csv -s reference.xlsx -m llama2\n\n  \
                  # Let the model propose a schema and accept it\n  \
                  json-converter -i input.csv --infer-schema --yes\n\n  \
                  # Groq backend with a review report\n  \
                  json-converter -i input.csv -s reference.json -p groq -r\n\n  \
                  # Show models available on the local server\n  \
                  json-converter --list-models"
)]
struct Args {
    /// Path to the CSV / Excel file whose rows are converted
    #[arg(short, long, required_unless_present = "list_models")]
    input: Option<String>,

    /// Reference file (CSV, Excel or JSON) defining the target fields
    #[arg(short, long, conflicts_with = "infer_schema")]
    #[arg(required_unless_present_any = ["infer_schema", "list_models"])]
    schema: Option<String>,

    /// Ask the model to propose a schema from the first rows
    #[arg(long)]
    infer_schema: bool,

    /// Accept an inferred schema without asking
    #[arg(long, requires = "infer_schema")]
    yes: bool,

    /// Completion backend
    #[arg(short, long, value_enum, default_value = "ollama")]
    provider: CliProvider,

    /// Model identifier (backend default when omitted)
    #[arg(short, long)]
    model: Option<String>,

    /// Address of the Ollama server
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Groq API key (overrides GROQ_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// List the models available on the Ollama server and exit
    #[arg(long)]
    list_models: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name
    #[arg(long, default_value = "converted_data.json")]
    output_name: String,

    /// Seconds to wait between requests to a cloud backend
    #[arg(long, default_value = "10")]
    pacing_secs: u64,

    /// Null density threshold (0.0 - 1.0)
    ///
    /// Objects with a larger share of empty fields are flagged for review
    #[arg(long, default_value = "0.5")]
    null_threshold: f64,

    /// Write a JSON review report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output the review report as JSON to stdout instead of a summary
    ///
    /// Disables all progress logs
    #[arg(long)]
    json: bool,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if args.list_models {
        return list_models(&args);
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required"))?;
    if !Path::new(input).exists() {
        return Err(anyhow!("Input file not found: {}", input));
    }

    let config = ConverterConfig::builder()
        .output_dir(&args.output)
        .output_file_name(&args.output_name)
        .pacing_interval(Duration::from_secs(args.pacing_secs))
        .null_density_threshold(args.null_threshold)
        .build()?;

    let client = build_client(&args)?;

    let rows = load_rows(input)?;
    if rows.is_empty() {
        warn!("Input file has no data rows");
    }

    let job = resolve_job(&args, &rows, client.as_ref(), &config)?;
    let pipeline = build_pipeline(&args, client, config.clone())?;

    info!("{}", "=".repeat(80));
    info!("Starting conversion of {} rows...", rows.len());
    info!("{}", "=".repeat(80));

    match pipeline.run(&rows, &job) {
        Ok(run) => handle_run_output(&run, input, &config, &args),
        Err(e) => {
            error!("Conversion failed: {}", e);
            Err(anyhow!("Conversion failed: {}", e))
        }
    }
}

#[cfg(feature = "ai")]
fn build_client(args: &Args) -> Result<Arc<dyn CompletionClient>> {
    match args.provider {
        CliProvider::Ollama => {
            let config = OllamaConfig::builder().base_url(&args.ollama_url).build();
            info!("Using Ollama backend at {}", config.base_url);
            Ok(Arc::new(OllamaClient::with_config(config)?))
        }
        CliProvider::Groq => {
            let api_key = args
                .api_key
                .clone()
                .or_else(|| env::var("GROQ_API_KEY").ok())
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    ConversionError::MissingCredentials(
                        "Groq (set GROQ_API_KEY or pass --api-key)".to_string(),
                    )
                })?;
            info!("Using Groq backend");
            Ok(Arc::new(GroqClient::new(api_key)?))
        }
    }
}

#[cfg(not(feature = "ai"))]
fn build_client(_args: &Args) -> Result<Arc<dyn CompletionClient>> {
    Err(anyhow!(
        "No completion backend compiled in. Compile with --features ai."
    ))
}

fn list_models(args: &Args) -> Result<()> {
    if args.provider != CliProvider::Ollama {
        println!("Model listing is only available for the Ollama backend.");
        return Ok(());
    }

    let client = build_client(args)?;
    let models = client.list_models();

    if models.is_empty() {
        println!(
            "No models found. Is Ollama running at {}? Try `ollama pull llama2`.",
            args.ollama_url
        );
    } else {
        for model in models {
            println!("{}", model);
        }
    }
    Ok(())
}

/// Build the job context from either a reference file or an inferred schema.
fn resolve_job(
    args: &Args,
    rows: &[Row],
    client: &dyn CompletionClient,
    config: &ConverterConfig,
) -> Result<JobContext> {
    let model = args.model.clone().unwrap_or_default();

    if let Some(ref schema_path) = args.schema {
        let schema = SchemaExtractor::extract(schema_path)?;
        if schema.is_empty() {
            return Err(ConversionError::EmptySchema
                .with_context(format!("Reference file '{}'", schema_path))
                .into());
        }
        info!("Target schema: {:?}", schema.keys());
        return Ok(JobContext::with_schema(schema).with_model(model));
    }

    let proposal = SchemaInference::new(client)
        .with_sample_rows(config.schema_sample_rows)
        .propose(rows, &model)?;

    // The proposal goes to stderr so --json keeps stdout clean.
    eprintln!("Proposed schema:");
    eprintln!("{}", serde_json::to_string_pretty(proposal.schema())?);

    let job = JobContext::from_state(proposal).with_model(model);
    if args.yes || confirm_on_stdin("Use this schema?")? {
        Ok(job.confirm_schema())
    } else {
        Err(ConversionError::SchemaNotConfirmed.into())
    }
}

fn confirm_on_stdin(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn build_pipeline(
    args: &Args,
    client: Arc<dyn CompletionClient>,
    config: ConverterConfig,
) -> Result<ConversionPipeline> {
    let mut builder = ConversionPipeline::builder().client(client).config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn handle_run_output(
    run: &ConversionRun,
    input: &str,
    config: &ConverterConfig,
    args: &Args,
) -> Result<()> {
    let writer = ReportWriter::from_config(config);
    let output_path = writer.write_results(&run.results)?;
    let output_path = output_path.display().to_string();

    let classification = ResultClassifier::new(config.null_density_threshold).classify(&run.results);
    let report = ReportWriter::build_classification_report(
        input,
        Some(&output_path),
        run,
        &classification,
    );

    if args.emit_report {
        writer.write_report_to_file(&report, &extract_file_stem(input))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human_readable_summary(&report);
    }

    Ok(())
}

fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input")
        .to_string()
}

/// Note: uses `println!` on purpose; the summary is the command's result and
/// must show regardless of log level.
fn print_human_readable_summary(report: &ClassificationReport<'_>) {
    println!("\n{}", "=".repeat(80));
    println!("CONVERSION SUMMARY");
    println!("{}", "=".repeat(80));
    println!("  Input: {}", report.input_file);
    if let Some(ref output) = report.output_file {
        println!("  Output: {}", output);
    }
    println!(
        "  Rows: {} converted of {}{}",
        report.summary.total,
        report.total_rows,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!("  Valid: {}", report.summary.valid);
    println!("  Flagged: {}", report.summary.flagged);

    if report.flagged.is_empty() {
        println!("\nAll records look good.");
        return;
    }

    println!("\nFLAGGED FOR REVIEW");
    println!("{}", "-".repeat(40));
    for entry in &report.flagged {
        let data = serde_json::to_string(entry.data).unwrap_or_default();
        println!("  Row {}: {}", entry.index, entry.reason);
        println!("    {}", data);
    }
}
