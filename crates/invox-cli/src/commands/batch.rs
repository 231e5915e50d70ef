//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use invox_core::models::result::{ProcessingResult, ProcessingStatus};
use invox_core::{DocumentImage, EngineRegistry, InvoicePipeline};

use super::load_config;
use super::process::{OutputFormat, format_result, status_label};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of processing a single file.
struct FileOutcome {
    path: PathBuf,
    result: Option<ProcessingResult>,
    error: Option<String>,
}

impl FileOutcome {
    fn succeeded(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| r.processing_status == ProcessingStatus::Success)
    }

    fn failure_description(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let result = self.result.as_ref()?;
        if result.processing_status == ProcessingStatus::Failed {
            return Some(
                result
                    .processing_report
                    .errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "processing failed".to_string()),
            );
        }
        None
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(
                ext.to_lowercase().as_str(),
                "pdf" | "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp"
            )
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let registry = Arc::new(EngineRegistry::discover(&config));
    let pipeline = InvoicePipeline::with_config(registry, &config);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut outcomes = Vec::with_capacity(files.len());
    for path in files {
        let outcome = match DocumentImage::from_path(&path) {
            Ok(document) => FileOutcome {
                result: Some(pipeline.process(&document)),
                error: None,
                path: path.clone(),
            },
            Err(e) => FileOutcome {
                result: None,
                error: Some(e.to_string()),
                path: path.clone(),
            },
        };

        if let Some(description) = outcome.failure_description() {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", path.display(), description);
            } else {
                anyhow::bail!("Processing failed for {}: {}", path.display(), description);
            }
        }

        outcomes.push(outcome);
        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    // Per-file outputs.
    if let Some(ref output_dir) = args.output_dir {
        for outcome in &outcomes {
            let Some(result) = &outcome.result else {
                continue;
            };
            let output_name = outcome
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let extension = match args.format {
                OutputFormat::Json => "json",
                OutputFormat::Csv => "csv",
                OutputFormat::Text => "txt",
            };
            let output_path = output_dir.join(format!("{output_name}.{extension}"));
            fs::write(&output_path, format_result(result, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));
        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = outcomes.iter().filter(|o| o.succeeded()).count();
    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| !o.succeeded()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in failed {
            println!(
                "  - {}: {}",
                outcome.path.display(),
                outcome
                    .failure_description()
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    Ok(())
}

fn write_summary(path: &PathBuf, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "date",
        "vendor_name",
        "gstin",
        "total_amount",
        "confidence",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let record = match &outcome.result {
            Some(result) => {
                let data = &result.invoice_data;
                vec![
                    filename,
                    status_label(result.processing_status).to_string(),
                    data.text_field("invoice_number").unwrap_or_default().to_string(),
                    data.text_field("date").unwrap_or_default().to_string(),
                    data.text_field("vendor_name").unwrap_or_default().to_string(),
                    data.text_field("gstin").unwrap_or_default().to_string(),
                    data.amount_field("total_amount")
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    format!("{:.2}", result.overall_confidence),
                    result.processing_report.processing_time_ms.to_string(),
                    outcome.failure_description().unwrap_or_default(),
                ]
            }
            None => vec![
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                outcome.failure_description().unwrap_or_default(),
            ],
        };
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
