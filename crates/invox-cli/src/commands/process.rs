//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use invox_core::models::result::{ProcessingResult, ProcessingStatus};
use invox_core::{DocumentImage, EngineRegistry, InvoicePipeline};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let registry = Arc::new(EngineRegistry::discover(&config));
    if registry.is_empty() {
        warn!(
            "No OCR engines available - build with --features tesseract or \
             provide ONNX models via --features onnx"
        );
    }
    let pipeline = InvoicePipeline::with_config(registry, &config);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    pb.set_message("Loading document...");
    pb.set_position(10);
    let document = DocumentImage::from_path(&args.input)?;

    pb.set_message("Running pipeline...");
    pb.set_position(40);
    let result = pipeline.process(&document);

    pb.set_position(100);
    pb.finish_with_message("Done");

    if result.processing_status == ProcessingStatus::Failed {
        eprintln!("{}", style("Processing failed:").red());
        for error in &result.processing_report.errors {
            eprintln!("  - {error}");
        }
    }

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{output}");
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Overall confidence: {:.1}%",
            style("ℹ").blue(),
            result.overall_confidence * 100.0
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            result.processing_report.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_result(result: &ProcessingResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

pub fn status_label(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Success => "success",
        ProcessingStatus::Failed => "failed",
    }
}

fn format_csv(result: &ProcessingResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let data = &result.invoice_data;

    wtr.write_record([
        "invoice_number",
        "date",
        "vendor_name",
        "gstin",
        "subtotal",
        "tax_amount",
        "total_amount",
        "line_items",
        "is_valid",
        "confidence",
        "status",
    ])?;

    let text = |name: &str| data.text_field(name).unwrap_or_default().to_string();
    let amount = |name: &str| {
        data.amount_field(name)
            .map(|d| d.to_string())
            .unwrap_or_default()
    };

    let record = vec![
        text("invoice_number"),
        text("date"),
        text("vendor_name"),
        text("gstin"),
        amount("subtotal"),
        amount("tax_amount"),
        amount("total_amount"),
        data.line_items.len().to_string(),
        data.validation_results.is_valid_invoice.to_string(),
        format!("{:.2}", result.overall_confidence),
        status_label(result.processing_status).to_string(),
    ];
    wtr.write_record(&record)?;

    let csv = String::from_utf8(wtr.into_inner()?)?;
    Ok(csv)
}

fn format_text(result: &ProcessingResult) -> String {
    let data = &result.invoice_data;
    let mut output = String::new();

    output.push_str(&format!(
        "Status: {}\n",
        status_label(result.processing_status)
    ));
    output.push_str(&format!(
        "Invoice: {}\n",
        data.text_field("invoice_number").unwrap_or("-")
    ));
    output.push_str(&format!("Date: {}\n", data.text_field("date").unwrap_or("-")));
    output.push_str(&format!(
        "Vendor: {}\n",
        data.text_field("vendor_name").unwrap_or("-")
    ));
    if let Some(gstin) = data.text_field("gstin") {
        output.push_str(&format!("GSTIN: {gstin}\n"));
    }
    output.push('\n');

    output.push_str("Amounts:\n");
    for name in ["subtotal", "tax_amount", "total_amount"] {
        if let Some(amount) = data.amount_field(name) {
            output.push_str(&format!("  {name}: {amount}\n"));
        }
    }

    if !data.line_items.is_empty() {
        output.push('\n');
        output.push_str(&format!("Line items ({}):\n", data.line_items.len()));
        for item in &data.line_items {
            output.push_str(&format!(
                "  {} x {} @ {} = {}\n",
                item.quantity, item.description, item.rate, item.amount
            ));
        }
    }

    let validation = &data.validation_results;
    if !validation.errors.is_empty() || !validation.warnings.is_empty() {
        output.push('\n');
        for error in &validation.errors {
            output.push_str(&format!("error: {error}\n"));
        }
        for warning in &validation.warnings {
            output.push_str(&format!("warning: {warning}\n"));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Overall confidence: {:.1}%\n",
        result.overall_confidence * 100.0
    ));
    output
}
