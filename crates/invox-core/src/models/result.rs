//! Output data model: the record handed back for every processed document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extract::gstin::GstDetails;

/// Terminal status of a pipeline invocation.
///
/// Validation failure is not processing failure: an invoice that fails
/// validation is still `Success`. Only pipeline-internal errors yield
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Success,
    Failed,
}

/// One engine run retained for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    /// Engine identifier, e.g. `tesseract_denoised`.
    pub engine: String,
    /// Raw recognized text.
    pub text: String,
    /// Mean confidence in [0, 1].
    pub confidence: f32,
    pub word_count: usize,
    pub char_count: usize,
}

/// Best-text selection plus the audit trail of every engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResults {
    pub text: String,
    pub confidence: f32,
    pub engine_used: String,
    /// Runs attempted, not runs that succeeded.
    pub engines_tried: usize,
    pub all_results: Vec<EngineResult>,
}

impl Default for OcrResults {
    fn default() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            engine_used: "none".to_string(),
            engines_tried: 0,
            all_results: Vec::new(),
        }
    }
}

/// A typed extracted attribute derived from one pattern match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Currency amount.
    Amount(Decimal),
    /// Normalized `YYYY-MM-DD` date, or the raw string when unparsable.
    Date(String),
    /// Free-form text capture.
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => Some(s),
            FieldValue::Amount(_) => None,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            FieldValue::Amount(d) => Some(*d),
            _ => None,
        }
    }
}

/// A single billed entry on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsn_code: Option<String>,
}

/// Cross-field consistency report. Always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid_invoice: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            is_valid_invoice: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Coarse extraction quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Summary statistics over the extracted fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub fields_extracted: usize,
    pub has_vendor_info: bool,
    pub has_amounts: bool,
    pub has_tax_info: bool,
    pub has_line_items: bool,
    pub line_items_count: usize,
    pub confidence_level: ConfidenceLevel,
}

impl Default for ExtractionSummary {
    fn default() -> Self {
        Self {
            fields_extracted: 0,
            has_vendor_info: false,
            has_amounts: false,
            has_tax_info: false,
            has_line_items: false,
            line_items_count: 0,
            confidence_level: ConfidenceLevel::Low,
        }
    }
}

/// All structured data extracted from the best OCR text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Extracted field map, keyed by rule name. Ordered for deterministic
    /// serialization.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    pub line_items: Vec<LineItem>,
    pub extraction_summary: ExtractionSummary,
    pub validation_results: ValidationReport,
}

impl InvoiceData {
    /// Text value of a field, if present and textual.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Amount value of a field, if present and numeric.
    pub fn amount_field(&self, name: &str) -> Option<Decimal> {
        self.fields.get(name).and_then(FieldValue::as_amount)
    }
}

/// Summary of the OCR stage for the processing report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrSummary {
    pub engines_used: usize,
    #[serde(default)]
    pub best_engine: String,
    pub text_length: usize,
    pub confidence: f32,
}

/// Detailed report of one pipeline invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub ocr_summary: OcrSummary,
    pub extraction_summary: ExtractionSummary,
    pub validation_summary: ValidationReport,
    pub recommendations: Vec<String>,
    pub processing_time_ms: u64,
    /// Error descriptions for failed invocations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// The record returned for every processed document. The pipeline always
/// returns one of these - never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub ocr_results: OcrResults,
    pub invoice_data: InvoiceData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_details: Option<GstDetails>,
    pub overall_confidence: f32,
    pub processing_report: ProcessingReport,
    pub processing_status: ProcessingStatus,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingResult {
    /// Terminal result for an invocation that hit an internal error.
    pub fn failed(error: String, failure_confidence: f32, processing_time_ms: u64) -> Self {
        Self {
            ocr_results: OcrResults::default(),
            invoice_data: InvoiceData::default(),
            gst_details: None,
            overall_confidence: failure_confidence,
            processing_report: ProcessingReport {
                errors: vec![error],
                processing_time_ms,
                ..ProcessingReport::default()
            },
            processing_status: ProcessingStatus::Failed,
            timestamp: Utc::now(),
        }
    }
}
