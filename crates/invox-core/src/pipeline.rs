//! Pipeline orchestration: sequences rasterization, preprocessing,
//! multi-engine extraction, structured extraction, validation, and
//! confidence aggregation, and always returns a result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use image::DynamicImage;
use tracing::{info, warn};

use crate::document::DocumentSource;
use crate::error::{OcrError, RasterError, Result};
use crate::extract::{
    FieldExtractor, GstDetails, LineItemParser, Validator, clean_text, field_catalog,
    summarize_extraction,
};
use crate::models::config::InvoxConfig;
use crate::models::result::{
    ConfidenceLevel, FieldValue, InvoiceData, LineItem, OcrResults, OcrSummary,
    ProcessingReport, ProcessingResult, ProcessingStatus, ValidationReport,
};
use crate::ocr::{EngineRegistry, ExtractionResult, ImagePreprocessor, MultiEngineExtractor};
use crate::raster::{PdfRasterizer, RasterizerBackend, TempRaster};

const OCR_WEIGHT: f32 = 0.4;
const COMPLETENESS_WEIGHT: f32 = 0.3;
const VALIDATION_WEIGHT: f32 = 0.2;
const LINE_ITEM_WEIGHT: f32 = 0.1;

/// The document-understanding pipeline.
///
/// All collaborators - engine registry, pattern catalog, preprocessor,
/// rasterizer - are injected at construction and shared immutably across
/// invocations. `process` is a blocking call; each invocation owns its
/// intermediate buffers exclusively.
pub struct InvoicePipeline {
    registry: Arc<EngineRegistry>,
    multi: MultiEngineExtractor,
    preprocessor: ImagePreprocessor,
    rasterizer: Option<Box<dyn RasterizerBackend>>,
    fields: FieldExtractor,
    line_items: LineItemParser,
    validator: Validator,
    confidence_floor: f32,
    failure_confidence: f32,
}

impl InvoicePipeline {
    /// Pipeline with default configuration and the standard rule catalog.
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self::with_config(registry, &InvoxConfig::default())
    }

    pub fn with_config(registry: Arc<EngineRegistry>, config: &InvoxConfig) -> Self {
        Self {
            multi: MultiEngineExtractor::new(registry.clone())
                .with_max_audit_results(config.ocr.max_audit_results),
            preprocessor: ImagePreprocessor::new()
                .with_max_size(config.ocr.max_image_size)
                .with_deskew_min_foreground(config.ocr.deskew_min_foreground),
            rasterizer: Some(Box::new(PdfRasterizer::new().with_zoom(config.raster.zoom))),
            fields: FieldExtractor::new(field_catalog()),
            line_items: LineItemParser::new().with_max_items(config.extraction.max_line_items),
            validator: Validator::new(),
            confidence_floor: config.extraction.confidence_floor,
            failure_confidence: config.extraction.failure_confidence,
            registry,
        }
    }

    /// Replace or remove the rasterizer capability. Without one, paged
    /// inputs fail with `UnsupportedFormat`.
    pub fn with_rasterizer(mut self, rasterizer: Option<Box<dyn RasterizerBackend>>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Replace the field-rule catalog.
    pub fn with_catalog(mut self, catalog: Vec<crate::extract::FieldRule>) -> Self {
        self.fields = FieldExtractor::new(catalog);
        self
    }

    /// Process one document. Always returns a `ProcessingResult`: any
    /// internal error is caught here and reported as a `failed` record.
    pub fn process(&self, document: &dyn DocumentSource) -> ProcessingResult {
        let start = Instant::now();
        info!(
            "Processing {} document ({} bytes)",
            document.format(),
            document.bytes().len()
        );

        match self.run(document, start) {
            Ok(result) => result,
            Err(e) => {
                warn!("Pipeline failed: {}", e);
                ProcessingResult::failed(
                    e.to_string(),
                    self.failure_confidence,
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }

    fn run(&self, document: &dyn DocumentSource, start: Instant) -> Result<ProcessingResult> {
        if self.registry.is_empty() {
            return Err(OcrError::NoEngineAvailable.into());
        }

        // Rasterize or decode. The temp artifact, when one exists, lives
        // until the end of this invocation.
        let mut _temp: Option<TempRaster> = None;
        let decoded: Option<DynamicImage> = if document.format().is_paged() {
            let rasterizer = self.rasterizer.as_ref().ok_or_else(|| {
                RasterError::UnsupportedFormat(document.format().to_string())
            })?;
            match rasterizer.rasterize_first_page(document.bytes()) {
                Ok(temp) => {
                    let image = temp.image().clone();
                    _temp = Some(temp);
                    Some(image)
                }
                Err(e @ (RasterError::NoPages | RasterError::Encrypted)) => {
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Rasterization failed, degrading: {}", e);
                    None
                }
            }
        } else {
            match ImagePreprocessor::decode(document.bytes()) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Image decode failed, degrading to fallback variant: {}", e);
                    None
                }
            }
        };

        // Preprocess; an unusable raster degrades to the single fallback
        // variant instead of aborting.
        let variants = match &decoded {
            Some(image) => self.preprocessor.variants(image),
            None => vec![self.preprocessor.fallback_variant(None)],
        };
        let raw_gray = match &decoded {
            Some(image) => self.preprocessor.grayscale(image),
            None => variants[0].image.clone(),
        };

        let extraction = self.multi.extract(&variants, &raw_gray);

        // Structured extraction over the best text.
        let cleaned = clean_text(&extraction.best_text);
        let fields = self.fields.extract(&cleaned);
        let line_items = self.line_items.parse(&cleaned);
        let validation = self.validator.validate(&fields, &line_items);
        let summary = summarize_extraction(&fields, &line_items);

        let gst_details = fields
            .get("gstin")
            .and_then(FieldValue::as_text)
            .map(GstDetails::parse);

        let overall_confidence =
            self.overall_confidence(&extraction, &fields, &validation, &line_items);
        let recommendations = self.recommendations(&fields, &line_items, &validation, &summary);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        Ok(ProcessingResult {
            processing_report: ProcessingReport {
                ocr_summary: OcrSummary {
                    engines_used: extraction.engines_tried,
                    best_engine: extraction.best_engine.clone(),
                    text_length: extraction.best_text.chars().count(),
                    confidence: extraction.best_confidence,
                },
                extraction_summary: summary.clone(),
                validation_summary: validation.clone(),
                recommendations,
                processing_time_ms,
                errors: Vec::new(),
            },
            ocr_results: OcrResults {
                text: extraction.best_text,
                confidence: extraction.best_confidence,
                engine_used: extraction.best_engine,
                engines_tried: extraction.engines_tried,
                all_results: extraction.all_results,
            },
            invoice_data: InvoiceData {
                fields,
                line_items,
                extraction_summary: summary,
                validation_results: validation,
            },
            gst_details,
            overall_confidence,
            processing_status: ProcessingStatus::Success,
            timestamp: Utc::now(),
        })
    }

    /// Weighted blend of OCR quality, field completeness, validation
    /// outcome, and line-item presence, clamped to [0, 1]. Never exactly
    /// zero while extracted text is non-empty.
    fn overall_confidence(
        &self,
        extraction: &ExtractionResult,
        fields: &BTreeMap<String, FieldValue>,
        validation: &ValidationReport,
        line_items: &[LineItem],
    ) -> f32 {
        let catalog_len = self.fields.catalog_len().max(1);
        let completeness = fields.len() as f32 / catalog_len as f32;
        let validation_score = if validation.is_valid_invoice { 1.0 } else { 0.5 };
        let line_item_presence = if line_items.is_empty() { 0.3 } else { 0.8 };

        let overall = (extraction.best_confidence * OCR_WEIGHT
            + completeness * COMPLETENESS_WEIGHT
            + validation_score * VALIDATION_WEIGHT
            + line_item_presence * LINE_ITEM_WEIGHT)
            .clamp(0.0, 1.0);

        if overall == 0.0 && !extraction.best_text.trim().is_empty() {
            return self.confidence_floor.max(extraction.best_confidence);
        }
        overall
    }

    fn recommendations(
        &self,
        fields: &BTreeMap<String, FieldValue>,
        line_items: &[LineItem],
        validation: &ValidationReport,
        summary: &crate::models::result::ExtractionSummary,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if !fields.contains_key("vendor_name") {
            recommendations.push(
                "Consider scanning a clearer image to extract vendor information".to_string(),
            );
        }
        if !fields.contains_key("gstin") {
            recommendations.push(
                "GST number not found - ensure the invoice contains visible GST information"
                    .to_string(),
            );
        }
        if line_items.is_empty() {
            recommendations
                .push("Line items not detected - try scanning with better lighting".to_string());
        }
        for warning in &validation.warnings {
            recommendations.push(format!("Data validation: {warning}"));
        }
        if summary.confidence_level == ConfidenceLevel::Low {
            recommendations.push(
                "Low extraction confidence - consider rescanning with higher resolution"
                    .to_string(),
            );
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentFormat, DocumentImage};
    use crate::error::EngineError;
    use crate::ocr::{EngineAdapter, EngineClass, EngineOutput, StaticEngine};
    use image::{GrayImage, ImageBuffer, Luma};
    use rust_decimal::Decimal;
    use std::io::Cursor;
    use std::str::FromStr;

    const SAMPLE_INVOICE: &str = "\
GSTIN: 27AAPCS1234F1Z5
ACME TRADING CO
12 Industrial Area, Pune City
Phone: 9876543210, Pune
Invoice No: INV-2024/001A
Date: 15/01/2024.
------------------------
------------------------
Widget Alpha
1001 Qty: 2 Rate: 100.00 INR
Widget Beta
1002 Qty: 1 Rate: 150.00 INR
Widget Gamma
1003 Qty: 3 Rate: 50.00 INR
Subtotal: 500.00 INR
Tax: 90.00 INR
Total: 590.00 INR";

    struct FailingEngine;

    impl EngineAdapter for FailingEngine {
        fn id(&self) -> &str {
            "failing"
        }

        fn class(&self) -> EngineClass {
            EngineClass::Primary
        }

        fn recognize(
            &self,
            _image: &GrayImage,
        ) -> std::result::Result<EngineOutput, EngineError> {
            Err(EngineError::Recognition("simulated failure".to_string()))
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline_with(adapters: Vec<Arc<dyn EngineAdapter>>) -> InvoicePipeline {
        let mut registry = EngineRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        InvoicePipeline::new(Arc::new(registry))
    }

    fn sample_pipeline() -> InvoicePipeline {
        pipeline_with(vec![Arc::new(StaticEngine::new("static", SAMPLE_INVOICE, 0.9))])
    }

    fn png_document() -> DocumentImage {
        DocumentImage::new(tiny_png(), DocumentFormat::Png)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn end_to_end_sample_invoice() {
        let result = sample_pipeline().process(&png_document());

        assert_eq!(result.processing_status, ProcessingStatus::Success);
        let data = &result.invoice_data;
        assert!(data.validation_results.is_valid_invoice);
        assert!(data.validation_results.warnings.is_empty());

        assert_eq!(data.text_field("vendor_name"), Some("ACME TRADING CO"));
        assert_eq!(data.text_field("invoice_number"), Some("INV-2024/001A"));
        assert_eq!(data.text_field("date"), Some("2024-01-15"));
        assert_eq!(data.amount_field("subtotal"), Some(dec("500.00")));
        assert_eq!(data.amount_field("tax_amount"), Some(dec("90.00")));
        assert_eq!(data.amount_field("total_amount"), Some(dec("590.00")));

        assert_eq!(data.line_items.len(), 3);
        let total: Decimal = data.line_items.iter().map(|i| i.amount).sum();
        assert_eq!(total, dec("500.00"));

        let gst = result.gst_details.as_ref().unwrap();
        assert!(gst.is_valid);
        assert_eq!(gst.state_code.as_deref(), Some("27"));

        assert!(data.extraction_summary.has_vendor_info);
        assert!(data.extraction_summary.has_amounts);
        assert!(data.extraction_summary.has_tax_info);
        assert_eq!(data.extraction_summary.line_items_count, 3);
    }

    #[test]
    fn perturbed_line_item_amount_warns_without_invalidating() {
        let perturbed = SAMPLE_INVOICE.replace("Rate: 50.00", "Rate: 60.00");
        let pipeline =
            pipeline_with(vec![Arc::new(StaticEngine::new("static", perturbed, 0.9))]);
        let result = pipeline.process(&png_document());

        let validation = &result.invoice_data.validation_results;
        assert!(validation.is_valid_invoice);
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].contains("Line items total"));
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn overall_confidence_is_bounded_and_nonzero_with_text() {
        for confidence in [0.0f32, 0.3, 0.9, 1.0] {
            let pipeline = pipeline_with(vec![Arc::new(StaticEngine::new(
                "static",
                "hello world",
                confidence,
            ))]);
            let result = pipeline.process(&png_document());
            assert!(result.overall_confidence > 0.0);
            assert!(result.overall_confidence <= 1.0);
        }
    }

    #[test]
    fn failing_adapter_is_survived_by_the_other() {
        let pipeline = pipeline_with(vec![
            Arc::new(FailingEngine),
            Arc::new(StaticEngine::secondary("backup", SAMPLE_INVOICE, 0.8)),
        ]);
        let result = pipeline.process(&png_document());

        assert_eq!(result.processing_status, ProcessingStatus::Success);
        assert_eq!(result.ocr_results.engine_used, "backup");
        // Attempts are counted even for runs that failed: the four variant
        // runs of the failing primary plus the secondary run.
        assert_eq!(result.ocr_results.engines_tried, 5);
    }

    #[test]
    fn no_engine_available_fails_fast() {
        let pipeline = pipeline_with(vec![]);
        let result = pipeline.process(&png_document());

        assert_eq!(result.processing_status, ProcessingStatus::Failed);
        assert_eq!(result.overall_confidence, 0.1);
        assert!(
            result.processing_report.errors[0].contains("no OCR engine available"),
            "errors were {:?}",
            result.processing_report.errors
        );
    }

    #[test]
    fn paged_input_without_rasterizer_is_unsupported() {
        let pipeline = sample_pipeline().with_rasterizer(None);
        let document = DocumentImage::new(b"%PDF-1.4".to_vec(), DocumentFormat::Pdf);
        let result = pipeline.process(&document);

        assert_eq!(result.processing_status, ProcessingStatus::Failed);
        assert!(result.processing_report.errors[0].contains("unsupported document format"));
    }

    #[test]
    fn undecodable_image_degrades_instead_of_failing() {
        let pipeline = sample_pipeline();
        let document = DocumentImage::new(b"not an image at all".to_vec(), DocumentFormat::Png);
        let result = pipeline.process(&document);

        // The blank fallback raster keeps the pipeline alive; the static
        // engine still recognizes the sample text.
        assert_eq!(result.processing_status, ProcessingStatus::Success);
        assert!(result.invoice_data.validation_results.is_valid_invoice);
    }

    #[test]
    fn repeated_invocations_are_idempotent() {
        let pipeline = sample_pipeline();
        let document = png_document();

        let first = pipeline.process(&document);
        let second = pipeline.process(&document);

        assert_eq!(first.invoice_data, second.invoice_data);
        assert_eq!(first.overall_confidence, second.overall_confidence);
        assert_eq!(first.ocr_results.engine_used, second.ocr_results.engine_used);
    }

    #[test]
    fn recommendations_follow_missing_data() {
        // Digits only: nothing for the vendor, identifier, or line-item
        // rules to latch onto.
        let pipeline =
            pipeline_with(vec![Arc::new(StaticEngine::new("static", "123 456 789 x", 0.2))]);
        let result = pipeline.process(&png_document());

        let recommendations = &result.processing_report.recommendations;
        assert!(recommendations.iter().any(|r| r.contains("vendor")));
        assert!(recommendations.iter().any(|r| r.contains("GST number")));
        assert!(recommendations.iter().any(|r| r.contains("Line items")));
    }
}
