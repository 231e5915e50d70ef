//! Core library for invoice and receipt understanding.
//!
//! This crate provides:
//! - PDF page-1 rasterization with scoped temp artifacts
//! - Multi-variant image preprocessing for OCR
//! - Pluggable recognition engines behind a startup capability registry
//! - Multi-engine extraction with quality-based selection
//! - Pattern-catalog field extraction (GST identifiers, amounts, dates)
//! - Heuristic line-item parsing, validation, and confidence aggregation
//!
//! The entry point is [`InvoicePipeline::process`], a blocking call that
//! always returns a [`ProcessingResult`], never an error.

pub mod document;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod raster;

pub use document::{DocumentFormat, DocumentImage, DocumentSource};
pub use error::{EngineError, InvoxError, OcrError, RasterError, Result};
pub use extract::{
    FieldExtractor, FieldRule, GstDetails, LineItemParser, Validator, field_catalog,
};
pub use models::config::InvoxConfig;
pub use models::result::{
    EngineResult, FieldValue, InvoiceData, LineItem, ProcessingResult, ProcessingStatus,
    ValidationReport,
};
pub use ocr::{
    EngineAdapter, EngineClass, EngineOutput, EngineRegistry, ExtractionResult,
    ImagePreprocessor, MultiEngineExtractor, StaticEngine,
};
pub use pipeline::InvoicePipeline;
pub use raster::{PdfRasterizer, RasterizerBackend, TempRaster};

#[cfg(feature = "onnx")]
pub use ocr::OnnxEngine;
#[cfg(feature = "tesseract")]
pub use ocr::TesseractEngine;
