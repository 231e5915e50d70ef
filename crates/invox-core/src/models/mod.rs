//! Configuration and output data models.

pub mod config;
pub mod result;

pub use config::{ExtractionConfig, InvoxConfig, ModelConfig, OcrConfig, RasterConfig};
pub use result::{
    ConfidenceLevel, EngineResult, ExtractionSummary, FieldValue, InvoiceData, LineItem,
    OcrResults, OcrSummary, ProcessingReport, ProcessingResult, ProcessingStatus,
    ValidationReport,
};
