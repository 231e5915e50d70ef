//! Error types for the invox-core library.

use thiserror::Error;

/// Main error type for the invox library.
#[derive(Error, Debug)]
pub enum InvoxError {
    /// Rasterization error.
    #[error("raster error: {0}")]
    Raster(#[from] RasterError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to rasterizing paged documents.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The declared format cannot be rasterized by any available backend.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Failed to open/parse the document.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// The document is encrypted and cannot be processed.
    #[error("document is encrypted")]
    Encrypted,

    /// The document is empty or has no pages.
    #[error("document has no pages")]
    NoPages,

    /// No raster image could be produced for the page.
    #[error("no raster image found on page {0}")]
    NoImage(u32),

    /// Failed to persist the rasterized page.
    #[error("failed to write raster artifact: {0}")]
    Artifact(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Invalid image data or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No recognition engine passed its capability probe at startup.
    #[error("no OCR engine available")]
    NoEngineAvailable,

    /// A single engine run failed. Non-fatal: the run is skipped.
    #[error("engine {engine} failed: {source}")]
    Engine {
        engine: String,
        #[source]
        source: EngineError,
    },
}

/// Errors reported by an individual engine adapter.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The adapter's backing engine is not usable in this process.
    #[error("engine not available: {0}")]
    NotAvailable(String),

    /// Failed to encode the raster buffer for the engine.
    #[error("image encode error: {0}")]
    ImageEncode(String),

    /// The engine ran but recognition failed.
    #[error("recognition failed: {0}")]
    Recognition(String),
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, InvoxError>;
