//! OCR stage: preprocessing, engine adapters, and multi-engine selection.

mod engine;
mod multi;
mod preprocessing;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use engine::{EngineAdapter, EngineClass, EngineOutput, EngineRegistry, StaticEngine};
pub use multi::{ExtractionResult, MultiEngineExtractor, selection_score};
pub use preprocessing::{ImagePreprocessor, PreprocessedVariant, Technique, binarize_otsu};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEngine;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;
