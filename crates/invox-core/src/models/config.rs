//! Configuration structures for the processing pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the invox pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoxConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF rasterization configuration.
    pub raster: RasterConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Model configuration for the ONNX engine.
    pub models: ModelConfig,
}

impl Default for InvoxConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            raster: RasterConfig::default(),
            extraction: ExtractionConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

/// OCR and preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Minimum foreground pixel count for the deskew variant to be produced.
    pub deskew_min_foreground: u32,

    /// Maximum engine results retained for audit in the extraction output.
    pub max_audit_results: usize,

    /// Tesseract language code.
    pub tesseract_lang: String,

    /// Path to tessdata, if not the system default.
    pub tessdata_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_image_size: 2048,
            deskew_min_foreground: 100,
            max_audit_results: 10,
            tesseract_lang: "eng".to_string(),
            tessdata_path: None,
        }
    }
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Zoom factor applied to the extracted page raster.
    pub zoom: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { zoom: 2.0 }
    }
}

/// Field and line-item extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum line items retained per invoice.
    pub max_line_items: usize,

    /// Minimum overall confidence substituted when extracted text is
    /// non-empty but the computed score would be zero.
    pub confidence_floor: f32,

    /// Fixed confidence reported for failed invocations.
    pub failure_confidence: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_line_items: 15,
            confidence_floor: 0.15,
            failure_confidence: 0.1,
        }
    }
}

/// Model file paths for the ONNX engine adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            dictionary: "dict.txt".to_string(),
        }
    }
}

impl InvoxConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = InvoxConfig::default();
        assert_eq!(config.ocr.max_image_size, 2048);
        assert_eq!(config.ocr.deskew_min_foreground, 100);
        assert_eq!(config.raster.zoom, 2.0);
        assert_eq!(config.extraction.max_line_items, 15);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: InvoxConfig =
            serde_json::from_str(r#"{"raster": {"zoom": 3.0}}"#).unwrap();
        assert_eq!(config.raster.zoom, 3.0);
        assert_eq!(config.ocr.max_image_size, 2048);
    }
}
