//! ONNX engine adapter over `pure-onnx-ocr`, gated behind the `onnx`
//! feature. Pure Rust, no external ONNX Runtime.

use std::path::Path;

use image::{DynamicImage, GrayImage};

use super::engine::{EngineAdapter, EngineClass, EngineOutput};
use crate::error::EngineError;
use crate::models::config::InvoxConfig;

/// Secondary-class adapter: runs once against the unmodified grayscale
/// raster rather than per preprocessing variant.
pub struct OnnxEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl OnnxEngine {
    /// Capability probe: the engine is available iff the model files exist
    /// and the engine builder accepts them.
    pub fn probe(config: &InvoxConfig) -> Result<Self, EngineError> {
        let det = config.model_path(&config.models.detection_model);
        let rec = config.model_path(&config.models.recognition_model);
        let dict = config.model_path(&config.models.dictionary);

        if !det.exists() || !rec.exists() {
            return Err(EngineError::NotAvailable(format!(
                "model files missing under {}",
                config.models.model_dir.display()
            )));
        }
        Self::from_paths(&det, &rec, &dict)
    }

    fn from_paths(det: &Path, rec: &Path, dict: &Path) -> Result<Self, EngineError> {
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(det)
            .rec_model_path(rec)
            .dictionary_path(dict)
            .build()
            .map_err(|e| EngineError::NotAvailable(format!("pure-onnx-ocr: {e}")))?;
        Ok(Self { engine })
    }
}

impl EngineAdapter for OnnxEngine {
    fn id(&self) -> &str {
        "onnx"
    }

    fn class(&self) -> EngineClass {
        EngineClass::Secondary
    }

    fn recognize(&self, image: &GrayImage) -> Result<EngineOutput, EngineError> {
        let dynamic = DynamicImage::ImageLuma8(image.clone());
        let results = self
            .engine
            .run_from_image(&dynamic)
            .map_err(|e| EngineError::Recognition(format!("pure-onnx-ocr: {e}")))?;

        let mut lines = Vec::with_capacity(results.len());
        let mut token_confidences = Vec::with_capacity(results.len());
        for r in &results {
            lines.push(r.text.replace("[UNK]", " "));
            token_confidences.push(r.confidence);
        }

        Ok(EngineOutput {
            text: lines.join("\n"),
            token_confidences,
        })
    }
}
