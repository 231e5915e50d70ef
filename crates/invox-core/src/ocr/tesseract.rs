//! Tesseract engine adapter, gated behind the `tesseract` feature.
//!
//! Requires system libtesseract and libleptonica.

use std::io::Cursor;

use image::{DynamicImage, GrayImage};
use leptess::LepTess;

use super::engine::{EngineAdapter, EngineClass, EngineOutput};
use crate::error::EngineError;
use crate::models::config::OcrConfig;

/// Primary-class adapter over Tesseract via leptess.
pub struct TesseractEngine {
    data_path: Option<String>,
    lang: String,
}

impl TesseractEngine {
    pub fn new(data_path: Option<String>, lang: &str) -> Self {
        Self {
            data_path,
            lang: lang.to_string(),
        }
    }

    /// Capability probe: the engine is available iff a Tesseract instance
    /// can be constructed for the configured language.
    pub fn probe(config: &OcrConfig) -> Result<Self, EngineError> {
        let engine = Self::new(config.tessdata_path.clone(), &config.tesseract_lang);
        LepTess::new(engine.data_path.as_deref(), &engine.lang)
            .map_err(|e| EngineError::NotAvailable(e.to_string()))?;
        Ok(engine)
    }
}

impl EngineAdapter for TesseractEngine {
    fn id(&self) -> &str {
        "tesseract"
    }

    fn class(&self) -> EngineClass {
        EngineClass::Primary
    }

    fn recognize(&self, image: &GrayImage) -> Result<EngineOutput, EngineError> {
        let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
            .map_err(|e| EngineError::NotAvailable(e.to_string()))?;

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| EngineError::ImageEncode(e.to_string()))?;

        lt.set_image_from_mem(&png)
            .map_err(|e| EngineError::Recognition(e.to_string()))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| EngineError::Recognition(e.to_string()))?;

        // Tesseract reports a mean document confidence in 0-100; spread it
        // across tokens so the output contract stays uniform.
        let confidence = (lt.mean_text_conf().max(0) as f32 / 100.0).clamp(0.0, 1.0);
        let tokens = text.split_whitespace().count().max(1);

        Ok(EngineOutput {
            text,
            token_confidences: vec![confidence; tokens],
        })
    }
}
