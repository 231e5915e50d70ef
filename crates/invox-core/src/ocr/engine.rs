//! Recognition engine adapters and the startup capability registry.

use std::sync::Arc;

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::models::config::InvoxConfig;

/// How an adapter participates in multi-engine extraction: primary-class
/// adapters run against every preprocessed variant, secondary-class
/// adapters run once against the unmodified grayscale raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineClass {
    Primary,
    Secondary,
}

/// Raw output of a single engine run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub text: String,
    /// Per-token confidence scores in [0, 1].
    pub token_confidences: Vec<f32>,
}

impl EngineOutput {
    /// Mean over positive token confidences; zero when no token carries one.
    pub fn mean_confidence(&self) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for &c in &self.token_confidences {
            if c > 0.0 {
                sum += c;
                count += 1;
            }
        }
        if count == 0 { 0.0 } else { sum / count as f32 }
    }
}

/// A pluggable text-recognition backend.
///
/// Implementations accept a raster buffer and return recognized text with
/// per-token confidence. Whether an adapter is usable is decided once at
/// process start by the registry's capability probe, never at recognition
/// time.
pub trait EngineAdapter: Send + Sync {
    /// Stable engine identifier, e.g. "tesseract".
    fn id(&self) -> &str;

    /// Evaluation class of this adapter.
    fn class(&self) -> EngineClass;

    /// Recognize text in the raster buffer.
    fn recognize(&self, image: &GrayImage) -> Result<EngineOutput, EngineError>;
}

/// The set of engine adapters available to this process.
///
/// Built once at startup and shared immutably across invocations; an
/// adapter that fails its probe is simply absent, never an error path.
#[derive(Default)]
pub struct EngineRegistry {
    adapters: Vec<Arc<dyn EngineAdapter>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self { adapters: Vec::new() }
    }

    /// Probe every compiled-in adapter and register the ones that respond.
    pub fn discover(config: &InvoxConfig) -> Self {
        debug!(
            "Discovering OCR engines (model dir: {})",
            config.models.model_dir.display()
        );
        #[cfg_attr(
            not(any(feature = "tesseract", feature = "onnx")),
            allow(unused_mut)
        )]
        let mut registry = Self::new();

        #[cfg(feature = "tesseract")]
        match super::tesseract::TesseractEngine::probe(&config.ocr) {
            Ok(engine) => registry.register(Arc::new(engine)),
            Err(e) => warn!("Tesseract engine unavailable: {}", e),
        }

        #[cfg(feature = "onnx")]
        match super::onnx::OnnxEngine::probe(config) {
            Ok(engine) => registry.register(Arc::new(engine)),
            Err(e) => warn!("ONNX engine unavailable: {}", e),
        }

        if registry.is_empty() {
            warn!("No OCR engines available; processing will fail fast");
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn EngineAdapter>) {
        info!("Registered OCR engine: {}", adapter.id());
        self.adapters.push(adapter);
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Primary-class adapters, in registration order.
    pub fn primary(&self) -> impl Iterator<Item = &Arc<dyn EngineAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.class() == EngineClass::Primary)
    }

    /// Secondary-class adapters, in registration order.
    pub fn secondary(&self) -> impl Iterator<Item = &Arc<dyn EngineAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.class() == EngineClass::Secondary)
    }

    /// First registered adapter of any class, for the last-resort fallback
    /// pass.
    pub fn first(&self) -> Option<&Arc<dyn EngineAdapter>> {
        self.adapters.first()
    }
}

/// Returns a preset string regardless of input - useful for exercising the
/// pipeline without a real recognition backend installed.
pub struct StaticEngine {
    id: String,
    class: EngineClass,
    text: String,
    confidence: f32,
}

impl StaticEngine {
    pub fn new(id: impl Into<String>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            id: id.into(),
            class: EngineClass::Primary,
            text: text.into(),
            confidence,
        }
    }

    pub fn secondary(id: impl Into<String>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            class: EngineClass::Secondary,
            ..Self::new(id, text, confidence)
        }
    }
}

impl EngineAdapter for StaticEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn class(&self) -> EngineClass {
        self.class
    }

    fn recognize(&self, _image: &GrayImage) -> Result<EngineOutput, EngineError> {
        let tokens = self.text.split_whitespace().count().max(1);
        Ok(EngineOutput {
            text: self.text.clone(),
            token_confidences: vec![self.confidence; tokens],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn blank() -> GrayImage {
        ImageBuffer::from_pixel(4, 4, Luma([255u8]))
    }

    #[test]
    fn static_engine_ignores_image() {
        let engine = StaticEngine::new("static", "TOTAL 42.00", 0.9);
        let out = engine.recognize(&blank()).unwrap();
        assert_eq!(out.text, "TOTAL 42.00");
        assert_eq!(out.token_confidences.len(), 2);
        assert!((out.mean_confidence() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn mean_confidence_ignores_nonpositive_tokens() {
        let out = EngineOutput {
            text: "a b c".to_string(),
            token_confidences: vec![0.8, 0.0, 0.4],
        };
        assert!((out.mean_confidence() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn mean_confidence_of_empty_output_is_zero() {
        let out = EngineOutput {
            text: String::new(),
            token_confidences: vec![],
        };
        assert_eq!(out.mean_confidence(), 0.0);
    }

    #[test]
    fn registry_partitions_by_class() {
        let mut registry = EngineRegistry::new();
        registry.register(Arc::new(StaticEngine::new("a", "x", 0.5)));
        registry.register(Arc::new(StaticEngine::secondary("b", "y", 0.5)));
        registry.register(Arc::new(StaticEngine::new("c", "z", 0.5)));

        let primary: Vec<&str> = registry.primary().map(|a| a.id()).collect();
        let secondary: Vec<&str> = registry.secondary().map(|a| a.id()).collect();
        assert_eq!(primary, vec!["a", "c"]);
        assert_eq!(secondary, vec!["b"]);
        assert_eq!(registry.first().unwrap().id(), "a");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn discover_with_no_features_is_empty() {
        #[cfg(not(any(feature = "tesseract", feature = "onnx")))]
        {
            let registry = EngineRegistry::discover(&InvoxConfig::default());
            assert!(registry.is_empty());
        }
    }
}
