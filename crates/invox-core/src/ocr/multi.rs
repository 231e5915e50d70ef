//! Multi-engine text extraction with quality-based selection.

use std::sync::Arc;

use image::GrayImage;
use tracing::{debug, warn};

use super::engine::{EngineAdapter, EngineRegistry};
use super::preprocessing::{PreprocessedVariant, binarize_otsu};
use crate::error::OcrError;
use crate::models::result::EngineResult;

/// Fixed confidence reported when every engine run, including the fallback
/// pass, produced nothing.
const EMPTY_RESULT_CONFIDENCE: f32 = 0.1;

/// Outcome of running the available engines over the preprocessed variants.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub best_text: String,
    pub best_confidence: f32,
    pub best_engine: String,
    /// Bounded audit trail of individual runs.
    pub all_results: Vec<EngineResult>,
    /// Runs attempted, not runs that succeeded.
    pub engines_tried: usize,
}

impl ExtractionResult {
    fn empty(engines_tried: usize) -> Self {
        Self {
            best_text: String::new(),
            best_confidence: EMPTY_RESULT_CONFIDENCE,
            best_engine: "none".to_string(),
            all_results: Vec::new(),
            engines_tried,
        }
    }
}

/// Runs every primary-class adapter against every variant and every
/// secondary-class adapter once against the raw grayscale, then selects the
/// best-scoring result.
pub struct MultiEngineExtractor {
    registry: Arc<EngineRegistry>,
    max_audit_results: usize,
}

impl MultiEngineExtractor {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self {
            registry,
            max_audit_results: 10,
        }
    }

    /// Bound the number of engine runs retained for audit.
    pub fn with_max_audit_results(mut self, max: usize) -> Self {
        self.max_audit_results = max;
        self
    }

    /// Extract text, isolating per-run failures. Never fails: total
    /// exhaustion degrades to a single grayscale-binarize pass, and if that
    /// fails too the result is empty text at a fixed confidence floor.
    pub fn extract(&self, variants: &[PreprocessedVariant], raw_gray: &GrayImage) -> ExtractionResult {
        let mut all_results: Vec<EngineResult> = Vec::new();
        let mut engines_tried = 0usize;

        for adapter in self.registry.primary() {
            for variant in variants {
                engines_tried += 1;
                let label = format!("{}_{}", adapter.id(), variant.technique.label());
                if let Some(result) = self.run(adapter, &label, &variant.image) {
                    all_results.push(result);
                }
            }
        }

        for adapter in self.registry.secondary() {
            engines_tried += 1;
            if let Some(result) = self.run(adapter, adapter.id(), raw_gray) {
                all_results.push(result);
            }
        }

        if all_results.is_empty() {
            // Last resort: one plain grayscale-binarize pass with whatever
            // adapter comes first.
            if let Some(adapter) = self.registry.first() {
                engines_tried += 1;
                let label = format!("{}_fallback", adapter.id());
                let fallback = binarize_otsu(raw_gray);
                if let Some(result) = self.run(adapter, &label, &fallback) {
                    all_results.push(result);
                }
            }
        }

        if all_results.is_empty() {
            debug!("All engine runs failed; returning empty result");
            return ExtractionResult::empty(engines_tried);
        }

        let mut best = &all_results[0];
        let mut best_score = selection_score(best.confidence, best.word_count);
        for candidate in &all_results[1..] {
            let score = selection_score(candidate.confidence, candidate.word_count);
            // Strict comparison: ties resolve to the earliest candidate in
            // evaluation order.
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }

        debug!(
            "Selected engine {} (score {:.3}) from {} runs",
            best.engine, best_score, all_results.len()
        );

        let mut result = ExtractionResult {
            best_text: best.text.clone(),
            best_confidence: best.confidence,
            best_engine: best.engine.clone(),
            all_results,
            engines_tried,
        };
        result.all_results.truncate(self.max_audit_results);
        result
    }

    fn run(
        &self,
        adapter: &Arc<dyn EngineAdapter>,
        label: &str,
        image: &GrayImage,
    ) -> Option<EngineResult> {
        match adapter.recognize(image) {
            Ok(output) => {
                let text = output.text.trim().to_string();
                Some(EngineResult {
                    engine: label.to_string(),
                    confidence: output.mean_confidence().clamp(0.0, 1.0),
                    word_count: text.split_whitespace().count(),
                    char_count: text.chars().count(),
                    text,
                })
            }
            Err(source) => {
                let err = OcrError::Engine {
                    engine: label.to_string(),
                    source,
                };
                warn!("Skipping failed run: {}", err);
                None
            }
        }
    }
}

/// Selection score favoring results that are both confident and
/// information-dense: `0.7 * confidence + 0.3 * min(word_count / 100, 1)`.
pub fn selection_score(confidence: f32, word_count: usize) -> f32 {
    confidence * 0.7 + (word_count as f32 / 100.0).min(1.0) * 0.3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::ocr::engine::{EngineClass, EngineOutput, StaticEngine};
    use crate::ocr::preprocessing::Technique;
    use image::{ImageBuffer, Luma};

    struct FailingEngine;

    impl EngineAdapter for FailingEngine {
        fn id(&self) -> &str {
            "failing"
        }

        fn class(&self) -> EngineClass {
            EngineClass::Primary
        }

        fn recognize(&self, _image: &GrayImage) -> Result<EngineOutput, EngineError> {
            Err(EngineError::Recognition("simulated failure".to_string()))
        }
    }

    fn gray() -> GrayImage {
        ImageBuffer::from_pixel(8, 8, Luma([200u8]))
    }

    fn variants(n: usize) -> Vec<PreprocessedVariant> {
        (0..n)
            .map(|_| PreprocessedVariant {
                technique: Technique::Denoised,
                image: gray(),
            })
            .collect()
    }

    fn registry(adapters: Vec<Arc<dyn EngineAdapter>>) -> Arc<EngineRegistry> {
        let mut registry = EngineRegistry::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        Arc::new(registry)
    }

    #[test]
    fn selection_score_formula_is_exact() {
        // confident-but-terse vs verbose-but-unsure: the exact formula
        // output decides, not an assumed winner.
        let terse = selection_score(0.9, 5);
        let verbose = selection_score(0.5, 80);
        assert!((terse - 0.645).abs() < 1e-6, "terse was {terse}");
        assert!((verbose - 0.59).abs() < 1e-6, "verbose was {verbose}");
        assert!(terse > verbose);
    }

    #[test]
    fn selection_score_saturates_word_density() {
        assert!((selection_score(0.0, 100) - 0.3).abs() < 1e-6);
        assert!((selection_score(0.0, 10_000) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn picks_highest_scoring_run() {
        let registry = registry(vec![
            Arc::new(StaticEngine::new("weak", "short text", 0.3)),
            Arc::new(StaticEngine::new("strong", "longer recognized text here", 0.9)),
        ]);
        let extractor = MultiEngineExtractor::new(registry);

        let result = extractor.extract(&variants(2), &gray());
        assert_eq!(result.best_engine, "strong_denoised");
        assert!((result.best_confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.engines_tried, 4);
        assert_eq!(result.all_results.len(), 4);
    }

    #[test]
    fn ties_resolve_to_first_in_evaluation_order() {
        let registry = registry(vec![
            Arc::new(StaticEngine::new("first", "same text here", 0.8)),
            Arc::new(StaticEngine::new("second", "same text here", 0.8)),
        ]);
        let extractor = MultiEngineExtractor::new(registry);

        let result = extractor.extract(&variants(1), &gray());
        assert_eq!(result.best_engine, "first_denoised");
    }

    #[test]
    fn failing_adapter_is_isolated() {
        let registry = registry(vec![
            Arc::new(FailingEngine),
            Arc::new(StaticEngine::secondary("backup", "TOTAL 99.00", 0.7)),
        ]);
        let extractor = MultiEngineExtractor::new(registry);

        let result = extractor.extract(&variants(4), &gray());
        assert_eq!(result.best_engine, "backup");
        assert_eq!(result.best_text, "TOTAL 99.00");
        // Four failed primary runs plus one secondary run were attempted.
        assert_eq!(result.engines_tried, 5);
        assert_eq!(result.all_results.len(), 1);
    }

    #[test]
    fn total_exhaustion_returns_floor_result() {
        let registry = registry(vec![Arc::new(FailingEngine)]);
        let extractor = MultiEngineExtractor::new(registry);

        let result = extractor.extract(&variants(4), &gray());
        assert_eq!(result.best_engine, "none");
        assert_eq!(result.best_text, "");
        assert!((result.best_confidence - 0.1).abs() < 1e-6);
        // Four variant runs plus the single fallback pass.
        assert_eq!(result.engines_tried, 5);
    }

    #[test]
    fn audit_trail_is_bounded() {
        let registry = registry(vec![Arc::new(StaticEngine::new("a", "text", 0.5))]);
        let extractor = MultiEngineExtractor::new(registry).with_max_audit_results(2);

        let result = extractor.extract(&variants(5), &gray());
        assert_eq!(result.engines_tried, 5);
        assert_eq!(result.all_results.len(), 2);
    }

    #[test]
    fn empty_registry_yields_empty_result() {
        let extractor = MultiEngineExtractor::new(Arc::new(EngineRegistry::new()));
        let result = extractor.extract(&variants(4), &gray());
        assert_eq!(result.best_engine, "none");
        assert_eq!(result.engines_tried, 0);
    }
}
