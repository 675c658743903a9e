//! Prediction Orchestrator
//!
//! Composes preprocessing, the forward pass, ranking, nutrition lookup and
//! the recommendation into a single `predict` call. A `Predictor` is built
//! once at startup and shared (`Arc<Predictor>`) by every caller.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::engine::{InferenceEngine, TfliteEngine};
use super::preprocess;
use super::TOP_K;
use crate::catalog::{recommend, ClassRegistry, NutritionCatalog, NutritionFacts};
use crate::config::{OutputActivation, PredictorConfig};
use crate::utils::error::{FoodVisionError, Result, ResultExt};
use crate::utils::round3;

/// One ranked label with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    #[serde(rename = "food")]
    pub label: String,
    pub confidence: f32,
}

/// Outcome of a single prediction
///
/// Serializes to the wire names `food`, `confidence`, `nutrition`,
/// `recommendation` and `top_predictions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "food")]
    pub top_label: String,

    /// Score of the top label, rounded to 3 decimals
    pub confidence: f32,

    pub nutrition: NutritionFacts,

    pub recommendation: String,

    /// Up to `TOP_K` candidates, highest confidence first
    #[serde(rename = "top_predictions")]
    pub top_candidates: Vec<PredictionCandidate>,
}

/// Liveness summary of the predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub model_loaded: bool,
    pub class_count: usize,
}

/// Model, registry and catalog wired together
pub struct Predictor {
    engine: Arc<dyn InferenceEngine>,
    classes: ClassRegistry,
    nutrition: NutritionCatalog,
    activation: OutputActivation,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("input_size", &self.engine.input_size())
            .field("classes", &self.classes.len())
            .field("nutrition", &self.nutrition.len())
            .field("activation", &self.activation)
            .finish()
    }
}

impl Predictor {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        classes: ClassRegistry,
        nutrition: NutritionCatalog,
    ) -> Self {
        Self {
            engine,
            classes,
            nutrition,
            activation: OutputActivation::None,
        }
    }

    pub fn with_activation(mut self, activation: OutputActivation) -> Self {
        self.activation = activation;
        self
    }

    /// Load every startup artifact named by `config`
    ///
    /// A model failure is returned as `ModelLoad`; an unusable class-name
    /// file degrades to the sentinel registry instead.
    pub fn from_config(config: &PredictorConfig) -> Result<Self> {
        config.validate()?;

        let engine = TfliteEngine::load(&config.model_path, config.fallback_input_size)?;
        let classes = ClassRegistry::load(&config.class_names_path);
        let nutrition = match &config.nutrition_path {
            Some(path) => NutritionCatalog::from_path(path)?,
            None => NutritionCatalog::embedded(),
        };

        if let Some(count) = engine.class_count() {
            if count != classes.len() {
                warn!(
                    "Model emits {} scores but {} class names are registered",
                    count,
                    classes.len()
                );
            }
        }

        let model = engine.info();
        info!(
            "Predictor ready: {:?} ({:?} input {}), {} classes, {} catalog entries",
            model.path,
            model.input_precision,
            model.input_size,
            classes.len(),
            nutrition.len()
        );

        Ok(Self::new(Arc::new(engine), classes, nutrition).with_activation(config.output_activation))
    }

    /// Classify one encoded image
    pub fn predict(&self, raw_image: &[u8]) -> Result<PredictionResult> {
        let start = Instant::now();

        let tensor = preprocess::prepare(raw_image, self.engine.input_size()).map_err(|e| match e {
            FoodVisionError::Decode(_) => e,
            other => FoodVisionError::Prediction(other.to_string()),
        })?;

        let mut scores = self.engine.infer(&tensor).map_err(|e| match e {
            FoodVisionError::Prediction(_) => e,
            other => FoodVisionError::Prediction(other.to_string()),
        })?;
        self.activation.apply(&mut scores);

        let ranked = rank(&scores);
        let top = *ranked
            .first()
            .ok_or_else(|| FoodVisionError::Prediction("model returned no scores".to_string()))?;

        let top_label = self.classes.resolve(top);
        let confidence = round3(scores[top]);
        let top_candidates = ranked
            .iter()
            .take(TOP_K)
            .map(|&idx| PredictionCandidate {
                label: self.classes.resolve(idx),
                confidence: round3(scores[idx]),
            })
            .collect();

        let nutrition = self.nutrition.lookup(&top_label);
        let recommendation = recommend(&top_label, &nutrition);

        debug!(
            "Predicted {} ({:.3}) in {:.2}ms",
            top_label,
            confidence,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(PredictionResult {
            top_label,
            confidence,
            nutrition,
            recommendation,
            top_candidates,
        })
    }

    /// Read an image file into memory and classify it
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let raw = std::fs::read(path)
            .context_as(FoodVisionError::InvalidInput, || format!("cannot read image {:?}", path))?;
        self.predict(&raw)
    }

    /// Every label the nutrition catalog knows, sorted
    pub fn list_known_foods(&self) -> Vec<String> {
        self.nutrition.available_labels()
    }

    /// Liveness summary
    ///
    /// A `Predictor` can only be built around a loaded engine (a model that
    /// fails to load aborts `from_config`), so `model_loaded` reports the
    /// registry side: it is false only for an empty class list. A registry
    /// that fell back to the sentinel still counts as loaded; check
    /// `classes().is_sentinel()` to detect that degraded state.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            model_loaded: !self.classes.is_empty(),
            class_count: self.classes.len(),
        }
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn nutrition(&self) -> &NutritionCatalog {
        &self.nutrition
    }

    pub fn engine(&self) -> &Arc<dyn InferenceEngine> {
        &self.engine
    }
}

/// Indices ordered by score, highest first
///
/// The sort is stable so equal scores keep ascending index order. NaN ranks
/// below every number.
fn rank(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));
    indices
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::preprocess::{InputSize, InputTensor};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct FakeEngine {
        scores: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InferenceEngine for FakeEngine {
        fn input_size(&self) -> InputSize {
            InputSize::square(16)
        }

        fn class_count(&self) -> Option<usize> {
            Some(self.scores.len())
        }

        fn infer(&self, input: &InputTensor) -> Result<Vec<f32>> {
            assert_eq!(input.shape(), [1, 16, 16, 3]);
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.scores.clone())
        }
    }

    fn png() -> Vec<u8> {
        let img = RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8 * 5, y as u8 * 7, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn predictor(scores: Vec<f32>, labels: &[&str]) -> Predictor {
        Predictor::new(
            Arc::new(FakeEngine::new(scores)),
            ClassRegistry::from_labels(labels.iter().copied()),
            NutritionCatalog::embedded(),
        )
    }

    #[test]
    fn test_predict_ranks_and_enriches() {
        let p = predictor(
            vec![0.05, 0.7, 0.2, 0.05],
            &["Apple", "Nasi Goreng", "Banana", "Tomato"],
        );
        let result = p.predict(&png()).unwrap();

        assert_eq!(result.top_label, "Nasi Goreng");
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.nutrition, NutritionFacts::new(320.0, 8.0, 12.0, 45.0));
        assert_eq!(result.recommendation, "use less oil and add vegetables");

        let labels: Vec<&str> = result.top_candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Nasi Goreng", "Banana", "Apple"]);
        assert_eq!(result.top_candidates[0].confidence, result.confidence);
        assert!(result
            .top_candidates
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_ties_prefer_lowest_index() {
        let p = predictor(vec![0.1, 0.4, 0.4, 0.1], &["A", "B", "C", "D"]);
        let result = p.predict(&png()).unwrap();

        assert_eq!(result.top_label, "B");
        let labels: Vec<&str> = result.top_candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_out_of_range_index_gets_synthetic_label() {
        let p = predictor(vec![0.1, 0.2, 0.6, 0.1], &["Apple", "Banana"]);
        let result = p.predict(&png()).unwrap();

        assert_eq!(result.top_label, "Class_2");
        assert_eq!(result.nutrition, NutritionFacts::zero());
        assert_eq!(result.top_candidates[0].label, "Class_2");
    }

    #[test]
    fn test_fewer_than_top_k_classes() {
        let p = predictor(vec![0.3, 0.7], &["Apple", "Banana"]);
        let result = p.predict(&png()).unwrap();
        assert_eq!(result.top_candidates.len(), 2);
        assert_eq!(result.top_label, "Banana");
    }

    #[test]
    fn test_confidence_is_rounded() {
        let p = predictor(vec![0.123456, 0.876544], &["Apple", "Banana"]);
        let result = p.predict(&png()).unwrap();
        assert_eq!(result.confidence, 0.877);
        assert_eq!(result.top_candidates[1].confidence, 0.123);
    }

    #[test]
    fn test_nan_ranks_last() {
        let p = predictor(vec![f32::NAN, 0.2, 0.5], &["A", "B", "C"]);
        let result = p.predict(&png()).unwrap();
        assert_eq!(result.top_label, "C");
        assert_eq!(result.top_candidates[2].label, "A");
    }

    #[test]
    fn test_softmax_activation() {
        let p = predictor(vec![0.0, 2.0], &["Apple", "Banana"]).with_activation(OutputActivation::Softmax);
        let result = p.predict(&png()).unwrap();
        assert_eq!(result.top_label, "Banana");
        assert_eq!(result.confidence, 0.881);
    }

    #[test]
    fn test_predict_is_idempotent() {
        let p = predictor(vec![0.2, 0.5, 0.3], &["Burger", "Pizza", "Sate"]);
        let bytes = png();
        assert_eq!(p.predict(&bytes).unwrap(), p.predict(&bytes).unwrap());
    }

    #[test]
    fn test_non_image_bytes_is_decode_error() {
        let engine = Arc::new(FakeEngine::new(vec![1.0]));
        let p = Predictor::new(engine.clone(), ClassRegistry::sentinel(), NutritionCatalog::embedded());

        let err = p.predict(b"definitely not an image").unwrap_err();
        assert!(matches!(err, FoodVisionError::Decode(_)));
        assert!(err.is_client_error());
        assert_eq!(engine.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_empty_scores_is_prediction_error() {
        let p = predictor(vec![], &["Apple"]);
        let err = p.predict(&png()).unwrap_err();
        assert!(matches!(err, FoodVisionError::Prediction(_)));
    }

    #[test]
    fn test_predict_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meal.png");
        std::fs::write(&path, png()).unwrap();

        let p = predictor(vec![0.9, 0.1], &["Pizza", "Burger"]);
        assert_eq!(p.predict_file(&path).unwrap().top_label, "Pizza");
        assert!(p.predict_file(&dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn test_list_known_foods_matches_catalog() {
        let p = predictor(vec![1.0], &["Apple"]);
        let foods = p.list_known_foods();
        assert_eq!(foods.len(), 23);
        assert_eq!(foods.len(), p.nutrition().len());
    }

    #[test]
    fn test_health() {
        let p = predictor(vec![1.0, 0.0], &["Apple", "Banana"]);
        assert_eq!(
            p.health(),
            HealthStatus {
                model_loaded: true,
                class_count: 2
            }
        );

        let degraded = Predictor::new(
            Arc::new(FakeEngine::new(vec![1.0])),
            ClassRegistry::sentinel(),
            NutritionCatalog::embedded(),
        );
        assert_eq!(degraded.health().class_count, 1);
        assert!(degraded.health().model_loaded);
        assert!(degraded.classes().is_sentinel());

        let empty = Predictor::new(
            Arc::new(FakeEngine::new(vec![1.0])),
            ClassRegistry::from_labels(Vec::<String>::new()),
            NutritionCatalog::embedded(),
        );
        assert!(!empty.health().model_loaded);
    }

    #[test]
    fn test_from_config_missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = PredictorConfig::from_model_dir(dir.path());
        let err = Predictor::from_config(&config).unwrap_err();
        assert!(matches!(err, FoodVisionError::ModelLoad { .. }));
    }

    #[test]
    fn test_wire_names() {
        let p = predictor(vec![0.6, 0.4], &["Apple", "Banana"]);
        let json = serde_json::to_value(p.predict(&png()).unwrap()).unwrap();
        assert_eq!(json["food"], "Apple");
        assert_eq!(json["top_predictions"][1]["food"], "Banana");
        assert!(json["nutrition"]["calories"].is_number());
        assert!(json.get("top_label").is_none());
    }
}
