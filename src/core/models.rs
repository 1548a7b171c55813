//! Model collaborators and the shared model service
//!
//! Collaborators are loaded lazily on first use and held behind an explicit
//! load state. A missing or broken model degrades to `None` (logged once);
//! estimators then fall back to their neutral defaults.

use parking_lot::Mutex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::face::FaceDetector;
use crate::core::replay::ReplayAnnotations;
use crate::types::{FaceRegion, Frame, Point, EMOTION_ORDER};
use crate::{Error, Result, CLASSIFIER_TILE};

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// 7-class facial expression classifier
pub trait EmotionClassifier: Send + Sync {
    /// Class labels in output order
    fn labels(&self) -> Vec<String>;

    /// Probabilities for a normalized 64x64 grayscale tile (row-major)
    fn predict(&self, tile: &[f32]) -> Result<Vec<f32>>;
}

/// 68-point facial landmark predictor
pub trait LandmarkPredictor: Send + Sync {
    fn landmarks(&self, frame: &Frame, region: &FaceRegion) -> Result<Vec<Point>>;
}

/// Coarse secondary emotion classifier
pub trait AuxClassifier: Send + Sync {
    fn classify(&self, frame: &Frame, region: &FaceRegion) -> Result<String>;
}

/// Check a declared label list against the canonical FER order
pub fn validate_label_order(declared: &[String]) -> Result<()> {
    let matches = declared.len() == EMOTION_ORDER.len()
        && declared
            .iter()
            .zip(EMOTION_ORDER.iter())
            .all(|(d, e)| d.trim().eq_ignore_ascii_case(e.as_str()));
    if matches {
        Ok(())
    } else {
        Err(Error::LabelOrder {
            expected: EMOTION_ORDER.iter().map(|e| e.as_str().to_string()).collect(),
            declared: declared.to_vec(),
        })
    }
}

// =============================================================================
// LINEAR CLASSIFIER
// =============================================================================

#[derive(Debug, Deserialize)]
struct LinearModelFile {
    labels: Vec<String>,
    input_size: u32,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// Softmax over `W·x + b`, read from a JSON model file
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    labels: Vec<String>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let file: LinearModelFile = serde_json::from_str(&text).map_err(|e| Error::ModelFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        validate_label_order(&file.labels)?;

        let format_err = |reason: String| Error::ModelFormat {
            path: path.to_path_buf(),
            reason,
        };
        if file.input_size != CLASSIFIER_TILE {
            return Err(format_err(format!(
                "input_size {} but tiles are {}",
                file.input_size, CLASSIFIER_TILE
            )));
        }
        let inputs = (file.input_size * file.input_size) as usize;
        if file.weights.len() != file.labels.len() || file.bias.len() != file.labels.len() {
            return Err(format_err("weights/bias rows do not match labels".to_string()));
        }
        if file.weights.iter().any(|row| row.len() != inputs) {
            return Err(format_err(format!("every weight row must have {} values", inputs)));
        }

        Ok(Self {
            labels: file.labels,
            weights: file.weights,
            bias: file.bias,
        })
    }
}

impl EmotionClassifier for LinearClassifier {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn predict(&self, tile: &[f32]) -> Result<Vec<f32>> {
        let expected = self.weights.first().map(|r| r.len()).unwrap_or(0);
        if tile.len() != expected {
            return Err(Error::Inference(format!(
                "tile has {} values, model expects {}",
                tile.len(),
                expected
            )));
        }

        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(tile).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(Error::Inference("softmax overflow".to_string()));
        }
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

// =============================================================================
// MODEL SERVICE
// =============================================================================

/// Files backing the model service
#[derive(Debug, Clone, Default)]
pub struct ModelPaths {
    /// Linear classifier JSON
    pub classifier: Option<PathBuf>,
    /// Replay annotations JSON (detector, landmarks, aux labels)
    pub annotations: Option<PathBuf>,
}

/// Face-side collaborators, any of which may be missing
#[derive(Clone, Default)]
pub struct FaceModels {
    pub detector: Option<Arc<dyn FaceDetector>>,
    pub landmarks: Option<Arc<dyn LandmarkPredictor>>,
    pub aux: Option<Arc<dyn AuxClassifier>>,
}

impl FaceModels {
    fn from_annotations(annotations: ReplayAnnotations) -> Self {
        let shared = Arc::new(annotations);
        Self {
            detector: Some(shared.clone()),
            landmarks: Some(shared.clone()),
            aux: Some(shared),
        }
    }
}

enum LoadState<T: ?Sized> {
    NotLoaded,
    Ready(Arc<T>),
    Unavailable,
}

/// Shared, lazily loaded model collaborators
///
/// Built once at startup and handed to every consumer by `Arc`.
pub struct ModelService {
    paths: ModelPaths,
    classifier: Mutex<LoadState<dyn EmotionClassifier>>,
    faces: Mutex<LoadState<FaceModels>>,
}

impl ModelService {
    /// File-backed service; nothing is read until first use
    pub fn new(paths: ModelPaths) -> Self {
        info!("Model service initialized (lazy loading enabled)");
        Self {
            paths,
            classifier: Mutex::new(LoadState::NotLoaded),
            faces: Mutex::new(LoadState::NotLoaded),
        }
    }

    /// Service around already-built collaborators
    ///
    /// The classifier's labels are validated here, once.
    pub fn preloaded(classifier: Option<Arc<dyn EmotionClassifier>>, faces: FaceModels) -> Result<Self> {
        let classifier = match classifier {
            Some(c) => {
                validate_label_order(&c.labels())?;
                LoadState::Ready(c)
            }
            None => LoadState::Unavailable,
        };
        Ok(Self {
            paths: ModelPaths::default(),
            classifier: Mutex::new(classifier),
            faces: Mutex::new(LoadState::Ready(Arc::new(faces))),
        })
    }

    /// Force every slot to load; a label-order mismatch is returned
    pub fn preload(&self) -> Result<()> {
        self.load_classifier().map(|_| ())?;
        self.face_models();
        Ok(())
    }

    pub fn classifier(&self) -> Option<Arc<dyn EmotionClassifier>> {
        self.load_classifier().ok().flatten()
    }

    pub fn face_detector(&self) -> Option<Arc<dyn FaceDetector>> {
        self.face_models().and_then(|m| m.detector.clone())
    }

    pub fn landmark_predictor(&self) -> Option<Arc<dyn LandmarkPredictor>> {
        self.face_models().and_then(|m| m.landmarks.clone())
    }

    pub fn aux_classifier(&self) -> Option<Arc<dyn AuxClassifier>> {
        self.face_models().and_then(|m| m.aux.clone())
    }

    fn load_classifier(&self) -> Result<Option<Arc<dyn EmotionClassifier>>> {
        let mut slot = self.classifier.lock();
        match &*slot {
            LoadState::Ready(c) => return Ok(Some(c.clone())),
            LoadState::Unavailable => return Ok(None),
            LoadState::NotLoaded => {}
        }

        let Some(path) = self.paths.classifier.clone() else {
            warn!("No classifier configured, classifier estimator will report neutral");
            *slot = LoadState::Unavailable;
            return Ok(None);
        };

        match LinearClassifier::load(&path) {
            Ok(model) => {
                info!(path = %path.display(), "Emotion classifier loaded");
                let model: Arc<dyn EmotionClassifier> = Arc::new(model);
                *slot = LoadState::Ready(model.clone());
                Ok(Some(model))
            }
            Err(e @ Error::LabelOrder { .. }) => {
                error!(path = %path.display(), error = %e, "Emotion classifier rejected");
                *slot = LoadState::Unavailable;
                Err(e)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Emotion classifier unavailable");
                *slot = LoadState::Unavailable;
                Ok(None)
            }
        }
    }

    fn face_models(&self) -> Option<Arc<FaceModels>> {
        let mut slot = self.faces.lock();
        match &*slot {
            LoadState::Ready(m) => return Some(m.clone()),
            LoadState::Unavailable => return None,
            LoadState::NotLoaded => {}
        }

        let Some(path) = self.paths.annotations.clone() else {
            warn!("No face models configured, every frame will count as no-face");
            *slot = LoadState::Unavailable;
            return None;
        };

        match ReplayAnnotations::load(&path) {
            Ok(annotations) => {
                info!(path = %path.display(), frames = annotations.len(), "Face annotations loaded");
                let models = Arc::new(FaceModels::from_annotations(annotations));
                *slot = LoadState::Ready(models.clone());
                Some(models)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Face annotations unavailable");
                *slot = LoadState::Unavailable;
                None
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared with a scoped subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stressfuse-models-{}-{}.json", name, std::process::id()))
    }

    fn write_model(name: &str, labels: &[&str], input_size: u32) -> PathBuf {
        let inputs = (input_size * input_size) as usize;
        let model = serde_json::json!({
            "labels": labels,
            "input_size": input_size,
            "weights": vec![vec![0.0f32; inputs]; labels.len()],
            "bias": (0..labels.len()).map(|i| if i == 6 { 2.0 } else { 0.0 }).collect::<Vec<f32>>(),
        });
        let path = temp_path(name);
        std::fs::write(&path, model.to_string()).unwrap();
        path
    }

    const FER: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

    #[test]
    fn test_validate_label_order() {
        let good: Vec<String> = FER.iter().map(|s| s.to_uppercase()).collect();
        assert!(validate_label_order(&good).is_ok());

        let mut swapped: Vec<String> = FER.iter().map(|s| s.to_string()).collect();
        swapped.swap(0, 3);
        assert!(matches!(validate_label_order(&swapped), Err(Error::LabelOrder { .. })));
    }

    #[test]
    fn test_linear_classifier_softmax() {
        let path = write_model("softmax", &FER, CLASSIFIER_TILE);
        let model = LinearClassifier::load(&path).unwrap();
        let probs = model.predict(&vec![0.5; 4096]).unwrap();
        assert_eq!(probs.len(), 7);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        // bias favours neutral
        assert!(probs[6] > probs[0]);
        assert!(model.predict(&[0.0; 10]).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_wrong_tile_size_is_format_error() {
        let path = write_model("tile", &FER, 48);
        assert!(matches!(LinearClassifier::load(&path), Err(Error::ModelFormat { .. })));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_classifier_degrades_to_none() {
        let service = ModelService::new(ModelPaths {
            classifier: Some(temp_path("does-not-exist")),
            annotations: None,
        });
        assert!(service.classifier().is_none());
        assert!(service.face_detector().is_none());
        assert!(service.preload().is_ok());
    }

    #[test]
    fn test_preload_fails_loudly_on_label_order() {
        let labels = ["happy", "disgust", "fear", "angry", "sad", "surprise", "neutral"];
        let path = write_model("order", &labels, CLASSIFIER_TILE);
        let service = ModelService::new(ModelPaths {
            classifier: Some(path.clone()),
            annotations: None,
        });
        assert!(matches!(service.preload(), Err(Error::LabelOrder { .. })));
        // later calls see an unavailable classifier, not a panic
        assert!(service.classifier().is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_lazy_label_order_mismatch_is_logged_once() {
        let labels = ["neutral", "angry", "disgust", "fear", "happy", "sad", "surprise"];
        let path = write_model("lazy-order", &labels, CLASSIFIER_TILE);
        let service = ModelService::new(ModelPaths {
            classifier: Some(path.clone()),
            annotations: None,
        });

        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(service.classifier().is_none());
            assert!(service.classifier().is_none());
        });

        let output = logs.contents();
        assert_eq!(output.matches("Emotion classifier rejected").count(), 1);
        assert!(output.contains("ERROR"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_lazy_load_happens_once() {
        let path = write_model("lazy", &FER, CLASSIFIER_TILE);
        let service = ModelService::new(ModelPaths {
            classifier: Some(path.clone()),
            annotations: None,
        });
        let first = service.classifier().unwrap();
        std::fs::remove_file(&path).ok();
        // file gone, slot already loaded
        let second = service.classifier().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
