//! Signal estimators
//!
//! Four independent readings per sampled frame. None of them fails: any
//! internal error becomes the estimator's neutral default.
//!
//! - classifier: full frame → 64x64 tile → 7-class distribution
//!   (default: all mass on neutral)
//! - blink: eye aspect ratio from landmarks 36-47 (default 0.5)
//! - eyebrow: inner brow gap from landmarks 21/22 (default 0.5)
//! - aux: secondary label, "stressed" → 0.75, else 0.25
//!   (default: ("neutral", 0.5))

use image::imageops::{self, FilterType};
use image::GrayImage;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

use crate::core::models::ModelService;
use crate::types::{AuxEmotion, EmotionDistribution, FaceRegion, Frame, Point, SignalSet};
use crate::{
    AUX_CALM, AUX_NEUTRAL, AUX_STRESSED, AUX_STRESSED_LABEL, BROW_DISTANCE_SCALE, CLASSIFIER_TILE,
    EAR_FLOOR, EAR_SPAN, METRIC_NEUTRAL,
};

const LEFT_EYE: Range<usize> = 36..42;
const RIGHT_EYE: Range<usize> = 42..48;
const LEFT_BROW: Range<usize> = 17..22;
const RIGHT_BROW: Range<usize> = 22..27;

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Resize to the classifier tile and scale intensities to [0, 1]
pub fn classifier_tile(gray: &GrayImage) -> Vec<f32> {
    let tile = imageops::resize(gray, CLASSIFIER_TILE, CLASSIFIER_TILE, FilterType::Triangle);
    tile.pixels().map(|p| p[0] as f32 / 255.0).collect()
}

pub struct ClassifierEstimator {
    models: Arc<ModelService>,
}

impl ClassifierEstimator {
    pub fn new(models: Arc<ModelService>) -> Self {
        Self { models }
    }

    /// Distribution for the whole frame, not the face crop
    pub fn estimate(&self, gray: &GrayImage) -> EmotionDistribution {
        let Some(classifier) = self.models.classifier() else {
            return EmotionDistribution::neutral();
        };
        match classifier.predict(&classifier_tile(gray)) {
            Ok(probs) => EmotionDistribution::from_slice(&probs).unwrap_or_else(|| {
                debug!(len = probs.len(), "Classifier returned an unusable vector");
                EmotionDistribution::neutral()
            }),
            Err(e) => {
                debug!(error = %e, "Classifier inference failed");
                EmotionDistribution::neutral()
            }
        }
    }
}

// =============================================================================
// LANDMARK GEOMETRY
// =============================================================================

/// (|p1-p5| + |p2-p4|) / (2 |p0-p3|) over six eye points
pub fn eye_aspect_ratio(eye: &[Point]) -> Option<f64> {
    if eye.len() != 6 {
        return None;
    }
    let a = eye[1].distance(&eye[5]);
    let b = eye[2].distance(&eye[4]);
    let c = eye[0].distance(&eye[3]);
    if c <= f64::EPSILON {
        return None;
    }
    let ear = (a + b) / (2.0 * c);
    ear.is_finite().then_some(ear)
}

/// Mean EAR of both eyes mapped onto [0, 1]; lower means more closed
pub fn blink_metric(landmarks: &[Point]) -> Option<f64> {
    if landmarks.len() < RIGHT_EYE.end {
        return None;
    }
    let left = eye_aspect_ratio(&landmarks[LEFT_EYE])?;
    let right = eye_aspect_ratio(&landmarks[RIGHT_EYE])?;
    let ear = (left + right) / 2.0;
    Some(((ear - EAR_FLOOR) / EAR_SPAN).clamp(0.0, 1.0))
}

/// Inner brow gap mapped onto [0, 1]; closer brows mean higher values
pub fn eyebrow_metric(landmarks: &[Point]) -> Option<f64> {
    if landmarks.len() < RIGHT_BROW.end {
        return None;
    }
    let left_inner = landmarks[LEFT_BROW.end - 1];
    let right_inner = landmarks[RIGHT_BROW.start];
    let distance = left_inner.distance(&right_inner);
    if !distance.is_finite() {
        return None;
    }
    Some(1.0 - (distance / BROW_DISTANCE_SCALE).clamp(0.0, 1.0))
}

/// Stress contribution of an aux label
pub fn aux_stress(label: &str) -> f64 {
    if label == AUX_STRESSED_LABEL {
        AUX_STRESSED
    } else {
        AUX_CALM
    }
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Runs the four estimators against one frame
pub struct SignalExtractor {
    classifier: ClassifierEstimator,
    models: Arc<ModelService>,
}

impl SignalExtractor {
    pub fn new(models: Arc<ModelService>) -> Self {
        Self {
            classifier: ClassifierEstimator::new(models.clone()),
            models,
        }
    }

    /// `gray` is the luma view of `frame`, computed once by the caller
    pub fn extract(&self, frame: &Frame, gray: &GrayImage, region: Option<&FaceRegion>) -> SignalSet {
        let distribution = self.classifier.estimate(gray);
        let landmarks = region.and_then(|r| self.landmarks(frame, r));

        let blink = landmarks
            .as_deref()
            .and_then(blink_metric)
            .unwrap_or(METRIC_NEUTRAL);
        let eyebrow = landmarks
            .as_deref()
            .and_then(eyebrow_metric)
            .unwrap_or(METRIC_NEUTRAL);

        SignalSet {
            distribution,
            blink,
            eyebrow,
            aux: self.aux(frame, region),
        }
    }

    /// Fetched once and shared by the blink and eyebrow estimators
    fn landmarks(&self, frame: &Frame, region: &FaceRegion) -> Option<Vec<Point>> {
        let predictor = self.models.landmark_predictor()?;
        match predictor.landmarks(frame, region) {
            Ok(points) => Some(points),
            Err(e) => {
                debug!(frame = frame.index(), error = %e, "Landmark prediction failed");
                None
            }
        }
    }

    fn aux(&self, frame: &Frame, region: Option<&FaceRegion>) -> AuxEmotion {
        let neutral = AuxEmotion {
            label: "neutral".to_string(),
            stress: AUX_NEUTRAL,
        };
        let (Some(region), Some(aux)) = (region, self.models.aux_classifier()) else {
            return neutral;
        };
        match aux.classify(frame, region) {
            Ok(label) => {
                let stress = aux_stress(&label);
                AuxEmotion { label, stress }
            }
            Err(e) => {
                debug!(frame = frame.index(), error = %e, "Aux classifier failed");
                neutral
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Eye with horizontal span `w` and both vertical spans `h`
    fn eye(cx: f64, w: f64, h: f64) -> Vec<Point> {
        vec![
            Point::new(cx - w / 2.0, 0.0),
            Point::new(cx - w / 6.0, -h / 2.0),
            Point::new(cx + w / 6.0, -h / 2.0),
            Point::new(cx + w / 2.0, 0.0),
            Point::new(cx + w / 6.0, h / 2.0),
            Point::new(cx - w / 6.0, h / 2.0),
        ]
    }

    fn face(eye_h: f64, brow_gap: f64) -> Vec<Point> {
        let mut points = vec![Point::new(0.0, 0.0); 68];
        for (i, p) in eye(-30.0, 30.0, eye_h).into_iter().enumerate() {
            points[36 + i] = p;
        }
        for (i, p) in eye(30.0, 30.0, eye_h).into_iter().enumerate() {
            points[42 + i] = p;
        }
        points[21] = Point::new(-brow_gap / 2.0, -40.0);
        points[22] = Point::new(brow_gap / 2.0, -40.0);
        points
    }

    #[test]
    fn test_ear_of_synthetic_eye() {
        let ear = eye_aspect_ratio(&eye(0.0, 30.0, 9.0)).unwrap();
        assert!((ear - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_ear_degenerate_eye() {
        assert!(eye_aspect_ratio(&[Point::new(1.0, 1.0); 6]).is_none());
        assert!(eye_aspect_ratio(&[Point::new(1.0, 1.0); 5]).is_none());
    }

    #[test]
    fn test_blink_metric_rescale() {
        // EAR 0.3 → (0.3 - 0.15) / 0.25 = 0.6
        assert!((blink_metric(&face(9.0, 20.0)).unwrap() - 0.6).abs() < 1e-9);
        // closed eyes clip to 0
        assert_eq!(blink_metric(&face(1.0, 20.0)).unwrap(), 0.0);
        // wide eyes clip to 1
        assert_eq!(blink_metric(&face(30.0, 20.0)).unwrap(), 1.0);
    }

    #[test]
    fn test_eyebrow_metric() {
        assert!((eyebrow_metric(&face(9.0, 20.0)).unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(eyebrow_metric(&face(9.0, 250.0)).unwrap(), 0.0);
        assert!(eyebrow_metric(&face(9.0, 20.0)[..20]).is_none());
    }

    #[test]
    fn test_aux_mapping() {
        assert_eq!(aux_stress("stressed"), 0.75);
        assert_eq!(aux_stress("calm"), 0.25);
        assert_eq!(aux_stress("Stressed"), 0.25);
    }

    #[test]
    fn test_tile_shape_and_range() {
        let gray = GrayImage::from_fn(320, 240, |x, _| image::Luma([(x % 256) as u8]));
        let tile = classifier_tile(&gray);
        assert_eq!(tile.len(), 64 * 64);
        assert!(tile.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_extractor_defaults_without_models() {
        let models = Arc::new(
            ModelService::preloaded(None, crate::core::models::FaceModels::default()).unwrap(),
        );
        let extractor = SignalExtractor::new(models);
        let frame = Frame::solid(0, 32, 32, 120);
        let region = FaceRegion::new(0, 0, 16, 16);
        let set = extractor.extract(&frame, &frame.to_gray(), Some(&region));
        assert_eq!(set.distribution, EmotionDistribution::neutral());
        assert_eq!(set.blink, 0.5);
        assert_eq!(set.eyebrow, 0.5);
        assert_eq!(set.aux.label, "neutral");
        assert_eq!(set.aux.stress, 0.5);
    }
}
