//! Fusion Engine: fixed linear model over the four signals
//!
//! fused = clip(0.40*model + 0.20*(1 - blink) + 0.20*eyebrow + 0.20*aux, 0, 1)
//!
//! Label and confidence come from the classifier arg-max, never from the
//! fused score.

use crate::types::{FusedResult, FusionDebug, SignalSet};
use crate::{W_AUX, W_BLINK, W_EYEBROW, W_MODEL};

/// Weighted sum of the four readings, clamped to [0, 1]
pub fn fuse(model_stress: f64, blink_metric: f64, eyebrow_metric: f64, aux_stress: f64) -> f64 {
    let fused = W_MODEL * model_stress
        + W_BLINK * (1.0 - blink_metric)
        + W_EYEBROW * eyebrow_metric
        + W_AUX * aux_stress;
    if fused.is_nan() {
        return 0.0;
    }
    fused.clamp(0.0, 1.0)
}

/// Turns a `SignalSet` into a `FusedResult`
///
/// Stateless: the same signals always give the same result.
#[derive(Debug, Default, Clone, Copy)]
pub struct FusionEngine;

impl FusionEngine {
    pub fn new() -> Self {
        Self
    }

    /// `face_detected` is filled in by the caller after debouncing
    pub fn combine(&self, signals: &SignalSet, face_detected: bool) -> FusedResult {
        let model_stress = signals.distribution.negative_mean();
        let (emotion, confidence) = signals.distribution.dominant();

        FusedResult {
            stress_level: fuse(model_stress, signals.blink, signals.eyebrow, signals.aux.stress),
            emotion_label: emotion.as_str().to_string(),
            confidence,
            face_detected,
            debug: FusionDebug {
                model_stress,
                blink_metric: signals.blink,
                eyebrow_metric: signals.eyebrow,
                service_emotion: signals.aux.label.clone(),
                service_stress: signals.aux.stress,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuxEmotion, EmotionDistribution};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!(close(W_MODEL + W_BLINK + W_EYEBROW + W_AUX, 1.0));
    }

    #[test]
    fn test_extremes() {
        assert!(close(fuse(1.0, 0.0, 1.0, 1.0), 1.0));
        assert!(close(fuse(0.0, 1.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn test_output_bounded_on_grid() {
        let steps = [0.0, 0.25, 0.5, 0.75, 1.0];
        for m in steps {
            for b in steps {
                for e in steps {
                    for a in steps {
                        let v = fuse(m, b, e, a);
                        assert!((0.0..=1.0).contains(&v), "fuse({m},{b},{e},{a}) = {v}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_inputs_still_clamped() {
        assert_eq!(fuse(5.0, -3.0, 5.0, 5.0), 1.0);
        assert_eq!(fuse(-5.0, 5.0, -5.0, -5.0), 0.0);
        assert_eq!(fuse(f64::NAN, 0.5, 0.5, 0.5), 0.0);
    }

    #[test]
    fn test_angry_frame() {
        let signals = SignalSet {
            distribution: EmotionDistribution::from_slice(&[0.9, 0.0, 0.0, 0.0, 0.0, 0.1, 0.0]).unwrap(),
            blink: 0.8,
            eyebrow: 0.3,
            aux: AuxEmotion {
                label: "stressed".to_string(),
                stress: 0.75,
            },
        };
        let result = FusionEngine::new().combine(&signals, true);
        assert!((result.stress_level - 0.37).abs() < 1e-6);
        assert!((result.debug.model_stress - 0.3).abs() < 1e-6);
        assert_eq!(result.emotion_label, "angry");
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.debug.service_emotion, "stressed");
        assert!(result.face_detected);
    }

    #[test]
    fn test_combine_is_deterministic() {
        let signals = SignalSet {
            distribution: EmotionDistribution::neutral(),
            blink: 0.5,
            eyebrow: 0.5,
            aux: AuxEmotion {
                label: "neutral".to_string(),
                stress: 0.5,
            },
        };
        let engine = FusionEngine::new();
        assert_eq!(engine.combine(&signals, true), engine.combine(&signals, true));
        // neutral defaults: 0.4*0 + 0.2*0.5 + 0.2*0.5 + 0.2*0.5
        assert!(close(engine.combine(&signals, true).stress_level, 0.3));
    }
}
