//! Per-frame estimator outputs

use serde::{Deserialize, Serialize};

use crate::types::EmotionDistribution;

/// One estimator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum SignalReading {
    ClassifierDistribution { probs: EmotionDistribution },
    BlinkMetric { value: f64 },
    EyebrowMetric { value: f64 },
    AuxEmotion { label: String, stress: f64 },
}

impl SignalReading {
    pub fn component(&self) -> &'static str {
        match self {
            SignalReading::ClassifierDistribution { .. } => "classifier",
            SignalReading::BlinkMetric { .. } => "blink",
            SignalReading::EyebrowMetric { .. } => "eyebrow",
            SignalReading::AuxEmotion { .. } => "aux",
        }
    }
}

/// Auxiliary classifier label plus its stress mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxEmotion {
    pub label: String,
    pub stress: f64,
}

/// All four readings for one sampled frame
///
/// Every scalar is in [0, 1]; estimators clamp before filling this in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub distribution: EmotionDistribution,
    pub blink: f64,
    pub eyebrow: f64,
    pub aux: AuxEmotion,
}

impl SignalSet {
    pub fn readings(&self) -> [SignalReading; 4] {
        [
            SignalReading::ClassifierDistribution {
                probs: self.distribution,
            },
            SignalReading::BlinkMetric { value: self.blink },
            SignalReading::EyebrowMetric { value: self.eyebrow },
            SignalReading::AuxEmotion {
                label: self.aux.label.clone(),
                stress: self.aux.stress,
            },
        ]
    }
}
