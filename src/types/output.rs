//! Fusion output and the `stress_update` wire payload

use chrono::Utc;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::NO_FACE_LABEL;

/// Raw component values carried alongside every fused reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionDebug {
    pub model_stress: f64,
    pub blink_metric: f64,
    pub eyebrow_metric: f64,
    pub service_emotion: String,
    pub service_stress: f64,
}

/// One fused reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Fused score in [0, 1]
    pub stress_level: f64,
    /// Classifier arg-max label, or "NO FACE"
    pub emotion_label: String,
    /// Classifier arg-max probability
    pub confidence: f64,
    pub face_detected: bool,
    pub debug: FusionDebug,
}

impl FusedResult {
    /// Same reading reported as face absent; debug values are kept
    pub fn masked_absent(mut self) -> Self {
        self.stress_level = 0.0;
        self.emotion_label = NO_FACE_LABEL.to_string();
        self.confidence = 0.0;
        self.face_detected = false;
        self
    }
}

/// Payload of the `stress_update` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressUpdate {
    pub level: f64,
    pub emotion: String,
    pub confidence: f64,
    pub face_detected: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<FusionDebug>,
}

impl StressUpdate {
    /// One-shot "face lost" payload for frames that never reached the estimators
    pub fn face_absent() -> Self {
        Self {
            level: 0.0,
            emotion: NO_FACE_LABEL.to_string(),
            confidence: 0.0,
            face_detected: false,
            timestamp: Utc::now().to_rfc3339(),
            debug: None,
        }
    }

    /// Single line for the console feed
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "level={:.3} | emotion={} | confidence={:.2} | face={}",
            self.level, self.emotion, self.confidence, self.face_detected
        );
        if !self.face_detected {
            line.dimmed().to_string()
        } else if self.level >= crate::ALERT_HIGH {
            line.red().to_string()
        } else if self.level >= crate::ALERT_MODERATE {
            line.yellow().to_string()
        } else {
            line.green().to_string()
        }
    }
}

impl From<FusedResult> for StressUpdate {
    fn from(result: FusedResult) -> Self {
        Self {
            level: result.stress_level,
            emotion: result.emotion_label,
            confidence: result.confidence,
            face_detected: result.face_detected,
            timestamp: Utc::now().to_rfc3339(),
            debug: Some(result.debug),
        }
    }
}
