//! FER emotion classes and classifier output

use serde::{Deserialize, Serialize};

/// The seven FER classes, in classifier output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

/// Canonical class order; a loaded classifier must declare exactly this list
pub const EMOTION_ORDER: [Emotion; 7] = [
    Emotion::Angry,
    Emotion::Disgust,
    Emotion::Fear,
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Surprise,
    Emotion::Neutral,
];

/// Classes averaged into the classifier's stress reading
pub const NEGATIVE_EMOTIONS: [Emotion; 3] = [Emotion::Angry, Emotion::Disgust, Emotion::Fear];

impl Emotion {
    /// Output index in the classifier's probability vector
    pub fn index(&self) -> usize {
        match self {
            Emotion::Angry => 0,
            Emotion::Disgust => 1,
            Emotion::Fear => 2,
            Emotion::Happy => 3,
            Emotion::Sad => 4,
            Emotion::Surprise => 5,
            Emotion::Neutral => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        EMOTION_ORDER
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Probability vector over the seven classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionDistribution {
    probs: [f32; 7],
}

impl EmotionDistribution {
    /// Build from classifier output; `None` unless 7 finite values in [0, 1]
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        if values.len() != EMOTION_ORDER.len() {
            return None;
        }
        if values.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
            return None;
        }
        let mut probs = [0.0; 7];
        probs.copy_from_slice(values);
        Some(Self { probs })
    }

    /// All mass on neutral
    pub fn neutral() -> Self {
        let mut probs = [0.0; 7];
        probs[Emotion::Neutral.index()] = 1.0;
        Self { probs }
    }

    pub fn probability(&self, emotion: Emotion) -> f32 {
        self.probs[emotion.index()]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.probs
    }

    /// Arg-max class and its probability; ties go to the lower index
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = 0;
        for i in 1..self.probs.len() {
            if self.probs[i] > self.probs[best] {
                best = i;
            }
        }
        (EMOTION_ORDER[best], self.probs[best] as f64)
    }

    /// Mean probability of the negative classes, clamped to [0, 1]
    pub fn negative_mean(&self) -> f64 {
        let sum: f64 = NEGATIVE_EMOTIONS
            .iter()
            .map(|e| self.probability(*e) as f64)
            .sum();
        (sum / NEGATIVE_EMOTIONS.len() as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_index() {
        for (i, e) in EMOTION_ORDER.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }

    #[test]
    fn test_negative_classes_lead_the_order() {
        let idx: Vec<usize> = NEGATIVE_EMOTIONS.iter().map(|e| e.index()).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_slice_rejects_bad_vectors() {
        assert!(EmotionDistribution::from_slice(&[0.5; 6]).is_none());
        assert!(EmotionDistribution::from_slice(&[f32::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_none());
        assert!(EmotionDistribution::from_slice(&[1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_dominant_and_negative_mean() {
        let d = EmotionDistribution::from_slice(&[0.9, 0.0, 0.0, 0.0, 0.0, 0.1, 0.0]).unwrap();
        let (emotion, confidence) = d.dominant();
        assert_eq!(emotion, Emotion::Angry);
        assert!((confidence - 0.9).abs() < 1e-6);
        assert!((d.negative_mean() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_default() {
        let d = EmotionDistribution::neutral();
        assert_eq!(d.dominant(), (Emotion::Neutral, 1.0));
        assert_eq!(d.negative_mean(), 0.0);
    }

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(Emotion::from_label("Fear"), Some(Emotion::Fear));
        assert_eq!(Emotion::from_label("bored"), None);
    }
}
