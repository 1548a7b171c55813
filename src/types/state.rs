//! Presence state definitions

use serde::{Deserialize, Serialize};

use crate::types::PresenceReason;

/// The three presence states of the capture loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    /// Last sampled frame had a usable face
    FacePresent,
    /// Some no-face frames, threshold not reached yet
    FaceAbsentPending,
    /// Threshold reached, face reported lost
    FaceAbsentConfirmed,
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PresenceState::FacePresent => "FACE_PRESENT",
            PresenceState::FaceAbsentPending => "FACE_ABSENT_PENDING",
            PresenceState::FaceAbsentConfirmed => "FACE_ABSENT_CONFIRMED",
        };
        write!(f, "{}", name)
    }
}

/// What a sampled frame told the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// Face locator returned a region
    Face,
    /// Frame was usable but no face was found
    NoFace,
    /// Frame failed the brightness/contrast gate
    LowQuality,
}

impl Observation {
    pub fn is_absent(&self) -> bool {
        !matches!(self, Observation::Face)
    }
}

/// Debouncer verdict for one sampled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDecision {
    pub state: PresenceState,
    /// `consecutive_absent < threshold`
    pub face_detected: bool,
    /// True only on the frame where the count first reaches the threshold
    pub just_lost: bool,
    pub consecutive_absent: u32,
    pub reason: PresenceReason,
}
