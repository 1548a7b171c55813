//! Presence Debouncer: consecutive no-face run length with a threshold
//!
//! State transitions:
//! - any → FACE_PRESENT: usable face (count reset to 0)
//! - FACE_PRESENT / PENDING → PENDING: absent frame, count < threshold
//! - PENDING → CONFIRMED: count reaches threshold (one-shot `just_lost`)
//! - CONFIRMED → CONFIRMED: still absent

use crate::types::{Observation, PresenceDecision, PresenceReason, PresenceState};
use crate::NO_FACE_THRESHOLD;

/// Presence state machine
///
/// Owned by the camera loop; the only temporal state in the pipeline.
#[derive(Debug, Clone)]
pub struct PresenceDebouncer {
    /// Consecutive absent frames
    consecutive_absent: u32,
    /// Frames needed to confirm absence (≥ 1)
    threshold: u32,
    /// Sampled frames observed
    update_count: u64,
}

impl Default for PresenceDebouncer {
    fn default() -> Self {
        Self::new(NO_FACE_THRESHOLD)
    }
}

impl PresenceDebouncer {
    /// A threshold of 0 is raised to 1
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_absent: 0,
            threshold: threshold.max(1),
            update_count: 0,
        }
    }

    /// Feed one sampled frame, return the verdict for it
    pub fn observe(&mut self, observation: Observation) -> PresenceDecision {
        self.update_count += 1;
        let previous = self.consecutive_absent;

        if observation.is_absent() {
            self.consecutive_absent = self.consecutive_absent.saturating_add(1);
        } else {
            self.consecutive_absent = 0;
        }

        let just_lost = self.consecutive_absent == self.threshold && previous < self.threshold;
        let reason = self.compute_reason(observation, previous, just_lost);

        PresenceDecision {
            state: self.state(),
            face_detected: self.face_detected(),
            just_lost,
            consecutive_absent: self.consecutive_absent,
            reason,
        }
    }

    fn compute_reason(&self, observation: Observation, previous: u32, just_lost: bool) -> PresenceReason {
        match observation {
            Observation::Face if previous > 0 => PresenceReason::P001_FACE_RECOVERED,
            Observation::Face => PresenceReason::P001_FACE_PRESENT,
            _ if just_lost => PresenceReason::P003_FACE_LOST,
            _ if self.consecutive_absent > self.threshold => PresenceReason::P003_STILL_ABSENT,
            Observation::LowQuality => PresenceReason::P002_LOW_QUALITY_PENDING,
            Observation::NoFace => PresenceReason::P002_NO_FACE_PENDING,
        }
    }

    pub fn state(&self) -> PresenceState {
        if self.consecutive_absent == 0 {
            PresenceState::FacePresent
        } else if self.consecutive_absent < self.threshold {
            PresenceState::FaceAbsentPending
        } else {
            PresenceState::FaceAbsentConfirmed
        }
    }

    /// Reported flag: true until the run of absent frames reaches the threshold
    pub fn face_detected(&self) -> bool {
        self.consecutive_absent < self.threshold
    }

    pub fn consecutive_absent(&self) -> u32 {
        self.consecutive_absent
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

// =============================================================================
// TESTS
// =============================================================================
