//! Reason codes for presence decisions

use serde::{Deserialize, Serialize};

/// Reason attached to every debouncer decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum PresenceReason {
    // =========================================================================
    // P001: Face present
    // =========================================================================
    /// Face found, nothing to recover from
    P001_FACE_PRESENT,
    /// Face found after one or more absent frames
    P001_FACE_RECOVERED,

    // =========================================================================
    // P002: Absence accumulating
    // =========================================================================
    /// Locator found no face, below threshold
    P002_NO_FACE_PENDING,
    /// Frame too dark or flat, below threshold
    P002_LOW_QUALITY_PENDING,

    // =========================================================================
    // P003: Absence confirmed
    // =========================================================================
    /// Count reached the threshold on this frame
    P003_FACE_LOST,
    /// Still absent past the threshold
    P003_STILL_ABSENT,
}

impl PresenceReason {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::P001_FACE_PRESENT => "P001_FACE_PRESENT",
            Self::P001_FACE_RECOVERED => "P001_FACE_RECOVERED",
            Self::P002_NO_FACE_PENDING => "P002_NO_FACE_PENDING",
            Self::P002_LOW_QUALITY_PENDING => "P002_LOW_QUALITY_PENDING",
            Self::P003_FACE_LOST => "P003_FACE_LOST",
            Self::P003_STILL_ABSENT => "P003_STILL_ABSENT",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::P001_FACE_PRESENT => "Face present",
            Self::P001_FACE_RECOVERED => "Face recovered",
            Self::P002_NO_FACE_PENDING => "No face, waiting for threshold",
            Self::P002_LOW_QUALITY_PENDING => "Frame too dark or flat",
            Self::P003_FACE_LOST => "Face lost",
            Self::P003_STILL_ABSENT => "Face still absent",
        }
    }
}

impl std::fmt::Display for PresenceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
