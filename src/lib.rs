//! StressFuse: live stress fusion from a video stream
//!
//! camera → scheduler → face locator → estimators → fusion → presence gate → broadcast

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{Error, Result};

// =============================================================================
// FUSION WEIGHTS [C] - fixed linear model, sum = 1.0
// =============================================================================

/// Weight of the classifier's negative-emotion mean
pub const W_MODEL: f64 = 0.40;
/// Weight of the inverted blink metric (closed eyes raise stress)
pub const W_BLINK: f64 = 0.20;
/// Weight of the eyebrow metric
pub const W_EYEBROW: f64 = 0.20;
/// Weight of the auxiliary emotion stress
pub const W_AUX: f64 = 0.20;

// =============================================================================
// ESTIMATOR CONSTANTS [C]
// =============================================================================

/// Side of the square grayscale tile fed to the classifier
pub const CLASSIFIER_TILE: u32 = 64;

/// EAR value mapped to blink metric 0.0
pub const EAR_FLOOR: f64 = 0.15;
/// EAR span mapped onto [0, 1]
pub const EAR_SPAN: f64 = 0.25;

/// Brow gap (pixels) at which the eyebrow metric bottoms out
pub const BROW_DISTANCE_SCALE: f64 = 100.0;

/// Aux label that counts as stressed
pub const AUX_STRESSED_LABEL: &str = "stressed";
pub const AUX_STRESSED: f64 = 0.75;
pub const AUX_CALM: f64 = 0.25;
/// Neutral default when the aux classifier is unavailable
pub const AUX_NEUTRAL: f64 = 0.5;

/// Neutral default for the geometric estimators
pub const METRIC_NEUTRAL: f64 = 0.5;

// =============================================================================
// PRESENCE + SAMPLING [C]
// =============================================================================

/// Consecutive no-face sampled frames before the face is reported lost
pub const NO_FACE_THRESHOLD: u32 = 10;

/// Run the AI pipeline on every Nth captured frame
pub const SAMPLE_EVERY: u64 = 3;

/// Frames darker than this mean intensity are treated as no-face
pub const MIN_BRIGHTNESS: f64 = 10.0;
/// Frames flatter than this intensity std-dev are treated as no-face
pub const MIN_CONTRAST: f64 = 3.0;

/// Pause after each sampled frame (milliseconds)
pub const IDLE_SLEEP_MS: u64 = 10;
/// Pause after a transient frame defect (milliseconds)
pub const RETRY_SLEEP_MS: u64 = 100;

/// Device indices probed when acquiring a camera
pub const CAMERA_PROBE_INDICES: u32 = 5;

/// Emotion label reported while the face is absent
pub const NO_FACE_LABEL: &str = "NO FACE";

// =============================================================================
// ALERTS [C]
// =============================================================================

pub const ALERT_MODERATE: f64 = 0.60;
pub const ALERT_HIGH: f64 = 0.75;
pub const ALERT_CRITICAL: f64 = 0.85;

/// Minimum gap between two alerts for the same subject (seconds)
pub const ALERT_COOLDOWN_SECS: u64 = 300;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
