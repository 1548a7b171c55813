//! Runtime configuration
//!
//! Every field has a default, so an empty JSON object is a valid config file.
//! CLI flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub pipeline: PipelineConfig,
    pub market: MarketConfig,
    pub alerts: AlertConfig,
}

impl StressConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: StressConfig = serde_json::from_str(&text)?;
        Ok(config.normalized())
    }

    /// Raise zero strides and thresholds to 1
    pub fn normalized(mut self) -> Self {
        self.pipeline.sample_every = self.pipeline.sample_every.max(1);
        self.pipeline.no_face_threshold = self.pipeline.no_face_threshold.max(1);
        self.market.symbols_per_tick = self.market.symbols_per_tick.max(1);
        self
    }
}

/// Camera loop + fusion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the AI pipeline on every Nth captured frame
    pub sample_every: u64,
    /// Consecutive no-face frames before reporting the face lost
    pub no_face_threshold: u32,
    pub min_brightness: f64,
    pub min_contrast: f64,
    pub idle_sleep_ms: u64,
    pub retry_sleep_ms: u64,
    /// Device indices probed at startup
    pub camera_indices: u32,
    /// Alert subject for fused readings
    pub subject_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_every: crate::SAMPLE_EVERY,
            no_face_threshold: crate::NO_FACE_THRESHOLD,
            min_brightness: crate::MIN_BRIGHTNESS,
            min_contrast: crate::MIN_CONTRAST,
            idle_sleep_ms: crate::IDLE_SLEEP_MS,
            retry_sleep_ms: crate::RETRY_SLEEP_MS,
            camera_indices: crate::CAMERA_PROBE_INDICES,
            subject_id: "user_default".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn retry_sleep(&self) -> Duration {
        Duration::from_millis(self.retry_sleep_ms)
    }
}

/// Market worker cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub symbols_per_tick: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 100,
            symbols_per_tick: 2,
        }
    }
}

impl MarketConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Alert bands and cooldown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub moderate: f64,
    pub high: f64,
    pub critical: f64,
    pub cooldown_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            moderate: crate::ALERT_MODERATE,
            high: crate::ALERT_HIGH,
            critical: crate::ALERT_CRITICAL,
            cooldown_secs: crate::ALERT_COOLDOWN_SECS,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}
