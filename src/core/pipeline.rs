//! Per-frame orchestration
//!
//! quality gate → face locator → estimators → fusion → presence gate → emit
//!
//! Exactly one `stress_update` leaves for every frame that reaches the
//! estimators. Low-quality frames only feed the debouncer; they emit solely
//! on the frame where the absent count first reaches the threshold.

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::StressConfig;
use crate::core::alerts::AlertTracker;
use crate::core::emitter::{BroadcastEmitter, STRESS_ALERT, STRESS_UPDATE};
use crate::core::estimators::SignalExtractor;
use crate::core::face::FaceLocator;
use crate::core::fusion::FusionEngine;
use crate::core::models::ModelService;
use crate::core::presence::PresenceDebouncer;
use crate::core::quality::{FrameStats, QualityGate};
use crate::types::{Frame, Observation, PresenceDecision, StressAlert, StressUpdate};

/// What happened to one sampled frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub decision: PresenceDecision,
    /// False when the quality gate short-circuited the frame
    pub estimated: bool,
    /// The emitted `stress_update`, if any
    pub update: Option<StressUpdate>,
    pub alert: Option<StressAlert>,
}

/// Owns the per-frame components and the presence state
pub struct StressPipeline {
    quality: QualityGate,
    locator: FaceLocator,
    extractor: SignalExtractor,
    fusion: FusionEngine,
    debouncer: PresenceDebouncer,
    alerts: AlertTracker,
    emitter: Arc<BroadcastEmitter>,
    subject: String,
}

impl StressPipeline {
    pub fn new(models: Arc<ModelService>, emitter: Arc<BroadcastEmitter>, config: &StressConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            quality: QualityGate::new(pipeline.min_brightness, pipeline.min_contrast),
            locator: FaceLocator::new(models.clone()),
            extractor: SignalExtractor::new(models),
            fusion: FusionEngine::new(),
            debouncer: PresenceDebouncer::new(pipeline.no_face_threshold),
            alerts: AlertTracker::new(config.alerts.clone()),
            emitter,
            subject: pipeline.subject_id.clone(),
        }
    }

    pub fn debouncer(&self) -> &PresenceDebouncer {
        &self.debouncer
    }

    /// Run one sampled frame through the whole pipeline
    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        let gray = frame.to_gray();
        let stats = FrameStats::of(&gray);

        if !self.quality.passes(&stats) {
            let decision = self.debouncer.observe(Observation::LowQuality);
            debug!(
                frame = frame.index(),
                mean = stats.mean,
                std_dev = stats.std_dev,
                reason = decision.reason.code(),
                "Low quality frame"
            );
            let update = decision.just_lost.then(|| {
                let update = StressUpdate::face_absent();
                self.emitter.emit(STRESS_UPDATE, &update);
                update
            });
            return FrameOutcome {
                decision,
                estimated: false,
                update,
                alert: None,
            };
        }

        let region = self.locator.locate(frame);
        let observation = if region.is_some() {
            Observation::Face
        } else {
            Observation::NoFace
        };

        let signals = self.extractor.extract(frame, &gray, region.as_ref());
        for reading in signals.readings() {
            debug!(frame = frame.index(), component = reading.component(), ?reading, "Signal reading");
        }
        let decision = self.debouncer.observe(observation);
        let fused = self.fusion.combine(&signals, decision.face_detected);
        let fused = if decision.face_detected {
            fused
        } else {
            fused.masked_absent()
        };

        let update = StressUpdate::from(fused);
        debug!(
            frame = frame.index(),
            level = update.level,
            emotion = %update.emotion,
            reason = decision.reason.code(),
            "Frame fused"
        );
        self.emitter.emit(STRESS_UPDATE, &update);

        let alert = if update.face_detected {
            self.alerts.check(&self.subject, update.level, None, Instant::now())
        } else {
            None
        };
        if let Some(alert) = &alert {
            self.emitter.emit(STRESS_ALERT, alert);
        }

        FrameOutcome {
            decision,
            estimated: true,
            update: Some(update),
            alert,
        }
    }
}
