//! Face Locator: first face region in a frame, or none

use std::sync::Arc;
use tracing::debug;

use crate::core::models::ModelService;
use crate::types::{FaceRegion, Frame};
use crate::Result;

/// Underlying face detector
pub trait FaceDetector: Send + Sync {
    /// All faces in detector order
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceRegion>>;
}

/// Picks the primary face for a frame
///
/// Only the first detection is used; additional faces are ignored.
/// A missing or failing detector reads as "no face".
pub struct FaceLocator {
    models: Arc<ModelService>,
}

impl FaceLocator {
    pub fn new(models: Arc<ModelService>) -> Self {
        Self { models }
    }

    pub fn locate(&self, frame: &Frame) -> Option<FaceRegion> {
        let detector = self.models.face_detector()?;
        match detector.detect(frame) {
            Ok(faces) => faces.into_iter().next(),
            Err(e) => {
                debug!(frame = frame.index(), error = %e, "Face detection failed");
                None
            }
        }
    }
}
