//! Error type shared by every fallible operation in the crate

use std::path::PathBuf;
use thiserror::Error;

/// StressFuse error
#[derive(Debug, Error)]
pub enum Error {
    // =========================================================================
    // Models / collaborators
    // =========================================================================
    #[error("Model file not found: {0}")]
    ModelMissing(PathBuf),

    #[error("Invalid model file {path}: {reason}")]
    ModelFormat { path: PathBuf, reason: String },

    #[error("Classifier label order mismatch: expected {expected:?}, model declares {declared:?}")]
    LabelOrder {
        expected: Vec<String>,
        declared: Vec<String>,
    },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Landmarks unavailable: {0}")]
    Landmarks(String),

    #[error("Face detection failed: {0}")]
    Detection(String),

    // =========================================================================
    // Frames / camera
    // =========================================================================
    #[error("Frame decode failed: {0}")]
    FrameDecode(String),

    #[error("Invalid frame buffer: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("No camera available after probing {tried} device indices")]
    CameraUnavailable { tried: u32 },

    // =========================================================================
    // Broadcast / market
    // =========================================================================
    #[error("Broadcast context already set")]
    ContextAlreadySet,

    #[error("Price source error: {0}")]
    PriceSource(String),

    // =========================================================================
    // Wrapped
    // =========================================================================
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
