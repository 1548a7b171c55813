//! Core modules for StressFuse

pub mod alerts;
pub mod api;
pub mod camera;
pub mod emitter;
pub mod estimators;
pub mod face;
pub mod fusion;
pub mod mailbox;
pub mod market;
pub mod models;
pub mod pipeline;
pub mod presence;
pub mod quality;
pub mod replay;
pub mod scheduler;

pub use alerts::AlertTracker;
pub use api::{create_router, run_server, AppState, JpegCache};
pub use camera::{acquire_camera, CameraBackend, FrameSource};
pub use emitter::{BroadcastEmitter, BroadcastEvent, EVENT_CHANNEL_CAPACITY};
pub use estimators::SignalExtractor;
pub use face::{FaceDetector, FaceLocator};
pub use fusion::{fuse, FusionEngine};
pub use mailbox::PreviewMailbox;
pub use market::{market_stress, MarketWorker, MockPriceSource, PriceSource};
pub use models::{AuxClassifier, EmotionClassifier, FaceModels, LandmarkPredictor, ModelPaths, ModelService};
pub use pipeline::{FrameOutcome, StressPipeline};
pub use presence::PresenceDebouncer;
pub use quality::{FrameStats, QualityGate};
pub use replay::{ReplayAnnotations, ReplayBackend};
pub use scheduler::{LoopStats, SamplingScheduler, StopSignal};
