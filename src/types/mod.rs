//! Core types for StressFuse

mod emotion;
mod frame;
mod market;
mod output;
mod reason;
mod signals;
mod state;

pub use emotion::{Emotion, EmotionDistribution, EMOTION_ORDER, NEGATIVE_EMOTIONS};
pub use frame::{ColorSpace, FaceRegion, Frame, Point};
pub use market::{
    supported_assets, AlertSeverity, Asset, AssetKind, MarketUpdate, Quote, StressAlert,
    SUPPORTED_CRYPTOS, SUPPORTED_STOCKS,
};
pub use output::{FusedResult, FusionDebug, StressUpdate};
pub use reason::PresenceReason;
pub use signals::{AuxEmotion, SignalReading, SignalSet};
pub use state::{Observation, PresenceDecision, PresenceState};
