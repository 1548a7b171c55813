//! Single-slot preview mailbox
//!
//! The camera loop publishes every captured frame; HTTP handlers copy the
//! latest one out. The lock is held only for the swap or the clone.

use parking_lot::Mutex;

use crate::types::Frame;

#[derive(Debug, Default)]
pub struct PreviewMailbox {
    slot: Mutex<Option<Frame>>,
}

impl PreviewMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame
    pub fn publish(&self, frame: Frame) {
        *self.slot.lock() = Some(frame);
    }

    /// Copy of the latest frame, or `None` before the first publish
    pub fn latest(&self) -> Option<Frame> {
        self.slot.lock().clone()
    }

    /// Index of the latest frame without copying pixels
    pub fn latest_index(&self) -> Option<u64> {
        self.slot.lock().as_ref().map(|f| f.index())
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}
