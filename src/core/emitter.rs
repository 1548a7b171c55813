//! Broadcast Emitter
//!
//! Fire-and-forget fan-out to every connected subscriber. The hosting layer
//! injects the channel once with `set_app_context`; until then events are
//! dropped. A lagging subscriber loses events, the sender never waits.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{Error, Result};

/// Default channel depth used by the binary
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub const STRESS_UPDATE: &str = "stress_update";
pub const STRESS_ALERT: &str = "stress_alert";
pub const MARKET_UPDATE: &str = "market_update";

/// One named event as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct BroadcastEmitter {
    tx: OnceLock<broadcast::Sender<BroadcastEvent>>,
}

impl BroadcastEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitter already wired to a fresh channel
    pub fn with_channel(capacity: usize) -> Self {
        let emitter = Self::new();
        let (tx, _) = broadcast::channel(capacity.max(1));
        // fresh OnceLock, cannot already be set
        let _ = emitter.tx.set(tx);
        emitter
    }

    /// One-shot injection of the delivery channel
    pub fn set_app_context(&self, tx: broadcast::Sender<BroadcastEvent>) -> Result<()> {
        self.tx.set(tx).map_err(|_| Error::ContextAlreadySet)
    }

    /// Push `payload` under `event` to everyone listening right now
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) {
        let Some(tx) = self.tx.get() else {
            debug!(event, "No broadcast context yet, event dropped");
            return;
        };
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                debug!(event, error = %e, "Payload not serializable, event dropped");
                return;
            }
        };
        // Err only means nobody is subscribed
        if tx
            .send(BroadcastEvent {
                event: event.to_string(),
                data,
            })
            .is_err()
        {
            debug!(event, "No subscribers");
        }
    }

    /// New receiver, or `None` before the context is set
    pub fn subscribe(&self) -> Option<broadcast::Receiver<BroadcastEvent>> {
        self.tx.get().map(|tx| tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.get().map(|tx| tx.receiver_count()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_before_context_are_dropped() {
        let emitter = BroadcastEmitter::new();
        emitter.emit(STRESS_UPDATE, &json!({"level": 0.1}));
        assert!(emitter.subscribe().is_none());
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[test]
    fn test_context_is_one_shot() {
        let emitter = BroadcastEmitter::new();
        let (tx, _) = broadcast::channel(4);
        assert!(emitter.set_app_context(tx.clone()).is_ok());
        assert!(matches!(emitter.set_app_context(tx), Err(Error::ContextAlreadySet)));
    }

    #[test]
    fn test_fan_out_to_every_subscriber() {
        let emitter = BroadcastEmitter::with_channel(8);
        let mut a = emitter.subscribe().unwrap();
        let mut b = emitter.subscribe().unwrap();
        assert_eq!(emitter.subscriber_count(), 2);

        emitter.emit(STRESS_UPDATE, &json!({"level": 0.37}));

        for rx in [&mut a, &mut b] {
            let event = rx.try_recv().unwrap();
            assert_eq!(event.event, "stress_update");
            assert_eq!(event.data["level"], 0.37);
        }
    }

    #[test]
    fn test_emit_without_subscribers_does_not_block() {
        let emitter = BroadcastEmitter::with_channel(1);
        for i in 0..10 {
            emitter.emit(MARKET_UPDATE, &json!({"i": i}));
        }
    }

    #[test]
    fn test_slow_subscriber_lags_instead_of_blocking() {
        let emitter = BroadcastEmitter::with_channel(2);
        let mut rx = emitter.subscribe().unwrap();
        for i in 0..5 {
            emitter.emit(STRESS_UPDATE, &json!({"i": i}));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
        assert_eq!(rx.try_recv().unwrap().data["i"], 3);
    }
}
