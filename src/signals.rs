//! Registry event signals
//!
//! Every committed mutation publishes one signal to an outbound broadcast
//! channel. Indexers and UIs subscribe independently; a lagging or absent
//! subscriber never blocks or fails the originating operation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Signals emitted after committed registry mutations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RegistrySignal {
    /// A new record was accepted
    #[serde(rename_all = "camelCase")]
    Submitted {
        id: u64,
        submitter: String,
        content_ref: String,
        category: String,
        title: String,
    },

    /// A vote was recorded
    #[serde(rename_all = "camelCase")]
    Voted {
        id: u64,
        voter: String,
        is_upvote: bool,
    },
}

/// Signal broadcaster
#[derive(Clone)]
pub struct SignalBroadcaster {
    tx: broadcast::Sender<RegistrySignal>,
}

impl SignalBroadcaster {
    pub fn new(capacity: usize) -> Self {
        // broadcast::channel panics on zero capacity; a config-supplied 0
        // must not take the registry down
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit a signal; dropped silently when nobody is subscribed
    pub fn emit(&self, signal: RegistrySignal) {
        let _ = self.tx.send(signal);
    }

    /// Subscribe to signals from this point onward
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrySignal> {
        self.tx.subscribe()
    }
}
