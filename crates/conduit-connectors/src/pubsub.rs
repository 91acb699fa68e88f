//! Pub/sub client that records registrations.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use conduit_api::{Effect, PubSubClient};
use tracing::debug;

#[derive(Debug, Default)]
struct Log {
    events: Vec<Effect>,
    live: BTreeMap<String, usize>,
}

/// Records every subscribe/unsubscribe in order and tracks how many
/// registrations are live per topic.
#[derive(Debug, Default)]
pub struct RecordingPubSub {
    log: Mutex<Log>,
}

impl RecordingPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every registration call so far, oldest first.
    pub fn events(&self) -> Vec<Effect> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Topics with at least one live registration, sorted.
    pub fn live_topics(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .keys()
            .cloned()
            .collect()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .get(topic)
            .copied()
            .unwrap_or(0)
    }
}

impl PubSubClient for RecordingPubSub {
    fn subscribe(&self, topic: &str) {
        debug!(%topic, "subscribe");
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.events.push(Effect::Subscribe(topic.to_string()));
        *log.live.entry(topic.to_string()).or_insert(0) += 1;
    }

    fn unsubscribe(&self, topic: &str) {
        debug!(%topic, "unsubscribe");
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.events.push(Effect::Unsubscribe(topic.to_string()));
        if let Some(count) = log.live.get_mut(topic) {
            *count -= 1;
            if *count == 0 {
                log.live.remove(topic);
            }
        }
    }
}
