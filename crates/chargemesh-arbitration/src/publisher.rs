//! Message broker sink
//!
//! The broker client itself is an external collaborator. Arbitration only
//! needs to hand it a topic and a payload.

use async_trait::async_trait;
use parking_lot::Mutex;

use chargemesh_core::PublishError;

/// Sink for computed state and telemetry
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `topic`
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

/// A single publication captured by [`RecordingPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
}

/// In-memory publisher for tests and the simulator
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Publication>>,
    offline: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail with `NotConnected` while `offline` is set
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Everything published so far, oldest first
    pub fn published(&self) -> Vec<Publication> {
        self.published.lock().clone()
    }

    /// Most recent payload on `topic`
    pub fn last_payload(&self, topic: &str) -> Option<String> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|p| p.topic == topic)
            .map(|p| p.payload.clone())
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        if *self.offline.lock() {
            return Err(PublishError::NotConnected);
        }
        self.published.lock().push(Publication {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }
}
