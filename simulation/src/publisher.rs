//! Broker stand-in that logs every publication

use async_trait::async_trait;
use tracing::info;

use chargemesh_arbitration::{Publication, Publisher, RecordingPublisher};
use chargemesh_core::PublishError;

/// Logs publications and keeps them for the end-of-run report
#[derive(Debug)]
pub struct LoggingPublisher {
    node: String,
    recorder: RecordingPublisher,
}

impl LoggingPublisher {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            recorder: RecordingPublisher::new(),
        }
    }

    pub fn published(&self) -> Vec<Publication> {
        self.recorder.published()
    }

    pub fn last_payload(&self, topic: &str) -> Option<String> {
        self.recorder.last_payload(topic)
    }
}

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        info!(node = %self.node, topic, payload, "MQTT publish");
        self.recorder.publish(topic, payload).await
    }
}
