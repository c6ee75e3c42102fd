//! Publisher seam between the core pipeline and the broker transport.
//!
//! Discovery announcements and state reports go through this trait instead
//! of a concrete client, which keeps the pipeline testable against an
//! in-memory publisher and the transport swappable.

use async_trait::async_trait;

/// At-least-once delivery, the level every message in this system uses.
pub const QOS_AT_LEAST_ONCE: u8 = 1;

/// Boxed error type for publish failures.
pub type PublishError = Box<dyn std::error::Error + Send + Sync>;

/// Sink for outbound broker messages.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one message to `topic` with the requested quality of
    /// service and retain flag.
    async fn publish(
        &self,
        topic: &str,
        qos: u8,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), PublishError>;
}

#[async_trait]
impl Publisher for sysbeacon_mqtt::Transport {
    async fn publish(
        &self,
        topic: &str,
        qos: u8,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), PublishError> {
        sysbeacon_mqtt::Transport::publish(
            self,
            topic,
            sysbeacon_mqtt::qos_level(qos),
            retain,
            payload,
        )
        .await
        .map_err(|e| Box::new(e) as PublishError)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory publisher used by the discovery and reporter tests.

    use std::sync::Mutex;

    use super::*;

    /// One captured publish call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub topic: String,
        pub qos: u8,
        pub retain: bool,
        pub payload: Vec<u8>,
    }

    /// Publisher that records every message, optionally failing on selected
    /// topics.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub messages: Mutex<Vec<Recorded>>,
        pub fail_topics: Vec<String>,
    }

    impl RecordingPublisher {
        pub fn failing_on(topics: &[&str]) -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
                fail_topics: topics.iter().map(|t| t.to_string()).collect(),
            }
        }

        pub fn recorded(&self) -> Vec<Recorded> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            qos: u8,
            retain: bool,
            payload: Vec<u8>,
        ) -> Result<(), PublishError> {
            if self.fail_topics.iter().any(|t| t == topic) {
                return Err(format!("refused publish to {topic}").into());
            }
            self.messages.lock().unwrap().push(Recorded {
                topic: topic.to_string(),
                qos,
                retain,
                payload,
            });
            Ok(())
        }
    }
}
