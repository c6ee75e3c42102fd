//! State snapshot assembly and publication.
//!
//! On every scheduler tick the reporter queries each enabled provider,
//! assembles one [`StateSnapshot`], and publishes it as a single JSON
//! message on the device's state topic. A snapshot is built fresh per pass
//! and never cached; its key set is exactly the enabled metric set, tick
//! after tick.
//!
//! Failure policy: if any provider fails, the whole pass is abandoned and
//! nothing is published for that tick. Publishing a partial snapshot would
//! make absent keys indistinguishable from disabled metrics on the consumer
//! side. The error is logged by the caller and the next tick proceeds
//! normally.

use std::path::PathBuf;
use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::config::Settings;
use crate::core::metrics::MetricSet;
use crate::core::providers::{self, ProviderError};
use crate::core::publish::{PublishError, Publisher, QOS_AT_LEAST_ONCE};

/// State topic for a device, shared by the reporter and every discovery
/// announcement.
pub fn state_topic(device_name: &str) -> String {
    format!("system-sensors/sensor/{device_name}/state")
}

/// One collection pass worth of readings.
///
/// Field order is wire order. The optional fields serialize only when their
/// metric is enabled, so the JSON key set equals the enabled metric set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_use: Option<f64>,
    pub memory_use: f64,
    pub cpu_usage: f64,
    pub swap_usage: f64,
    pub power_status: String,
    pub last_boot: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi_strength: Option<i64>,
}

/// Why a collection pass produced no state message.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A provider query failed; the tick was abandoned.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The snapshot could not be encoded.
    #[error("failed to encode state payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport rejected the publish.
    #[error("state publish failed: {0}")]
    Publish(#[source] PublishError),
}

/// Collects the enabled metrics and publishes the state message.
pub struct StateReporter {
    topic: String,
    timezone: Tz,
    disk: Option<PathBuf>,
    wifi: bool,
    power_numeric: bool,
    publisher: Arc<dyn Publisher>,
}

impl StateReporter {
    pub fn new(settings: &Settings, metrics: &MetricSet, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            topic: state_topic(&settings.device_name),
            timezone: settings.timezone,
            disk: metrics.disk.clone(),
            wifi: metrics.wifi,
            power_numeric: metrics.power_numeric,
            publisher,
        }
    }

    /// Runs one full pass: query, assemble, publish.
    pub async fn collect_and_publish(&self) -> Result<(), ReportError> {
        let snapshot = self.collect().await?;
        self.publish(&snapshot).await
    }

    /// Queries every enabled provider. No reading depends on another; the
    /// first failure aborts the pass.
    pub async fn collect(&self) -> Result<StateSnapshot, ProviderError> {
        let temperature = providers::temperature::celsius().await?;
        let disk_use = match &self.disk {
            Some(path) => Some(providers::disk::usage_percent(path).await?),
            None => None,
        };
        let memory_use = providers::memory::memory_use().await?;
        let cpu_usage = providers::cpu::usage_percent().await?;
        let swap_usage = providers::memory::swap_usage().await?;
        let power_status = providers::power::power_status(self.power_numeric).await?;
        let last_boot = providers::boot::last_boot(self.timezone).await?;
        let wifi_strength = if self.wifi {
            Some(providers::wifi::signal_dbm().await?)
        } else {
            None
        };

        Ok(StateSnapshot {
            temperature,
            disk_use,
            memory_use,
            cpu_usage,
            swap_usage,
            power_status,
            last_boot,
            wifi_strength,
        })
    }

    /// Publishes a snapshot to the state topic: QoS 1, not retained.
    pub async fn publish(&self, snapshot: &StateSnapshot) -> Result<(), ReportError> {
        let payload = serde_json::to_vec(snapshot)?;
        self.publisher
            .publish(&self.topic, QOS_AT_LEAST_ONCE, false, payload)
            .await
            .map_err(ReportError::Publish)
    }

    /// Topic this reporter publishes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::publish::testing::RecordingPublisher;

    fn snapshot() -> StateSnapshot {
        StateSnapshot {
            temperature: 48.3,
            disk_use: Some(12.5),
            memory_use: 41.0,
            cpu_usage: 3.2,
            swap_usage: 0.0,
            power_status: "Everything is working as intended".to_string(),
            last_boot: "2021-01-01T01:00:00+01:00".to_string(),
            wifi_strength: None,
        }
    }

    fn settings(extra: &str) -> Settings {
        let doc = format!(
            r#"
            timezone = "UTC"
            deviceName = "Pi"
            client_id = "c1"
            {extra}

            [mqtt]
            hostname = "broker.local"
            "#
        );
        Settings::from_toml(&doc).unwrap()
    }

    #[test]
    fn state_topic_embeds_the_device_name() {
        assert_eq!(state_topic("Pi"), "system-sensors/sensor/Pi/state");
    }

    #[test]
    fn snapshot_keys_follow_the_enabled_set() {
        let json = serde_json::to_value(snapshot()).unwrap();
        let mut keys: Vec<&str> =
            json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();

        let mut expected = vec![
            "temperature",
            "disk_use",
            "memory_use",
            "cpu_usage",
            "swap_usage",
            "power_status",
            "last_boot",
        ];
        expected.sort_unstable();
        assert_eq!(keys, expected);

        // Wire order follows field declaration order.
        let encoded = serde_json::to_string(&snapshot()).unwrap();
        assert!(encoded.starts_with("{\"temperature\":"));
        let disk_at = encoded.find("disk_use").unwrap();
        let memory_at = encoded.find("memory_use").unwrap();
        let boot_at = encoded.find("last_boot").unwrap();
        assert!(disk_at < memory_at && memory_at < boot_at);
    }

    #[test]
    fn disabled_metrics_leave_no_key_behind() {
        let mut snap = snapshot();
        snap.disk_use = None;
        let json = serde_json::to_value(snap).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("disk_use"));
        assert!(!object.contains_key("wifi_strength"));
        assert_eq!(object.len(), 6);
    }

    #[test]
    fn wifi_reading_serializes_as_integer_dbm() {
        let mut snap = snapshot();
        snap.wifi_strength = Some(-56);
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["wifi_strength"], serde_json::json!(-56));
    }

    #[tokio::test]
    async fn publish_targets_the_state_topic_unretained() {
        let publisher = Arc::new(RecordingPublisher::default());
        let settings = settings("");
        let metrics = MetricSet {
            disk: None,
            wifi: false,
            power_numeric: false,
            device_model: "RPi4".into(),
        };
        let reporter = StateReporter::new(&settings, &metrics, publisher.clone());

        reporter.publish(&snapshot()).await.unwrap();

        let recorded = publisher.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].topic, "system-sensors/sensor/Pi/state");
        assert_eq!(recorded[0].qos, 1);
        assert!(!recorded[0].retain);

        let payload: serde_json::Value = serde_json::from_slice(&recorded[0].payload).unwrap();
        assert_eq!(payload["temperature"], serde_json::json!(48.3));
    }

    #[tokio::test]
    async fn publish_failure_is_reported_not_swallowed() {
        let publisher = Arc::new(RecordingPublisher::failing_on(&[
            "system-sensors/sensor/Pi/state",
        ]));
        let settings = settings("");
        let metrics = MetricSet {
            disk: None,
            wifi: false,
            power_numeric: false,
            device_model: "RPi4".into(),
        };
        let reporter = StateReporter::new(&settings, &metrics, publisher);

        let err = reporter.publish(&snapshot()).await.unwrap_err();
        assert!(matches!(err, ReportError::Publish(_)));
    }
}
