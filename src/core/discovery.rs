//! Home Assistant MQTT discovery announcements.
//!
//! Before the first collection pass the agent publishes one retained
//! configuration message per enabled metric under
//! `homeassistant/sensor/<device>/<device><Suffix>/config`. Home Assistant
//! materializes each as a sensor entity; because `unique_id` is derived
//! deterministically from the device and metric names, a re-announcement
//! after a restart updates the existing entity instead of creating a new
//! one. Announcements run on every startup — retained messages make the
//! repetition idempotent at the broker.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::core::metrics::MetricSet;
use crate::core::publish::{Publisher, QOS_AT_LEAST_ONCE};
use crate::core::report::state_topic;

/// Static descriptor for one sensor kind.
struct SensorMeta {
    /// Topic path segment, e.g. `Temp` in `…/PiTemp/config`.
    topic_suffix: &'static str,
    /// Entity display-name segment appended to the device name.
    entity_suffix: &'static str,
    /// Key in the state payload this sensor reads.
    value_key: &'static str,
    device_class: Option<&'static str>,
    unit: Option<&'static str>,
    icon: Option<&'static str>,
}

const TEMPERATURE: SensorMeta = SensorMeta {
    topic_suffix: "Temp",
    entity_suffix: "Temperature",
    value_key: "temperature",
    device_class: Some("temperature"),
    unit: Some("°C"),
    icon: Some("mdi:thermometer"),
};

const DISK_USE: SensorMeta = SensorMeta {
    topic_suffix: "DiskUse",
    entity_suffix: "DiskUse",
    value_key: "disk_use",
    device_class: None,
    unit: Some("%"),
    icon: Some("mdi:micro-sd"),
};

const MEMORY_USE: SensorMeta = SensorMeta {
    topic_suffix: "MemoryUse",
    entity_suffix: "MemoryUse",
    value_key: "memory_use",
    device_class: None,
    unit: Some("%"),
    icon: Some("mdi:memory"),
};

const CPU_USAGE: SensorMeta = SensorMeta {
    topic_suffix: "CpuUsage",
    entity_suffix: "CpuUsage",
    value_key: "cpu_usage",
    device_class: None,
    unit: Some("%"),
    icon: Some("mdi:memory"),
};

const SWAP_USAGE: SensorMeta = SensorMeta {
    topic_suffix: "SwapUsage",
    entity_suffix: "SwapUsage",
    value_key: "swap_usage",
    device_class: None,
    unit: Some("%"),
    icon: Some("mdi:harddisk"),
};

const POWER_STATUS: SensorMeta = SensorMeta {
    topic_suffix: "PowerStatus",
    entity_suffix: "PowerStatus",
    value_key: "power_status",
    device_class: None,
    unit: None,
    icon: Some("mdi:power-plug"),
};

const LAST_BOOT: SensorMeta = SensorMeta {
    topic_suffix: "LastBoot",
    entity_suffix: "LastBoot",
    value_key: "last_boot",
    device_class: Some("timestamp"),
    unit: None,
    icon: Some("mdi:clock"),
};

const WIFI_STRENGTH: SensorMeta = SensorMeta {
    topic_suffix: "WifiStrength",
    entity_suffix: "WifiStrength",
    value_key: "wifi_strength",
    device_class: Some("signal_strength"),
    unit: Some("dBm"),
    icon: None,
};

/// The descriptors for an enabled metric set, in payload order.
fn sensor_catalog(metrics: &MetricSet) -> Vec<&'static SensorMeta> {
    let mut catalog = vec![&TEMPERATURE];
    if metrics.disk.is_some() {
        catalog.push(&DISK_USE);
    }
    catalog.extend([&MEMORY_USE, &CPU_USAGE, &SWAP_USAGE, &POWER_STATUS, &LAST_BOOT]);
    if metrics.wifi {
        catalog.push(&WIFI_STRENGTH);
    }
    catalog
}

/// Device descriptor block, identical across all of a device's entries so
/// the consumer groups the sensors under one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceBlock {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
}

/// One retained discovery payload. Field order is wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    pub name: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    pub value_template: String,
    pub unique_id: String,
    pub device: DeviceBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
}

/// Builds and publishes the discovery announcements for one device.
pub struct DiscoveryAnnouncer {
    entries: Vec<(String, DiscoveryEntry)>,
    publisher: Arc<dyn Publisher>,
}

impl DiscoveryAnnouncer {
    /// Derives all entries from the settings and resolved metric set.
    pub fn new(settings: &Settings, metrics: &MetricSet, publisher: Arc<dyn Publisher>) -> Self {
        let device_name = &settings.device_name;
        let id_root = device_name.to_lowercase();
        let device = DeviceBlock {
            identifiers: vec![format!("{id_root}_sensor")],
            name: format!("{device_name}Sensors"),
            model: metrics.device_model.clone(),
            manufacturer: settings.device_manufacturer.clone(),
        };
        let state_topic = state_topic(device_name);

        let entries = sensor_catalog(metrics)
            .into_iter()
            .map(|meta| {
                let topic = format!(
                    "homeassistant/sensor/{device_name}/{device_name}{}/config",
                    meta.topic_suffix
                );
                let entry = DiscoveryEntry {
                    device_class: meta.device_class,
                    name: format!("{device_name}{}", meta.entity_suffix),
                    state_topic: state_topic.clone(),
                    unit_of_measurement: meta.unit,
                    value_template: format!("{{{{ value_json.{}}}}}", meta.value_key),
                    unique_id: format!("{id_root}_sensor_{}", meta.value_key),
                    device: device.clone(),
                    icon: meta.icon,
                };
                (topic, entry)
            })
            .collect();

        Self { entries, publisher }
    }

    /// The announcements this device will publish, as (topic, payload).
    pub fn entries(&self) -> &[(String, DiscoveryEntry)] {
        &self.entries
    }

    /// Publishes every entry retained with QoS 1.
    ///
    /// Entries are independent: one failed publish is logged and does not
    /// block the rest. Returns how many announcements were accepted; the
    /// caller proceeds to scheduling either way.
    pub async fn announce(&self) -> usize {
        let mut published = 0;
        for (topic, entry) in &self.entries {
            let payload = match serde_json::to_vec(entry) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to encode discovery entry for {topic}: {e}");
                    continue;
                }
            };

            match self
                .publisher
                .publish(topic, QOS_AT_LEAST_ONCE, true, payload)
                .await
            {
                Ok(()) => {
                    debug!("Announced {topic}");
                    published += 1;
                }
                Err(e) => {
                    warn!("Discovery announcement for {topic} failed: {e}");
                }
            }
        }
        published
    }
}
