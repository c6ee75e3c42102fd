//! Enabled metric set, resolved once at startup.
//!
//! The agent supports a fixed, enumerable set of metrics. Six are always
//! collected; disk usage and Wi-Fi signal join the set only when their
//! configuration flags are truthy. The set never changes while the process
//! runs; toggling a metric requires a restart.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Settings;
use crate::core::providers;

/// Names of the metrics collected on every pass, in payload order.
pub const MANDATORY_METRICS: [&str; 6] = [
    "temperature",
    "memory_use",
    "cpu_usage",
    "swap_usage",
    "power_status",
    "last_boot",
];

/// The optional metrics, for the startup listing.
const OPTIONAL_METRICS: [&str; 2] = ["disk_use", "wifi_strength"];

/// The enabled subset of metrics plus the resolved device model.
///
/// Immutable after [`MetricSet::resolve`]; every snapshot produced during
/// the process lifetime carries exactly this set of keys.
#[derive(Debug, Clone)]
pub struct MetricSet {
    /// Mount point to report disk usage for, when enabled.
    pub disk: Option<PathBuf>,
    /// Whether Wi-Fi signal strength is reported.
    pub wifi: bool,
    /// Whether the power status is published as the raw flag code instead of
    /// an advisory string.
    pub power_numeric: bool,
    /// Device model advertised in discovery announcements.
    pub device_model: String,
}

impl MetricSet {
    /// Derives the enabled set from settings.
    ///
    /// Runs the device-model probe when autodetection is requested; a failed
    /// probe falls back to the configured label rather than aborting startup.
    pub async fn resolve(settings: &Settings) -> Self {
        let device_model = if settings.autodiscover_device_model {
            match providers::model::device_model().await {
                Ok(model) => {
                    info!("Autodetected device model: {model}");
                    model
                }
                Err(e) => {
                    warn!(
                        "Device model autodetection failed ({e}); using configured model '{}'",
                        settings.device_model
                    );
                    settings.device_model.clone()
                }
            }
        } else {
            settings.device_model.clone()
        };

        MetricSet {
            disk: settings
                .check_disk_usage
                .then(|| settings.disk_usage_path.clone()),
            wifi: settings.check_wifi_strength,
            power_numeric: settings.power_integer_state,
            device_model,
        }
    }

    /// Names of all enabled metrics, in payload order.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = vec!["temperature"];
        if self.disk.is_some() {
            names.push("disk_use");
        }
        names.extend(["memory_use", "cpu_usage", "swap_usage", "power_status", "last_boot"]);
        if self.wifi {
            names.push("wifi_strength");
        }
        names
    }

    /// Number of enabled metrics (and thus discovery announcements).
    pub fn len(&self) -> usize {
        self.enabled_names().len()
    }

    /// Always false: the mandatory metrics cannot be disabled.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Logs a table of every supported metric and whether it is enabled.
pub fn log_metrics_table(metrics: &MetricSet) {
    let enabled = metrics.enabled_names();
    let all = MANDATORY_METRICS.iter().chain(OPTIONAL_METRICS.iter());

    let name_width = MANDATORY_METRICS
        .iter()
        .chain(OPTIONAL_METRICS.iter())
        .map(|name| name.len())
        .max()
        .unwrap_or(10)
        .max("Metric".len());

    info!("{:<width$} | Status", "Metric", width = name_width);
    info!("{}-+-{}", "-".repeat(name_width), "-".repeat(8));
    for name in all {
        let status = if enabled.contains(name) {
            "ENABLED"
        } else {
            "DISABLED"
        };
        info!("{:<width$} | {}", name, status, width = name_width);
    }
}
