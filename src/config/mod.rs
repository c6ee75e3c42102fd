//! Agent configuration loading, validation, and resolution.
//!
//! Settings come from a single TOML file located via the command line, the
//! `SYSBEACON_CONFIG` environment variable, or `/etc/sysbeacon/config.toml`.
//! Parsing goes through a raw deserialization struct in which the required
//! keys are optional, so that a missing `mqtt.hostname`, `timezone`,
//! `deviceName`, or `client_id` can be reported by name instead of as a
//! generic parse failure. The resolved [`Settings`] value has those fields as
//! concrete types and is immutable for the rest of the process lifetime.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use serde::Deserialize;
use validator::Validate;

use crate::config::logger::LoggerConfig;

pub mod logger;

/// Simple macros for printing timestamped messages before the tracing
/// subscriber is initialized. Used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur while locating, parsing, or resolving settings.
///
/// All of these are fatal: the process must not start any component on top of
/// a configuration it could not fully validate.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file could be found at any of the known locations.
    #[error("no configuration file found: {0}")]
    NotFound(String),

    /// IO error while reading the configuration file.
    #[error("IO error while reading configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or a value has the wrong shape.
    #[error("parse error while reading configuration: {0}")]
    Parse(String),

    /// A value is out of its allowed range.
    #[error("validation error: {0}")]
    Validation(String),

    /// A required key is absent. The field path is reported verbatim so the
    /// user can find it in the file.
    #[error("required setting '{0}' is not defined in the configuration file")]
    MissingField(&'static str),

    /// The configured timezone is not a known IANA timezone name.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

fn default_port() -> u16 {
    1883
}

fn default_update_interval() -> u64 {
    60
}

fn default_device_label() -> String {
    "Unknown".to_string()
}

fn default_disk_usage_path() -> String {
    "/".to_string()
}

/// `[mqtt]` section as written in the file. The hostname is optional here
/// only so its absence can be reported by name.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
struct RawBrokerSettings {
    hostname: Option<String>,

    #[serde(default = "default_port")]
    #[validate(range(min = 1, message = "mqtt.port must be non-zero"))]
    port: u16,

    user: Option<String>,
    password: Option<String>,
}

impl Default for RawBrokerSettings {
    fn default() -> Self {
        RawBrokerSettings {
            hostname: None,
            port: default_port(),
            user: None,
            password: None,
        }
    }
}

/// The configuration file as deserialized, before required-field checks.
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(default)]
struct RawSettings {
    #[validate(nested)]
    mqtt: RawBrokerSettings,

    timezone: Option<String>,

    #[serde(rename = "deviceName")]
    device_name: Option<String>,

    client_id: Option<String>,

    #[serde(default = "default_device_label")]
    device_model: String,

    #[serde(default = "default_device_label")]
    device_manufacturer: String,

    #[serde(default = "default_update_interval")]
    #[validate(range(min = 1, message = "update_interval must be at least 1 second"))]
    update_interval: u64,

    check_disk_usage: bool,

    #[serde(default = "default_disk_usage_path")]
    disk_usage_path: String,

    check_wifi_strength: bool,

    power_integer_state: bool,

    autodiscover_device_model: bool,

    #[validate(nested)]
    logger: LoggerConfig,
}

/// Broker endpoint and credentials.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub hostname: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Fully validated agent settings. Loaded once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mqtt: BrokerSettings,
    pub timezone: Tz,
    pub device_name: String,
    pub client_id: String,
    pub device_model: String,
    pub device_manufacturer: String,
    /// Seconds between collection passes.
    pub update_interval: u64,
    pub check_disk_usage: bool,
    pub disk_usage_path: PathBuf,
    pub check_wifi_strength: bool,
    pub power_integer_state: bool,
    pub autodiscover_device_model: bool,
    pub logger: LoggerConfig,
}

impl Settings {
    /// Locates and loads the configuration file.
    ///
    /// Priority: first command-line argument, then `SYSBEACON_CONFIG`, then
    /// `/etc/sysbeacon/config.toml`.
    pub fn locate_and_load() -> Result<Self, ConfigError> {
        let path = Self::locate()?;
        Self::load(&path)
    }

    fn locate() -> Result<PathBuf, ConfigError> {
        if let Some(arg) = std::env::args().nth(1) {
            return Ok(PathBuf::from(arg));
        }

        if let Ok(env_path) = std::env::var("SYSBEACON_CONFIG") {
            let path = PathBuf::from(env_path);
            print_info!("Using config from SYSBEACON_CONFIG: {}", path.display());
            return Ok(path);
        }

        let fallback = Path::new("/etc/sysbeacon/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::NotFound(
            "pass a path as the first argument or set SYSBEACON_CONFIG".to_string(),
        ))
    }

    /// Loads and fully validates settings from the given path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());
        let document = fs::read_to_string(path)?;
        Self::from_toml(&document)
    }

    /// Parses, range-checks, and resolves a TOML document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings =
            toml::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;

        raw.validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        raw.resolve()
    }

    /// Transport settings derived from the `[mqtt]` section; connection
    /// tuning not exposed in the agent's file keeps the transport defaults.
    pub fn broker_config(&self) -> sysbeacon_mqtt::Config {
        sysbeacon_mqtt::Config {
            host: self.mqtt.hostname.clone(),
            port: self.mqtt.port,
            user: self.mqtt.user.clone(),
            password: self.mqtt.password.clone(),
            client_id: self.client_id.clone(),
            ..sysbeacon_mqtt::Config::default()
        }
    }
}

impl RawSettings {
    /// Enforces the required keys and converts to the resolved form.
    fn resolve(self) -> Result<Settings, ConfigError> {
        let hostname =
            non_empty(self.mqtt.hostname).ok_or(ConfigError::MissingField("mqtt.hostname"))?;
        let timezone_name =
            non_empty(self.timezone).ok_or(ConfigError::MissingField("timezone"))?;
        let device_name =
            non_empty(self.device_name).ok_or(ConfigError::MissingField("deviceName"))?;
        let client_id =
            non_empty(self.client_id).ok_or(ConfigError::MissingField("client_id"))?;

        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(timezone_name.clone()))?;

        Ok(Settings {
            mqtt: BrokerSettings {
                hostname,
                port: self.mqtt.port,
                user: self.mqtt.user,
                password: self.mqtt.password,
            },
            timezone,
            device_name,
            client_id,
            device_model: self.device_model,
            device_manufacturer: self.device_manufacturer,
            update_interval: self.update_interval,
            check_disk_usage: self.check_disk_usage,
            disk_usage_path: PathBuf::from(self.disk_usage_path),
            check_wifi_strength: self.check_wifi_strength,
            power_integer_state: self.power_integer_state,
            autodiscover_device_model: self.autodiscover_device_model,
            logger: self.logger,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
