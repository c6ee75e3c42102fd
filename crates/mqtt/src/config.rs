//! Broker connection settings.
//!
//! The structure deserializes from the agent's `[mqtt]` configuration section
//! and is validated with the `validator` crate before a client is built, so
//! bad settings fail at startup rather than at connect time.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use super::backoff::Backoff;

/// How long a reconnect delay may grow before it stops increasing.
const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(60);

/// Validated broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Broker hostname or IP address.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port, usually 1883 (plain) or 8883 (TLS-terminated upstream).
    #[validate(range(min = 1, message = "Port must be non-zero"))]
    pub port: u16,

    /// Username for broker authentication. Credentials are only applied when
    /// both `user` and `password` are present.
    pub user: Option<String>,

    /// Password for broker authentication.
    pub password: Option<String>,

    /// Client identifier presented to the broker. Brokers drop the older
    /// session when two clients share an id, so this should be unique per
    /// device.
    #[validate(length(
        min = 1,
        max = 64,
        message = "Client id must be between 1 and 64 characters"
    ))]
    pub client_id: String,

    /// Keep-alive interval in seconds.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// Whether the broker should discard session state from a previous
    /// connection with the same client id.
    pub clean_session: bool,

    /// Capacity of the request channel between client handles and the event
    /// loop.
    #[validate(range(
        min = 1,
        max = 256,
        message = "Channel capacity must be between 1 and 256"
    ))]
    pub channel_capacity: usize,

    /// Initial delay in seconds before the first reconnection attempt.
    #[validate(range(
        min = 1,
        max = 60,
        message = "Reconnect delay must be between 1 and 60 seconds"
    ))]
    pub reconnect_delay: u64,

    /// Maximum reconnection attempts before giving up. Zero retries forever.
    #[validate(range(
        max = 100,
        message = "Max reconnect attempts must be at most 100"
    ))]
    pub max_reconnect_attempts: u32,

    /// Growth factor applied to the reconnect delay after each failure.
    #[validate(range(
        min = 1.0,
        max = 30.0,
        message = "Backoff multiplier must be between 1 and 30"
    ))]
    pub reconnect_backoff_multiplier: f64,
}

impl Config {
    /// Builds the retry schedule the connection kernel will use.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_secs(self.reconnect_delay),
            MAX_BACKOFF_DELAY,
            self.reconnect_backoff_multiplier,
        )
        .with_max_attempts(self.max_reconnect_attempts)
    }

    /// True when both halves of the credential pair are configured.
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: 1883,
            user: None,
            password: None,
            client_id: format!("sysbeacon-{}", Uuid::new_v4()),
            keep_alive: 60,
            clean_session: true,
            channel_capacity: 10,
            reconnect_delay: 5,
            max_reconnect_attempts: 0,
            reconnect_backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.has_credentials());
    }

    #[test]
    fn out_of_range_keep_alive_is_rejected() {
        let config = Config {
            keep_alive: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = Config {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_require_both_halves() {
        let config = Config {
            user: Some("ha".into()),
            ..Default::default()
        };
        assert!(!config.has_credentials());

        let config = Config {
            user: Some("ha".into()),
            password: Some("secret".into()),
            ..Default::default()
        };
        assert!(config.has_credentials());
    }

    #[test]
    fn backoff_reflects_settings() {
        let config = Config {
            reconnect_delay: 3,
            max_reconnect_attempts: 2,
            reconnect_backoff_multiplier: 2.0,
            ..Default::default()
        };

        let mut backoff = config.backoff();
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(3));
        assert_eq!(backoff.next_sleep().unwrap(), Duration::from_secs(6));
        assert!(backoff.next_sleep().is_err());
    }
}
