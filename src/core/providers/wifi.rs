//! Wireless signal level from `/proc/net/wireless`.
//!
//! The file has two header lines followed by one row per interface:
//!
//! ```text
//! Inter-| sta-|   Quality        |   Discarded packets
//!  face | tus | link level noise |  nwid  crypt   frag
//!  wlan0: 0000   54.  -56.  -256        0      0      0
//! ```
//!
//! The signal level is the fourth column, in dBm, printed with a trailing
//! dot. Only `wlan0` is consulted, the interface the agent is deployed
//! against on its target boards.

use super::error::{ProviderError, ProviderResult};

const WIRELESS_FILE: &str = "/proc/net/wireless";
const INTERFACE: &str = "wlan0";

/// Current signal level of `wlan0` in dBm.
pub async fn signal_dbm() -> ProviderResult<i64> {
    let content = tokio::fs::read_to_string(WIRELESS_FILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: WIRELESS_FILE.to_string(),
            source,
        })?;

    parse_signal(&content, INTERFACE)
}

/// Extracts the signal level column for the given interface.
pub(crate) fn parse_signal(content: &str, interface: &str) -> ProviderResult<i64> {
    let prefix = format!("{interface}:");
    let row = content
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with(&prefix))
        .ok_or_else(|| ProviderError::InvalidFormat {
            location: WIRELESS_FILE.to_string(),
            reason: format!("no entry for interface {interface}"),
        })?;

    let level = row
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| ProviderError::InvalidFormat {
            location: WIRELESS_FILE.to_string(),
            reason: format!("truncated row for interface {interface}"),
        })?;

    level
        .trim_end_matches('.')
        .parse::<f64>()
        .map(|dbm| dbm as i64)
        .map_err(|_| ProviderError::Parse {
            metric: "wifi_strength".to_string(),
            location: WIRELESS_FILE.to_string(),
            reason: format!("invalid value: {level}"),
        })
}
