//! Last boot time derived from `/proc/uptime`.
//!
//! The first field of `/proc/uptime` is the seconds since boot with
//! fractional precision. Subtracting it from the current wall clock yields
//! the boot instant, which is rendered as an ISO-8601 timestamp in the
//! configured timezone so the consuming platform shows it in local time.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use super::error::{ProviderError, ProviderResult};

const UPTIME_FILE: &str = "/proc/uptime";

/// Boot time as an ISO-8601 timestamp in the given timezone.
pub async fn last_boot(timezone: Tz) -> ProviderResult<String> {
    let content = tokio::fs::read_to_string(UPTIME_FILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: UPTIME_FILE.to_string(),
            source,
        })?;

    let uptime = parse_uptime_seconds(&content)?;
    let boot_epoch = Utc::now().timestamp() - uptime as i64;
    format_boot_time(boot_epoch, timezone)
}

/// Parses the uptime field (first column) of `/proc/uptime`.
pub(crate) fn parse_uptime_seconds(content: &str) -> ProviderResult<f64> {
    let field = content
        .split_whitespace()
        .next()
        .ok_or_else(|| ProviderError::InvalidFormat {
            location: UPTIME_FILE.to_string(),
            reason: "expected at least 1 field".to_string(),
        })?;

    field.parse::<f64>().map_err(|_| ProviderError::Parse {
        metric: "uptime_seconds".to_string(),
        location: UPTIME_FILE.to_string(),
        reason: format!("invalid value: {field}"),
    })
}

/// Renders a boot epoch as a local ISO-8601 timestamp.
pub(crate) fn format_boot_time(epoch_secs: i64, timezone: Tz) -> ProviderResult<String> {
    let boot = DateTime::from_timestamp(epoch_secs, 0).ok_or_else(|| {
        ProviderError::InvalidFormat {
            location: UPTIME_FILE.to_string(),
            reason: format!("boot epoch {epoch_secs} out of range"),
        }
    })?;

    Ok(boot
        .with_timezone(&timezone)
        .to_rfc3339_opts(SecondsFormat::Secs, false))
}
