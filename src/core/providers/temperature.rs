//! SoC temperature from the kernel thermal subsystem.
//!
//! `/sys/class/thermal/thermal_zone0/temp` holds the primary sensor's
//! reading in millidegrees Celsius (e.g. `45277` for 45.277 °C). On a
//! Raspberry Pi zone 0 is the SoC sensor, which is the one the original
//! firmware tooling reports.

use super::error::{ProviderError, ProviderResult};

const THERMAL_SYSFILE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads the current SoC temperature in degrees Celsius.
pub async fn celsius() -> ProviderResult<f64> {
    let content = tokio::fs::read_to_string(THERMAL_SYSFILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: THERMAL_SYSFILE.to_string(),
            source,
        })?;

    parse_millidegrees(&content)
}

/// Parses a millidegree reading into degrees.
pub(crate) fn parse_millidegrees(content: &str) -> ProviderResult<f64> {
    let millidegrees =
        content
            .trim()
            .parse::<i64>()
            .map_err(|_| ProviderError::Parse {
                metric: "temperature".to_string(),
                location: THERMAL_SYSFILE.to_string(),
                reason: format!("invalid value: {}", content.trim()),
            })?;

    Ok(millidegrees as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_reading() {
        assert_eq!(parse_millidegrees("45277\n").unwrap(), 45.277);
    }

    #[test]
    fn parses_negative_reading() {
        // Some sensors report below zero after a cold boot outdoors.
        assert_eq!(parse_millidegrees("-5000").unwrap(), -5.0);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_millidegrees("hot").unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }

    #[test]
    fn rejects_fractional_sysfs_value() {
        // The kernel writes integers; anything else means we are reading the
        // wrong file.
        assert!(parse_millidegrees("45.2").is_err());
    }
}
