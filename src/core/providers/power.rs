//! Power-supply health from the Raspberry Pi firmware throttle flag.
//!
//! The firmware exposes a bitmask-like hex value; the interesting conditions
//! live in the upper four hex digits (under-voltage, frequency capping,
//! throttling, soft temperature limit, current or historical). The agent
//! reports a small enumerated set of exact codes rather than decomposing
//! individual bits, plus a generic fallback for every other value, so
//! interpretation is a total function with no error path.

use super::error::{ProviderError, ProviderResult};

/// Firmware throttle flag as exposed on Raspberry Pi OS.
pub const THROTTLE_SYSFILE: &str = "/sys/devices/platform/soc/soc:firmware/get_throttled";

const MSG_HEALTHY: &str = "Everything is working as intended";
const MSG_UNDER_VOLTAGE: &str =
    "Under-voltage was detected, consider getting an uninterruptible power supply";
const MSG_BAD_SUPPLY: &str =
    "Performance is limited due to a bad power supply, replace the supply or its cable";
const MSG_THROTTLED: &str =
    "Throttled due to a bad power supply, this can lead to corruption and instability";
const MSG_OVERHEATING: &str = "The device is overheating, consider adding a fan or heat sinks";
const MSG_UNKNOWN: &str = "There is a problem with the power supply or the system";

/// Reads the raw throttle flag, normalized to four hex digits.
pub async fn throttle_code() -> ProviderResult<String> {
    let content = tokio::fs::read_to_string(THROTTLE_SYSFILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: THROTTLE_SYSFILE.to_string(),
            source,
        })?;

    Ok(normalize_code(&content))
}

/// Reads and interprets the power status.
///
/// In numeric mode the normalized code is returned as-is; otherwise it is
/// mapped to an advisory string through [`describe_code`].
pub async fn power_status(numeric: bool) -> ProviderResult<String> {
    let code = throttle_code().await?;
    if numeric {
        Ok(code)
    } else {
        Ok(describe_code(&code).to_string())
    }
}

/// Normalizes the raw sysfile contents to a four-hex-digit code.
///
/// The firmware writes values such as `0`, `1000`, or `50005`; a leading
/// `0x` may appear depending on the kernel. Short values are left-padded
/// with zeros and long ones keep their leading four digits, which carry the
/// historical condition bits.
pub(crate) fn normalize_code(raw: &str) -> String {
    let digits = raw.trim().trim_start_matches("0x");
    match digits.get(..4) {
        Some(prefix) => prefix.to_string(),
        None => format!("{digits:0>4}"),
    }
}

/// Maps a normalized throttle code to a human-readable advisory.
///
/// Total over all inputs: codes outside the recognized set fall through to
/// a generic message instead of erroring.
pub fn describe_code(code: &str) -> &'static str {
    match code {
        "0000" => MSG_HEALTHY,
        "1000" => MSG_UNDER_VOLTAGE,
        "2000" | "3000" => MSG_BAD_SUPPLY,
        "4000" | "5000" => MSG_THROTTLED,
        "8000" => MSG_OVERHEATING,
        _ => MSG_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_zero_normalizes_to_healthy_code() {
        assert_eq!(normalize_code("0\n"), "0000");
    }

    #[test]
    fn hex_prefix_is_stripped() {
        assert_eq!(normalize_code("0x50005"), "5000");
    }

    #[test]
    fn long_values_keep_leading_digits() {
        assert_eq!(normalize_code("50005"), "5000");
    }

    #[test]
    fn four_digit_values_pass_through() {
        assert_eq!(normalize_code("1000"), "1000");
        assert_eq!(normalize_code("8000\n"), "8000");
    }

    #[test]
    fn every_known_code_has_a_fixed_message() {
        assert_eq!(describe_code("0000"), MSG_HEALTHY);
        assert_eq!(describe_code("1000"), MSG_UNDER_VOLTAGE);
        assert_eq!(describe_code("2000"), MSG_BAD_SUPPLY);
        assert_eq!(describe_code("3000"), MSG_BAD_SUPPLY);
        assert_eq!(describe_code("4000"), MSG_THROTTLED);
        assert_eq!(describe_code("5000"), MSG_THROTTLED);
        assert_eq!(describe_code("8000"), MSG_OVERHEATING);
    }

    #[test]
    fn unknown_codes_fall_through_to_generic_message() {
        for code in ["0005", "ffff", "9000", "abcd", ""] {
            assert_eq!(describe_code(code), MSG_UNKNOWN);
        }
    }

    #[test]
    fn mapping_is_total_over_arbitrary_codes() {
        // Spot-check that no 4-digit input can panic the mapping.
        for a in 0..16u32 {
            let code = format!("{a:x}000");
            let _ = describe_code(&code);
        }
    }
}
