//! Memory and swap utilization from `/proc/meminfo`.
//!
//! The file is a `Key:  value kB` listing. Memory utilization is computed
//! against `MemAvailable` rather than `MemFree`, since free pages alone
//! badly understate what the kernel can actually hand to processes. Swap
//! utilization on a machine with no swap configured reads as 0 %.

use std::collections::HashMap;

use super::error::{ProviderError, ProviderResult};
use super::round1;

const MEMINFO_FILE: &str = "/proc/meminfo";

/// Physical memory utilization in percent.
pub async fn memory_use() -> ProviderResult<f64> {
    parse_memory_percent(&read_meminfo().await?)
}

/// Swap utilization in percent.
pub async fn swap_usage() -> ProviderResult<f64> {
    parse_swap_percent(&read_meminfo().await?)
}

async fn read_meminfo() -> ProviderResult<String> {
    tokio::fs::read_to_string(MEMINFO_FILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: MEMINFO_FILE.to_string(),
            source,
        })
}

/// Parses the key/value listing into kB counters.
fn parse_fields(content: &str) -> HashMap<&str, u64> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        {
            fields.insert(key.trim(), value);
        }
    }
    fields
}

fn required(fields: &HashMap<&str, u64>, key: &'static str) -> ProviderResult<u64> {
    fields.get(key).copied().ok_or(ProviderError::InvalidFormat {
        location: MEMINFO_FILE.to_string(),
        reason: format!("missing field {key}"),
    })
}

pub(crate) fn parse_memory_percent(content: &str) -> ProviderResult<f64> {
    let fields = parse_fields(content);
    let total = required(&fields, "MemTotal")?;
    let available = required(&fields, "MemAvailable")?;

    if total == 0 {
        return Err(ProviderError::InvalidFormat {
            location: MEMINFO_FILE.to_string(),
            reason: "MemTotal is zero".to_string(),
        });
    }

    let used = total.saturating_sub(available);
    Ok(round1(used as f64 / total as f64 * 100.0))
}

pub(crate) fn parse_swap_percent(content: &str) -> ProviderResult<f64> {
    let fields = parse_fields(content);
    let total = required(&fields, "SwapTotal")?;
    let free = required(&fields, "SwapFree")?;

    if total == 0 {
        return Ok(0.0);
    }

    let used = total.saturating_sub(free);
    Ok(round1(used as f64 / total as f64 * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MemTotal:        8000000 kB\n\
                          MemFree:         1000000 kB\n\
                          MemAvailable:    6000000 kB\n\
                          Buffers:          300000 kB\n\
                          Cached:          2000000 kB\n\
                          SwapTotal:       2000000 kB\n\
                          SwapFree:        1500000 kB\n";

    #[test]
    fn memory_percent_uses_available() {
        // (8000000 - 6000000) / 8000000 = 25 %
        assert_eq!(parse_memory_percent(SAMPLE).unwrap(), 25.0);
    }

    #[test]
    fn swap_percent_uses_free() {
        // (2000000 - 1500000) / 2000000 = 25 %
        assert_eq!(parse_swap_percent(SAMPLE).unwrap(), 25.0);
    }

    #[test]
    fn no_swap_configured_reads_zero() {
        let content = "MemTotal: 8000000 kB\nMemAvailable: 4000000 kB\n\
                       SwapTotal: 0 kB\nSwapFree: 0 kB\n";
        assert_eq!(parse_swap_percent(content).unwrap(), 0.0);
    }

    #[test]
    fn missing_mem_available_is_invalid() {
        let content = "MemTotal: 8000000 kB\nMemFree: 1000000 kB\n";
        let err = parse_memory_percent(content).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFormat { .. }));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let content = "garbage line\nMemTotal: 4000000 kB\nMemAvailable: 3000000 kB\n";
        assert_eq!(parse_memory_percent(content).unwrap(), 25.0);
    }

    #[test]
    fn percent_is_rounded_to_one_decimal() {
        let content = "MemTotal: 3000000 kB\nMemAvailable: 1000000 kB\n";
        // 2/3 of memory used.
        assert_eq!(parse_memory_percent(content).unwrap(), 66.7);
    }
}
