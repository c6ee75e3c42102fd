//! CPU utilization from `/proc/stat`.
//!
//! The aggregate `cpu` line carries cumulative jiffy counters since boot:
//!
//! ```text
//! cpu  user nice system idle iowait irq softirq steal ...
//! ```
//!
//! A single read only describes the whole uptime, so utilization is computed
//! from the delta between two samples taken a short window apart. The window
//! is part of the provider; one collection pass therefore blocks for about a
//! quarter of a second, which is negligible against the update interval.

use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::round1;

const STAT_FILE: &str = "/proc/stat";
const SAMPLE_WINDOW: Duration = Duration::from_millis(250);

/// Cumulative jiffy counters from the aggregate `cpu` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Measures CPU utilization in percent over a short sampling window.
pub async fn usage_percent() -> ProviderResult<f64> {
    let first = parse_aggregate(&read_stat().await?)?;
    tokio::time::sleep(SAMPLE_WINDOW).await;
    let second = parse_aggregate(&read_stat().await?)?;

    Ok(usage_between(first, second))
}

async fn read_stat() -> ProviderResult<String> {
    tokio::fs::read_to_string(STAT_FILE)
        .await
        .map_err(|source| ProviderError::FileRead {
            path: STAT_FILE.to_string(),
            source,
        })
}

/// Extracts busy and total jiffies from the aggregate `cpu` line.
pub(crate) fn parse_aggregate(content: &str) -> ProviderResult<CpuTimes> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| ProviderError::InvalidFormat {
            location: STAT_FILE.to_string(),
            reason: "no aggregate cpu line".to_string(),
        })?;

    let mut counters = Vec::new();
    for field in line.split_whitespace().skip(1) {
        let value = field.parse::<u64>().map_err(|_| ProviderError::Parse {
            metric: "cpu jiffies".to_string(),
            location: STAT_FILE.to_string(),
            reason: format!("invalid value: {field}"),
        })?;
        counters.push(value);
    }

    // user nice system idle iowait irq softirq [steal ...]
    if counters.len() < 7 {
        return Err(ProviderError::InvalidFormat {
            location: STAT_FILE.to_string(),
            reason: format!("expected at least 7 counters, got {}", counters.len()),
        });
    }

    let total: u64 = counters.iter().sum();
    let idle = counters[3] + counters[4];

    Ok(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Utilization between two samples. Counters are cumulative, so a stalled
/// clock (zero total delta) reads as an idle machine rather than an error.
pub(crate) fn usage_between(first: CpuTimes, second: CpuTimes) -> f64 {
    let total_delta = second.total.saturating_sub(first.total);
    if total_delta == 0 {
        return 0.0;
    }
    let busy_delta = second.busy.saturating_sub(first.busy);

    round1(busy_delta as f64 / total_delta as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "cpu  100 0 50 800 50 0 0 0 0 0\n\
                          cpu0 50 0 25 400 25 0 0 0 0 0\n\
                          intr 12345\n";

    #[test]
    fn parses_aggregate_line_only() {
        let times = parse_aggregate(SAMPLE).unwrap();
        assert_eq!(times.total, 1000);
        assert_eq!(times.busy, 150);
    }

    #[test]
    fn missing_cpu_line_is_invalid() {
        let err = parse_aggregate("intr 12345\n").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFormat { .. }));
    }

    #[test]
    fn short_cpu_line_is_invalid() {
        let err = parse_aggregate("cpu  100 0 50\n").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFormat { .. }));
    }

    #[test]
    fn non_numeric_counter_is_a_parse_error() {
        let err = parse_aggregate("cpu  100 0 fifty 800 50 0 0\n").unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));
    }

    #[test]
    fn usage_is_busy_share_of_the_delta() {
        let first = CpuTimes {
            busy: 150,
            total: 1000,
        };
        let second = CpuTimes {
            busy: 250,
            total: 1400,
        };
        // 100 busy out of 400 total elapsed jiffies.
        assert_eq!(usage_between(first, second), 25.0);
    }

    #[test]
    fn zero_delta_reads_as_idle() {
        let sample = CpuTimes {
            busy: 150,
            total: 1000,
        };
        assert_eq!(usage_between(sample, sample), 0.0);
    }

    #[test]
    fn counter_wrap_does_not_panic() {
        let first = CpuTimes {
            busy: 500,
            total: 2000,
        };
        let second = CpuTimes {
            busy: 10,
            total: 100,
        };
        assert_eq!(usage_between(first, second), 0.0);
    }
}
