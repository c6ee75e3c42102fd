//! Metric providers: one scalar reading each, straight from `/proc`, `/sys`,
//! or a system call.
//!
//! Every provider is an async function returning a fresh reading or a
//! [`ProviderError`]; nothing is cached between collection passes. File
//! parsing is split into pure functions over the file contents so the
//! parsers can be tested without the corresponding kernel interfaces.

pub mod boot;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod model;
pub mod power;
pub mod temperature;
pub mod wifi;

pub use error::{ProviderError, ProviderResult};

/// Rounds a percentage to one decimal, the precision every gauge in the
/// state payload is reported with.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::round1;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(12.3456), 12.3);
        assert_eq!(round1(99.95), 100.0);
        assert_eq!(round1(0.04), 0.0);
    }
}
