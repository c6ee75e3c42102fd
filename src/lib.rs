//! sysbeacon — host telemetry agent with MQTT auto-discovery
//!
//! A long-running agent that samples local host metrics (temperature, CPU,
//! memory, swap, disk, power-supply health, Wi-Fi signal, last boot) on a
//! fixed interval and publishes them to an MQTT broker as a single state
//! message per pass. On startup it announces each enabled metric to Home
//! Assistant through the MQTT discovery protocol, so the sensors appear as
//! entities without manual configuration.
//!
//! ## Modules
//!
//! * `config` — TOML settings: loading, required-field checks, validation
//!   via the `validator` crate.
//! * `core` — the telemetry pipeline: metric providers, the resolved metric
//!   set, discovery announcements, snapshot reporting, and the interval
//!   scheduler.
//! * `logger` — `tracing` subscriber initialization (console and optional
//!   journald output).
//!
//! The broker transport lives in the `sysbeacon-mqtt` workspace crate.

pub mod config;
pub mod core;
pub mod logger;
