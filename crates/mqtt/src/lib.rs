//! sysbeacon-mqtt — managed MQTT transport for the sysbeacon agent.
//!
//! This crate wraps `rumqttc` into a small transport layer with a clear
//! division of labor:
//!
//! * `config` — broker connection settings, validated with the `validator`
//!   crate before any socket is opened.
//! * `connection` — the `ConnectionKernel`, a background task that drives the
//!   MQTT event loop, classifies failures, and reconnects with exponential
//!   backoff.
//! * `state` — the observable `ConnectionState`, broadcast over a
//!   `tokio::sync::watch` channel.
//! * `backoff` — the retry delay schedule used between reconnection attempts.
//! * `transport` — the `Transport` handle applications publish through.
//!
//! The event loop must be polled continuously for publishes to go out; the
//! kernel owns that loop for the process lifetime and is only stopped through
//! its cancellation token. `Transport` is cheap to clone and safe to share
//! across tasks.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod state;
pub mod transport;

pub use config::Config;
pub use error::TransferError;
pub use state::ConnectionState;
pub use transport::{qos_level, Transport};
