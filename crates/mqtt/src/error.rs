//! Unified error type for transport operations.

use thiserror::Error;

use super::backoff::BackoffError;

/// Errors surfaced by the transport layer.
///
/// Configuration problems are caught before the connection kernel starts;
/// everything else is a runtime condition reported by `rumqttc` or by the
/// retry policy.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The broker settings failed validation.
    #[error("invalid transport configuration: {0}")]
    Config(String),

    /// The client rejected an operation (publish, disconnect). This usually
    /// means the request channel to the event loop is closed or full.
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The event loop reported a connection-level failure.
    #[error("broker connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The reconnect policy gave up after exhausting its attempt budget.
    #[error("reconnection abandoned: {0}")]
    RetriesExhausted(#[from] BackoffError),
}
