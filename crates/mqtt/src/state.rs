//! Observable connection state.
//!
//! The connection kernel broadcasts one of these values over a watch channel
//! whenever the link to the broker changes. Consumers can gate their own work
//! on it (the agent delays its discovery announcements until `Connected`)
//! without touching the event loop itself.

use std::fmt;

/// Lifecycle of the broker link.
///
/// Transitions are driven entirely by the connection kernel:
/// `Connecting` → `Connected` on a successful CONNACK, `Connected` →
/// `Reconnecting`/`Disconnected` on failure, and back around through the
/// backoff loop until cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// A connect attempt is in flight; no publish will reach the broker yet.
    Connecting,

    /// CONNACK received, keep-alive active. Publishes are deliverable.
    Connected,

    /// The link is down. Carries the reason (broker close, network error,
    /// exhausted retries).
    Disconnected(String),

    /// Waiting out a backoff delay before the next attempt; the value is the
    /// delay in seconds.
    Reconnecting(f64),
}

impl ConnectionState {
    /// Short identifier for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected(_) => "Disconnected",
            ConnectionState::Reconnecting(_) => "Reconnecting",
        }
    }

    /// True only while the broker link is usable.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected(reason) => {
                write!(f, "Disconnected ({reason})")
            }
            ConnectionState::Reconnecting(secs) => {
                write!(f, "Reconnecting (in {secs:.1}s)")
            }
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_covers_every_variant() {
        assert_eq!(ConnectionState::Connecting.as_str(), "Connecting");
        assert_eq!(ConnectionState::Connected.as_str(), "Connected");
        assert_eq!(
            ConnectionState::Disconnected("gone".into()).as_str(),
            "Disconnected"
        );
        assert_eq!(ConnectionState::Reconnecting(2.0).as_str(), "Reconnecting");
    }

    #[test]
    fn only_connected_counts_as_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Disconnected("x".into()).is_connected());
        assert!(!ConnectionState::Reconnecting(1.0).is_connected());
    }

    #[test]
    fn display_includes_context() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(
            ConnectionState::Disconnected("broker closed".into()).to_string(),
            "Disconnected (broker closed)"
        );
        assert_eq!(
            ConnectionState::Reconnecting(2.5).to_string(),
            "Reconnecting (in 2.5s)"
        );
    }
}
