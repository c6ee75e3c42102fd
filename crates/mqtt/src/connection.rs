//! Connection kernel: drives the MQTT event loop and reconnects on failure.
//!
//! `rumqttc` only makes progress while its `EventLoop` is polled, so the
//! kernel must run for the whole process lifetime. It classifies connection
//! errors into fatal (bad credentials, TLS misconfiguration) and transient
//! (network hiccups), sleeps out the backoff schedule between retries, and
//! broadcasts every state change over a watch channel.
//!
//! The kernel runs on its own tokio task; client handles are cloned out of
//! it and used concurrently from the rest of the agent.

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{backoff::Backoff, config::Config, error::TransferError, state::ConnectionState};

/// Builds the client handle and event loop pair from validated settings.
pub fn build_client(config: &Config) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive));
    options.set_clean_session(config.clean_session);
    if let (Some(user), Some(password)) = (&config.user, &config.password) {
        options.set_credentials(user, password);
    }

    AsyncClient::new(options, config.channel_capacity)
}

/// Owns the event loop and the reconnect policy.
pub struct ConnectionKernel {
    client: AsyncClient,
    event_loop: EventLoop,
    backoff: Backoff,
    cancel: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionKernel {
    /// Creates a kernel and the receiver half of its state channel.
    pub fn new(
        client: AsyncClient,
        event_loop: EventLoop,
        backoff: Backoff,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<ConnectionState>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let kernel = Self {
            client,
            event_loop,
            backoff,
            cancel,
            state_tx,
        };
        (kernel, state_rx)
    }

    /// Runs until cancelled, a fatal error occurs, or retries are exhausted.
    ///
    /// On cancellation a DISCONNECT is sent best-effort and `Ok(())` is
    /// returned; the two error exits report the condition that ended the
    /// connection for good.
    pub async fn run(mut self) -> Result<(), TransferError> {
        info!("Connection kernel started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Connection kernel shutting down");
                    if let Err(e) = self.client.disconnect().await {
                        debug!("DISCONNECT not delivered during shutdown: {e}");
                    }
                    self.set_state(ConnectionState::Disconnected("shutdown".into()));
                    return Ok(());
                }

                polled = self.event_loop.poll() => {
                    match polled {
                        Ok(event) => self.handle_event(event),
                        Err(e) if is_fatal(&e) => {
                            self.set_state(ConnectionState::Disconnected(e.to_string()));
                            return Err(TransferError::Connection(e));
                        }
                        Err(e) => {
                            match self.backoff.next_sleep() {
                                Ok(delay) => {
                                    warn!(
                                        "Broker connection error ({e}); retrying in {:.1}s",
                                        delay.as_secs_f64()
                                    );
                                    self.set_state(ConnectionState::Reconnecting(
                                        delay.as_secs_f64(),
                                    ));
                                    // The delay itself must stay cancellable,
                                    // or shutdown stalls for a full backoff.
                                    tokio::select! {
                                        _ = self.cancel.cancelled() => {}
                                        _ = tokio::time::sleep(delay) => {}
                                    }
                                }
                                Err(limit) => {
                                    self.set_state(ConnectionState::Disconnected(
                                        limit.to_string(),
                                    ));
                                    return Err(TransferError::RetriesExhausted(limit));
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Broker connection established");
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                }
            }
            Event::Incoming(Packet::Disconnect) => {
                warn!("Broker closed the connection");
                self.set_state(ConnectionState::Disconnected(
                    "disconnected by broker".into(),
                ));
            }
            Event::Incoming(packet) => {
                trace!("Incoming packet: {packet:?}");
            }
            Event::Outgoing(outgoing) => {
                trace!("Outgoing packet: {outgoing:?}");
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = *self.state_tx.borrow() != next;
        if changed {
            info!("Connection state: {next}");
            if self.state_tx.send(next).is_err() {
                debug!("No subscribers left for connection state updates");
            }
        }
    }
}

/// Errors where another connect attempt cannot possibly succeed.
fn is_fatal(err: &ConnectionError) -> bool {
    match err {
        // Broken certificates or crypto setup will not heal on retry.
        ConnectionError::Tls(_) => true,

        // Protocol state corruption or a non-CONNACK reply to CONNECT.
        ConnectionError::MqttState(_) | ConnectionError::NotConnAck(_) => true,

        // The request channel drained; no client handle remains to serve.
        ConnectionError::RequestsDone => true,

        ConnectionError::Io(e) => matches!(
            e.kind(),
            std::io::ErrorKind::AddrInUse
                | std::io::ErrorKind::PermissionDenied
                | std::io::ErrorKind::InvalidInput
                | std::io::ErrorKind::InvalidData
        ),

        ConnectionError::ConnectionRefused(code) => matches!(
            code,
            ConnectReturnCode::RefusedProtocolVersion
                | ConnectReturnCode::BadClientId
                | ConnectReturnCode::BadUserNamePassword
                | ConnectReturnCode::NotAuthorized
        ),

        // Timeouts and everything not listed above are worth another try.
        #[allow(unreachable_patterns)]
        _ => false,
    }
}
