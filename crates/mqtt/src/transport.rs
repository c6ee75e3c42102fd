//! Application-facing transport handle.
//!
//! `Transport::start` validates the settings, spawns the connection kernel on
//! its own task, and hands back a cloneable handle. Publishing goes straight
//! through the `rumqttc` client (safe for concurrent use); delivery while the
//! link is down follows the client's own in-flight semantics, the transport
//! does not add a queue of its own.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, QoS};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use validator::Validate;

use super::{
    config::Config,
    connection::{build_client, ConnectionKernel},
    error::TransferError,
    state::ConnectionState,
};

/// Maps a numeric quality-of-service level onto the protocol enum.
///
/// Values other than 0 and 2 collapse to at-least-once, the level every
/// message in this system is published with.
pub fn qos_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// Handle to a managed broker connection.
///
/// Cloning is cheap; all clones publish through the same connection kernel.
#[derive(Clone)]
pub struct Transport {
    client: AsyncClient,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    kernel: Arc<Mutex<Option<JoinHandle<Result<(), TransferError>>>>>,
}

impl Transport {
    /// Validates the settings, builds the client, and spawns the connection
    /// kernel. Returns immediately; the TCP connect happens on the kernel
    /// task and its progress is observable through [`Transport::state`].
    pub fn start(config: Config) -> Result<Self, TransferError> {
        config
            .validate()
            .map_err(|e| TransferError::Config(e.to_string()))?;

        let (client, event_loop) = build_client(&config);
        let cancel = CancellationToken::new();
        let (kernel, state_rx) =
            ConnectionKernel::new(client.clone(), event_loop, config.backoff(), cancel.clone());

        let handle = tokio::spawn(async move {
            let result = kernel.run().await;
            if let Err(e) = &result {
                error!("Connection kernel terminated: {e}");
            }
            result
        });

        Ok(Self {
            client,
            state_rx,
            cancel,
            kernel: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Publishes one message. The client accepts the publish even while the
    /// link is down; actual delivery depends on the connection coming back
    /// within the client's in-flight window.
    pub async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransferError> {
        self.client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(TransferError::Client)
    }

    /// Receiver for connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// True while the broker link is up.
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_connected()
    }

    /// Waits up to `timeout` for the link to come up. Returns whether it did.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut state_rx = self.state_rx.clone();
        if state_rx.borrow().is_connected() {
            return true;
        }

        tokio::time::timeout(timeout, async {
            while state_rx.changed().await.is_ok() {
                if state_rx.borrow().is_connected() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }

    /// Stops the connection kernel and joins its task.
    ///
    /// The kernel sends a best-effort DISCONNECT on the way out. Idempotent;
    /// a second call returns immediately.
    pub async fn shutdown(&self) -> Result<(), TransferError> {
        self.cancel.cancel();
        let handle = self.kernel.lock().await.take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Connection kernel task did not join cleanly: {e}");
                    Ok(())
                }
            }
        } else {
            Ok(())
        }
    }
}
