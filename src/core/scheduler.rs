//! Cancellable fixed-interval scheduler.
//!
//! Drives the collection pass on a recurring timer:
//!
//! ```text
//! Idle -> Waiting(interval) -> Firing -> Waiting(interval) -> ... -> Stopped
//! ```
//!
//! The first pass runs only after one full interval; there is no immediate
//! fire on start. The timer is re-armed only after the task future returns,
//! so a slow pass shifts the phase of subsequent ticks rather than stacking
//! them.
//!
//! Cancellation semantics: a stop request during `Waiting` wakes the
//! scheduler immediately and no further pass runs; a stop request during
//! `Firing` lets the current pass complete first. `Stopped` is terminal, and
//! [`Scheduler::await_stopped`] joins the underlying task so shutdown only
//! proceeds once the loop has fully exited.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Observable scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed but the loop has not started waiting yet.
    Idle,
    /// Sleeping out the interval; a stop request wakes it immediately.
    Waiting,
    /// The task future is running; a stop request is honored afterwards.
    Firing,
    /// Terminal. No further pass will run.
    Stopped,
}

/// Recurring, cancellable timer around an async task.
pub struct Scheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    state_rx: watch::Receiver<SchedulerState>,
}

impl Scheduler {
    /// Spawns the scheduler loop. `work` is invoked once per elapsed
    /// interval and must not panic; its errors are its own to log.
    pub fn start<F, Fut>(interval: Duration, mut work: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(
                "Scheduler started (interval: {:.0}s)",
                interval.as_secs_f64()
            );
            loop {
                let _ = state_tx.send(SchedulerState::Waiting);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let _ = state_tx.send(SchedulerState::Firing);
                debug!("Scheduler firing");
                work().await;

                if token.is_cancelled() {
                    break;
                }
            }

            let _ = state_tx.send(SchedulerState::Stopped);
            info!("Scheduler stopped");
        });

        Self {
            cancel,
            handle,
            state_rx,
        }
    }

    /// Requests a stop. Returns immediately; use [`Scheduler::await_stopped`]
    /// to wait for the loop to exit.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Receiver for state transitions.
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// Joins the scheduler task. Only returns once the loop has fully
    /// exited, which is what makes the shutdown ordering reliable.
    pub async fn await_stopped(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::sleep;

    use super::*;

    const TICK: Duration = Duration::from_millis(50);

    fn counting_scheduler(fires: Arc<AtomicUsize>) -> Scheduler {
        Scheduler::start(TICK, move || {
            let fires = fires.clone();
            async move {
                fires.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn first_fire_waits_a_full_interval() {
        let fires = Arc::new(AtomicUsize::new(0));
        let scheduler = counting_scheduler(fires.clone());

        sleep(TICK / 2).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);

        sleep(TICK).await;
        assert!(fires.load(Ordering::SeqCst) >= 1);

        scheduler.request_stop();
        scheduler.await_stopped().await;
    }

    #[tokio::test]
    async fn fires_repeatedly_until_stopped() {
        let fires = Arc::new(AtomicUsize::new(0));
        let scheduler = counting_scheduler(fires.clone());

        sleep(TICK * 5).await;
        let count = fires.load(Ordering::SeqCst);
        assert!(count >= 3, "expected several fires, got {count}");

        scheduler.request_stop();
        scheduler.await_stopped().await;
    }

    #[tokio::test]
    async fn stop_while_waiting_prevents_any_fire() {
        let fires = Arc::new(AtomicUsize::new(0));
        let scheduler = counting_scheduler(fires.clone());

        // Well inside the first waiting period.
        sleep(TICK / 5).await;
        scheduler.request_stop();
        scheduler.await_stopped().await;

        assert_eq!(fires.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_while_waiting_wakes_immediately() {
        let scheduler = Scheduler::start(Duration::from_secs(3600), || async {});
        let state = scheduler.state();

        sleep(Duration::from_millis(20)).await;
        assert_eq!(*state.borrow(), SchedulerState::Waiting);

        scheduler.request_stop();
        // Joining must not take anywhere near the hour-long interval.
        tokio::time::timeout(Duration::from_secs(1), scheduler.await_stopped())
            .await
            .expect("scheduler failed to stop promptly");

        assert_eq!(*state.borrow(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn stop_during_firing_lets_the_pass_complete() {
        let completed = Arc::new(AtomicUsize::new(0));
        let fires = Arc::new(AtomicUsize::new(0));
        let completed_in_task = completed.clone();
        let fires_in_task = fires.clone();

        let scheduler = Scheduler::start(TICK, move || {
            let completed = completed_in_task.clone();
            let fires = fires_in_task.clone();
            async move {
                fires.fetch_add(1, Ordering::SeqCst);
                sleep(TICK * 2).await;
                completed.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Land the stop request inside the first firing window.
        sleep(TICK + TICK / 2).await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        scheduler.request_stop();
        scheduler.await_stopped().await;

        // The pass ran to completion and no second pass started.
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn state_reaches_stopped_exactly_once_stopped() {
        let scheduler = Scheduler::start(TICK, || async {});
        let state = scheduler.state();
        assert_ne!(*state.borrow(), SchedulerState::Stopped);

        scheduler.request_stop();
        scheduler.await_stopped().await;
        assert_eq!(*state.borrow(), SchedulerState::Stopped);
    }
}
