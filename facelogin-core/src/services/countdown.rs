//! Caller-owned lockout countdown.
//!
//! The guard never runs timers of its own. A view that wants to show the
//! remaining lockout time, and re-enable the form when it ends, starts a
//! [`LockoutCountdown`]. The countdown polls
//! [`LoginAttemptGuard::check_status`] on the configured interval and
//! publishes every status on a watch channel. Polling never counts as an
//! attempt; the poll that finds the deadline passed is the one that clears it.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    Error,
    repositories::{AuthApi, StateStore},
    services::LoginAttemptGuard,
    storage::LockoutStatus,
};

/// A running countdown task.
///
/// The task ends by itself after publishing the first unlocked status. It is
/// also stopped by [`stop`](Self::stop) or by dropping the countdown, so a
/// torn-down view does not leak a timer.
pub struct LockoutCountdown {
    updates: watch::Receiver<LockoutStatus>,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl LockoutCountdown {
    /// Read the current status and start polling.
    pub async fn start<S: StateStore, A: AuthApi>(
        guard: Arc<LoginAttemptGuard<S, A>>,
    ) -> Result<Self, Error> {
        let initial = guard.check_status().await?;
        let (tx, updates) = watch::channel(initial);
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let period = guard.config().countdown_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately and the initial status is already published
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match guard.check_status().await {
                            Ok(status) => {
                                tracing::debug!(
                                    locked = status.locked,
                                    remaining_ms = status.remaining_ms,
                                    "Lockout countdown tick"
                                );
                                let unlocked = !status.locked;
                                if tx.send(status).is_err() || unlocked {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to read lockout status");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("Stopping lockout countdown");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            updates,
            shutdown,
            handle: Some(handle),
        })
    }

    /// The most recently published status.
    pub fn status(&self) -> LockoutStatus {
        *self.updates.borrow()
    }

    /// A receiver for status updates, e.g. to drive a UI.
    pub fn subscribe(&self) -> watch::Receiver<LockoutStatus> {
        self.updates.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the countdown to end on its own and return the final status.
    pub async fn finished(mut self) -> LockoutStatus {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Lockout countdown task failed");
            }
        }
        self.status()
    }

    /// Stop polling.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for LockoutCountdown {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Render a remaining time as `"14m 59s"`, or `"59s"` under a minute.
pub fn format_remaining(remaining_ms: u64) -> String {
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
