//! Background heartbeat loop.
//!
//! [`Keepalive::spawn`] starts a task that wakes on a fixed period and
//! sends a `ping` event — but only while the connection state says the
//! session is up. A failed send is logged and the loop keeps going: a
//! heartbeat failure is never fatal, the next tick simply tries again.
//! There is no backoff and no health-derived interval adjustment.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::client::CommandSender;
use crate::protocol::ClientMessage;

/// Handle to the running heartbeat task.
///
/// The task runs until [`stop`](Keepalive::stop) is called (or the
/// handle is dropped, which leaves the task to exit on its own once the
/// shutdown channel closes).
pub struct Keepalive {
    task: tokio::task::JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl Keepalive {
    /// Spawn the heartbeat loop with the given period.
    pub fn spawn(sender: CommandSender, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(keepalive_loop(sender, period, shutdown_rx));
        Self { task, shutdown_tx }
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(join_err) = self.task.await {
            debug!("keepalive task ended with join error: {join_err}");
        }
    }
}

async fn keepalive_loop(
    sender: CommandSender,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    // First tick after one full period, not immediately — the join
    // request should be the only traffic at session start.
    let start = tokio::time::Instant::now() + period;
    let mut ticks = tokio::time::interval_at(start, period);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!(period = ?period, "keepalive loop started");

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if !sender.is_connected() {
                    continue;
                }
                match sender.send(ClientMessage::Ping) {
                    Ok(()) => debug!("ping sent"),
                    // The session may have ended between the check and
                    // the send; either way the next tick retries.
                    Err(e) => warn!("ping error: {e}"),
                }
            }
            _ = &mut shutdown_rx => {
                debug!("keepalive loop stopped");
                break;
            }
        }
    }
}
