//! Periodic digest flushing with a guaranteed final flush on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{info, warn};

use crate::adapters::Transport;
use crate::digest::DigestBuffer;

/// How long [`FlushHandle::stop`] waits before logging that the final flush
/// is slow. It keeps waiting afterwards; buffered entries are never dropped.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Spawns the background flush task.
pub struct FlushScheduler;

impl FlushScheduler {
    /// Start flushing `buffer` through `transport` every `period`.
    ///
    /// The returned handle stops the loop and waits for one final flush.
    pub fn start(
        buffer: Arc<DigestBuffer>,
        transport: Arc<dyn Transport>,
        period: Duration,
    ) -> FlushHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the first
            // real flush happens one full period after start.
            ticker.tick().await;

            info!(period_secs = period.as_secs(), "Digest flush scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        buffer.flush(transport.as_ref()).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            // Final flush: nothing buffered before the stop signal may be
            // silently dropped.
            buffer.flush(transport.as_ref()).await;
            info!("Digest flush scheduler stopped");
            let _ = done_tx.send(());
        });

        FlushHandle {
            shutdown: shutdown_tx,
            done: done_rx,
        }
    }
}

/// Handle to a running flush task. Single-shot: stopping consumes it.
pub struct FlushHandle {
    shutdown: watch::Sender<bool>,
    done: oneshot::Receiver<()>,
}

impl FlushHandle {
    /// Signal shutdown and wait until the final flush has completed.
    pub async fn stop(self) {
        let Self { shutdown, mut done } = self;
        let _ = shutdown.send(true);

        match timeout(STOP_GRACE, &mut done).await {
            Ok(_) => {}
            Err(_) => {
                warn!(
                    grace_secs = STOP_GRACE.as_secs(),
                    "Final digest flush still running, waiting for completion"
                );
                let _ = done.await;
            }
        }
    }
}
