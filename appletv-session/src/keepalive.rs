//! Periodic keepalive owned by a session

use std::sync::Arc;
use std::time::Duration;

use appletv_api::ControlChannel;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Background task sending keepalives on a realtime control channel.
///
/// The first keepalive goes out one interval after spawning. Send failures
/// are logged and the task keeps ticking; a dead channel is noticed through
/// its event stream, not here.
#[derive(Debug)]
pub struct KeepaliveTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl KeepaliveTask {
    pub fn spawn(channel: Arc<dyn ControlChannel>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = channel.send_keepalive().await {
                            warn!(error = %err, "Keepalive failed");
                        }
                    }
                }
            }

            debug!("Keepalive task stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the task and wait for it to finish
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Keepalive task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for KeepaliveTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
