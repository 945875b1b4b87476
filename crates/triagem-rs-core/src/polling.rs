//! Periodic refresh task owned by a screen.

use crate::store::PatientStore;
use log::{debug, info};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running refresh loop; dropping it stops the loop.
pub struct RefreshLoop {
    handle: JoinHandle<()>,
    interval: Duration,
}

impl RefreshLoop {
    /// Refresh `store` now and then every `interval`.
    ///
    /// A refresh that outlasts the interval delays the next tick instead of
    /// queueing a burst.
    pub fn spawn(store: PatientStore, interval: Duration) -> Self {
        info!(
            "starting refresh loop (interval_ms={})",
            interval.as_millis()
        );
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = store.refresh().await;
                debug!("refresh tick finished (outcome={:?})", outcome);
            }
        });
        Self { handle, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the loop; an in-flight refresh is dropped.
    pub fn stop(&self) {
        if !self.handle.is_finished() {
            info!("stopping refresh loop");
        }
        self.handle.abort();
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
