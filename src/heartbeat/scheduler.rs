//! Scheduler adapter: runs a heartbeat task on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::outcome::HeartbeatOutcome;

/// Shortest interval the scheduler accepts.
pub const MIN_INTERVAL_SECS: u64 = 5;

/// A unit of work the scheduler invokes once per tick.
#[async_trait]
pub trait HeartbeatTask: Send + Sync {
    /// Name used in scheduler logs.
    fn name(&self) -> &str;

    /// Run one attempt. Must not fail; failures are part of the outcome.
    async fn run(&self) -> HeartbeatOutcome;
}

/// Background loop that triggers a heartbeat task periodically.
pub struct HeartbeatScheduler {
    task: Arc<dyn HeartbeatTask>,
    interval: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatScheduler {
    /// Create a new scheduler. Intervals below the floor are raised to it.
    pub fn new(task: Arc<dyn HeartbeatTask>, interval: Duration) -> Self {
        Self {
            task,
            interval: interval.max(Duration::from_secs(MIN_INTERVAL_SECS)),
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the loop in the background. The first attempt fires immediately.
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("Heartbeat scheduler already running");
            return;
        }

        let task = Arc::clone(&self.task);
        let interval_duration = self.interval;

        info!(
            task = task.name(),
            interval_secs = interval_duration.as_secs(),
            "Heartbeat scheduler started"
        );

        *worker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let outcome = task.run().await;
                debug!(
                    task = task.name(),
                    result = %outcome.result,
                    "Heartbeat tick finished"
                );
            }
        }));
    }

    /// Stop the loop. An attempt in flight is cancelled.
    pub async fn stop(&self) {
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
            info!(task = self.task.name(), "Heartbeat scheduler stopped");
        }
    }

    /// Run one attempt immediately, outside the loop.
    pub async fn trigger_now(&self) -> HeartbeatOutcome {
        self.task.run().await
    }

    /// Returns whether the loop is running.
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
