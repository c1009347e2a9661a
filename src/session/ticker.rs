//! Elapsed-time counter for an active session.
//!
//! Each activation gets its own counter and its own task. Stopping aborts the
//! task and swaps in a fresh zeroed counter, so a tick racing the abort lands
//! on the discarded counter and never shows up afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Periodic elapsed-time counter tied to one session at a time.
#[derive(Debug)]
pub struct ElapsedTicker {
    period: Duration,
    elapsed_ms: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl ElapsedTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Start ticking from zero. Restarts if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.stop();

        let counter = Arc::new(AtomicU64::new(0));
        self.elapsed_ms = Arc::clone(&counter);

        let period = self.period;
        let step = period.as_millis() as u64;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                ticker.tick().await;
                counter.fetch_add(step, Ordering::Relaxed);
            }
        }));
    }

    /// Stop ticking and reset the counter to zero.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.elapsed_ms = Arc::new(AtomicU64::new(0));
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Elapsed time counted so far.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::Relaxed))
    }
}

impl Default for ElapsedTicker {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Render a duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
