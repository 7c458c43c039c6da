//! Time- and size-bounded batch collection.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::IntakeConfig;
use crate::model::{Batch, Record};

use super::queue::MessageQueue;

/// Drains a queue into one bounded batch.
///
/// Collection stops at `max_records` or when the time budget runs out,
/// whichever comes first. Malformed messages and queue errors are skipped.
/// Draining never commits; the caller acknowledges the queue once the
/// batch is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchIntake {
    max_records: usize,
    timeout: Duration,
    poll_interval: Duration,
}

/// What one drain saw besides the records it kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    /// Messages that failed to decode.
    pub malformed: usize,
    /// Polls that returned an error.
    pub queue_errors: usize,
    /// Whether the queue offset was committed after the batch was stored.
    pub committed: bool,
}

impl BatchIntake {
    pub fn new(max_records: usize, timeout: Duration) -> Self {
        Self {
            max_records,
            timeout,
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.max_records, config.timeout()).with_poll_interval(config.poll_interval())
    }

    /// Longest single wait on the queue.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Collect one batch. Never fails; an idle queue yields an empty batch.
    pub fn drain(&self, queue: &mut dyn MessageQueue) -> Batch {
        self.drain_with_stats(queue).0
    }

    /// Like [`drain`](Self::drain), also reporting skipped messages.
    pub fn drain_with_stats(&self, queue: &mut dyn MessageQueue) -> (Batch, IntakeStats) {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut batch = Batch::new();
        let mut stats = IntakeStats::default();

        while batch.len() < self.max_records {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = self.poll_interval.min(deadline - now);

            match queue.poll(wait) {
                Ok(Some(message)) => match Record::decode(&message) {
                    Some(record) => batch.push(record),
                    None => {
                        stats.malformed += 1;
                        debug!(queue = queue.name(), bytes = message.len(), "skipping malformed message");
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    stats.queue_errors += 1;
                    debug!(queue = queue.name(), error = %e, "skipping failed poll");
                    // Errors can return immediately; don't spin until the deadline.
                    std::thread::sleep(wait);
                }
            }
        }

        info!(
            queue = queue.name(),
            records = batch.len(),
            malformed = stats.malformed,
            queue_errors = stats.queue_errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "intake complete"
        );
        (batch, stats)
    }
}

impl Default for BatchIntake {
    fn default() -> Self {
        Self::from_config(&IntakeConfig::default())
    }
}
