//! Polling configuration and idle backoff for the merged stream.
//!
//! # Polling Strategy
//!
//! - **Window**: each poll asks both feeds for their newest 100 items
//! - **Backoff**: after a poll with nothing new, wait 1s, then 2s, 4s, ...
//!   capped at 16s, with a little jitter so workers don't poll in lockstep
//! - **Reset**: any poll that finds something new resets the wait to 1s
//! - **Idle marker**: once more than 5 consecutive polls find nothing, the
//!   stream yields an idle marker so the worker can do housekeeping

use std::time::Duration;

use rand::Rng;

/// Default number of items requested from each feed per poll.
const DEFAULT_LIMIT: usize = 100;

/// Default number of empty polls tolerated before an idle marker.
const DEFAULT_IDLE_AFTER: u32 = 5;

/// Default number of recently yielded ids remembered for deduplication.
const DEFAULT_SEEN_CAPACITY: usize = 301;

/// Default first wait after an empty poll (1 second).
const DEFAULT_MIN_DELAY_SECS: u64 = 1;

/// Default cap on the wait between empty polls (16 seconds).
const DEFAULT_MAX_DELAY_SECS: u64 = 16;

/// Configuration for the merged stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Items requested from each feed per poll.
    pub limit: usize,

    /// The idle marker is yielded once consecutive empty polls exceed this.
    pub idle_after: u32,

    /// How many yielded ids to remember.
    ///
    /// Must comfortably exceed twice `limit`, or items still inside the fetch
    /// window could be forgotten and yielded again.
    pub seen_capacity: usize,

    /// First wait after an empty poll.
    pub min_delay: Duration,

    /// Longest wait between empty polls.
    pub max_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConfig {
    /// Creates a `StreamConfig` with default values.
    pub fn new() -> Self {
        StreamConfig {
            limit: DEFAULT_LIMIT,
            idle_after: DEFAULT_IDLE_AFTER,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            min_delay: Duration::from_secs(DEFAULT_MIN_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }

    /// Sets both backoff bounds. Tests use zero to poll back to back.
    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }
}

/// Exponential wait between empty polls.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    min: Duration,
    max: Duration,
    base: Duration,
}

impl PollBackoff {
    pub fn new(config: &StreamConfig) -> Self {
        PollBackoff {
            min: config.min_delay,
            max: config.max_delay.max(config.min_delay),
            base: config.min_delay,
        }
    }

    /// Returns the next wait and doubles the base for the one after.
    ///
    /// The wait is the current base plus or minus up to 1/32 of it.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base.as_secs_f64();
        let max_jitter = base / 16.0;
        let jitter = if max_jitter > 0.0 {
            rand::thread_rng().gen_range(0.0..max_jitter) - max_jitter / 2.0
        } else {
            0.0
        };

        self.base = (self.base * 2).min(self.max);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Returns the wait to its minimum after a productive poll.
    pub fn reset(&mut self) {
        self.base = self.min;
    }

    /// The base the next call to [`next_delay`](Self::next_delay) jitters.
    pub fn current_base(&self) -> Duration {
        self.base
    }
}
