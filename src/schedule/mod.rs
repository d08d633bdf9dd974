//! Daily maintenance scheduling.
//!
//! A [`Scheduler`] holds jobs that each run once a day at a fixed UTC time.
//! Its loop wakes every tick, runs whatever is due on the calling task, and
//! stops when the shutdown token is cancelled. Jobs run independently of the
//! community workers.
//!
//! A job that comes due several times while the loop is not running (a
//! suspended laptop, a long job) runs once and is rescheduled for the next
//! occurrence after the current time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::store::StoreError;

mod purge;

pub use purge::PurgeJob;

/// Errors a scheduled job can report.
#[derive(Debug, Error)]
pub enum JobError {
    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Work that runs on a schedule.
pub trait Job: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Runs the job. `now` is the instant the scheduler found it due.
    fn run(&self, now: DateTime<Utc>) -> Result<(), JobError>;
}

/// Scheduler tunables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time of day (UTC) at which the purge runs.
    pub purge_at: NaiveTime,

    /// How often the loop checks for due jobs.
    pub tick: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            purge_at: NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN),
            tick: Duration::from_secs(1),
        }
    }
}

/// Returns the first instant strictly after `after` whose time of day is `at`.
pub fn next_occurrence(at: NaiveTime, after: DateTime<Utc>) -> DateTime<Utc> {
    let today = after.date_naive().and_time(at).and_utc();
    if today > after {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// A job bound to its daily run time.
pub struct DailyJob {
    at: NaiveTime,
    next_run: DateTime<Utc>,
    job: Box<dyn Job>,
}

impl DailyJob {
    /// Schedules `job` at `at` every day, starting with the first occurrence
    /// after `now`.
    pub fn new(at: NaiveTime, job: Box<dyn Job>, now: DateTime<Utc>) -> Self {
        DailyJob {
            at,
            next_run: next_occurrence(at, now),
            job,
        }
    }

    pub fn name(&self) -> &str {
        self.job.name()
    }

    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_run
    }

    /// Runs the job and schedules the next occurrence after `now`.
    ///
    /// A failing job is logged and still rescheduled; tomorrow's run is the
    /// retry.
    fn run(&mut self, now: DateTime<Utc>) {
        info!(job = self.job.name(), "Running scheduled job");
        if let Err(e) = self.job.run(now) {
            error!(job = self.job.name(), error = %e, "Scheduled job failed");
        }
        self.next_run = next_occurrence(self.at, now);
        debug!(job = self.job.name(), next_run = %self.next_run, "Rescheduled");
    }
}

impl std::fmt::Debug for DailyJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyJob")
            .field("name", &self.job.name())
            .field("at", &self.at)
            .field("next_run", &self.next_run)
            .finish()
    }
}

/// Tick-driven dispatcher for daily jobs.
pub struct Scheduler {
    jobs: Vec<DailyJob>,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, tick: Duration) -> Self {
        Scheduler {
            jobs: Vec::new(),
            clock,
            tick,
        }
    }

    /// Adds `job`, to run every day at `at` (UTC).
    pub fn every_day_at(&mut self, at: NaiveTime, job: impl Job + 'static) -> &mut Self {
        let daily = DailyJob::new(at, Box::new(job), self.clock.now());
        info!(job = daily.name(), next_run = %daily.next_run(), "Scheduled daily job");
        self.jobs.push(daily);
        self
    }

    /// The earliest upcoming run, if any job is scheduled.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.jobs.iter().map(DailyJob::next_run).min()
    }

    /// Runs every due job on the calling task. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let now = self.clock.now();
        let mut ran = 0;
        for job in self.jobs.iter_mut().filter(|job| job.is_due(now)) {
            job.run(now);
            ran += 1;
        }
        ran
    }

    /// Checks for due jobs every tick until `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        info!(jobs = self.jobs.len(), tick = ?self.tick, "Scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.tick) => {
                    self.run_pending();
                }
            }
        }

        info!("Scheduler stopped");
    }
}
