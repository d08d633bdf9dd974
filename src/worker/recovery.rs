//! Restart-after-failure loop around a worker.
//!
//! Every failure except shutdown is logged, followed by a fixed backoff and a
//! restart from scratch. There is no retry limit and the backoff never grows:
//! the bot should come back on its own after any outage. Restarts are a
//! loop, so a long outage costs nothing but log lines.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::worker::{FailureKind, Result};

/// Recovery tunables.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Pause between a failure and the restart.
    pub backoff: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            backoff: Duration::from_secs(60),
        }
    }
}

impl RecoveryConfig {
    pub fn new(backoff: Duration) -> Self {
        RecoveryConfig { backoff }
    }
}

/// What happened over the lifetime of a recovered worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Number of times the worker was restarted after a failure.
    pub restarts: u32,

    /// How many of the failures were data inconsistencies.
    pub inconsistencies: u32,
}

/// Runs `start()` until it returns `Ok` or `shutdown` is cancelled,
/// restarting after every failure.
///
/// `start` must build a fresh run each time it is called.
pub async fn run_with_recovery<F, Fut>(
    mut start: F,
    config: &RecoveryConfig,
    shutdown: &CancellationToken,
) -> RecoveryReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut report = RecoveryReport::default();

    loop {
        let err = match start().await {
            Ok(()) => break,
            Err(e) => e,
        };

        if shutdown.is_cancelled() {
            info!(error = %err, "Worker failed during shutdown, not restarting");
            break;
        }

        match err.kind() {
            FailureKind::DataInconsistency => {
                report.inconsistencies += 1;
                error!(
                    error = %err,
                    "Stored data disagrees with the site, sleeping for {:?} and retrying",
                    config.backoff
                );
            }
            FailureKind::TransientFeedFailure => {
                warn!(
                    "Encountered {}, sleeping for {:?} and retrying",
                    err,
                    config.backoff
                );
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.backoff) => {}
        }

        report.restarts += 1;
    }

    report
}
