//! Spawns and tracks one recovered worker per community.
//!
//! Every worker runs as its own tokio task under a child of the supervisor's
//! shutdown token, so workers can be cancelled together or one at a time.
//! Failures stay inside a worker's recovery loop and never reach the others.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::source::ContentSource;
use crate::types::Community;

use super::recovery::{RecoveryConfig, RecoveryReport, run_with_recovery};
use super::worker::CommunityWorker;

/// Handle to a spawned worker task.
struct WorkerHandle {
    task: JoinHandle<RecoveryReport>,
    cancel: CancellationToken,
}

/// Owns the per-community worker tasks.
pub struct Supervisor {
    workers: HashMap<Community, WorkerHandle>,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor whose workers stop when `shutdown` is cancelled.
    pub fn new(shutdown: CancellationToken) -> Self {
        Supervisor {
            workers: HashMap::new(),
            shutdown,
        }
    }

    /// Spawns `worker` under its own recovery loop.
    ///
    /// Returns false, leaving the running worker alone, if the community
    /// already has one.
    pub fn spawn<S>(&mut self, worker: CommunityWorker<S>, recovery: RecoveryConfig) -> bool
    where
        S: ContentSource + 'static,
    {
        let community = worker.community().clone();
        if self.workers.contains_key(&community) {
            warn!(community = %community, "Worker already running");
            return false;
        }

        debug!(community = %community, "Spawning worker task");
        let cancel = self.shutdown.child_token();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let worker = &worker;
            let token = &token;
            run_with_recovery(move || worker.run(token), &recovery, token).await
        });

        self.workers.insert(community, WorkerHandle { task, cancel });
        true
    }

    /// Returns the communities with a worker, in no particular order.
    pub fn communities(&self) -> Vec<Community> {
        self.workers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Cancels one community's worker. Returns false if there was none.
    ///
    /// The task stays tracked so [`Supervisor::join_all`] still collects its
    /// report.
    pub fn stop(&self, community: &Community) -> bool {
        match self.workers.get(community) {
            Some(handle) => {
                info!(community = %community, "Stopping worker");
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Signals every worker to stop.
    pub fn shutdown_all(&self) {
        info!("Shutting down all workers");
        self.shutdown.cancel();
    }

    /// Waits for every worker task to finish and returns their reports.
    ///
    /// Call [`Supervisor::shutdown_all`] first, or this waits until the
    /// shutdown token is cancelled elsewhere. A worker that panicked is
    /// logged and left out of the result.
    pub async fn join_all(self) -> HashMap<Community, RecoveryReport> {
        let mut reports = HashMap::new();

        for (community, handle) in self.workers {
            match handle.task.await {
                Ok(report) => {
                    debug!(community = %community, restarts = report.restarts, "Worker finished");
                    reports.insert(community, report);
                }
                Err(e) => {
                    error!(community = %community, error = %e, "Worker task failed");
                }
            }
        }

        reports
    }
}
