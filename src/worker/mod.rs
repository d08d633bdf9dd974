//! Per-community workers and their supervision.
//!
//! Each monitored community gets a dedicated worker that consumes its merged
//! stream serially. Communities are processed concurrently and know nothing
//! about each other; the only shared state is the record store.
//!
//! # Module Structure
//!
//! - [`worker`]: the consumption loop and its item filters
//! - [`recovery`]: fixed-backoff restart loop around a worker
//! - [`supervisor`]: spawns, enumerates, cancels and awaits all workers

mod recovery;
mod supervisor;
mod worker;


pub use recovery::{RecoveryConfig, RecoveryReport, run_with_recovery};
pub use supervisor::Supervisor;
pub use worker::{
    CommunityWorker, FailureKind, ItemOutcome, ItemSkip, Result, WorkerConfig, WorkerError,
    in_quiet_window,
};
