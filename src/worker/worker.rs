//! Per-community consumption loop.
//!
//! The worker drains the merged stream for one community and hands every
//! same-day post by a live author to both detectors. For each item:
//!
//! 1. Read the clock once; inside the quiet window before midnight UTC,
//!    sleep so the nightly purge never races live processing. The item is
//!    still judged against the instant read before sleeping
//! 2. Skip the idle marker
//! 3. Skip posts not created today (UTC)
//! 4. Skip deleted content (no author)
//! 5. Resolve the author; skip suspended accounts
//! 6. Run the cake day detector, then the thank-you detector
//!
//! Skips are normal outcomes. Any error ends [`CommunityWorker::run`]; the
//! recovery loop decides what happens next.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::clock::Clock;
use crate::detect::{
    CakedayOutcome, DetectError, DetectorContext, ThanksOutcome, consider_cakeday,
    consider_thanks,
};
use crate::source::{ContentSource, SourceError};
use crate::store::StoreError;
use crate::stream::{MergedStream, StreamConfig, StreamItem};
use crate::types::{AuthorStatus, Community, Post, Username};

/// How a worker failure should be treated by the recovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Stored data contradicts what the site reports.
    DataInconsistency,

    /// Feed, lookup or posting failure; retrying later is expected to help.
    TransientFeedFailure,
}

/// Errors that stop a worker run.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Content source failure.
    #[error("content source error: {0}")]
    Source(#[from] SourceError),
}

impl From<DetectError> for WorkerError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Store(e) => WorkerError::Store(e),
            DetectError::Source(e) => WorkerError::Source(e),
        }
    }
}

impl WorkerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerError::Store(StoreError::DataInconsistency { .. }) => {
                FailureKind::DataInconsistency
            }
            _ => FailureKind::TransientFeedFailure,
        }
    }
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Worker tunables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Length of the window before midnight UTC in which the worker pauses.
    pub quiet_window: Duration,

    /// How long to pause once inside the quiet window.
    pub quiet_sleep: Duration,

    pub stream: StreamConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            quiet_window: Duration::from_secs(15 * 60),
            quiet_sleep: Duration::from_secs(20 * 60),
            stream: StreamConfig::default(),
        }
    }
}

/// Why the worker ignored an item before reaching the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSkip {
    Idle,
    NotToday,
    DeletedAuthor,
    SuspendedAuthor,
}

/// What happened to one stream item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Skipped(ItemSkip),
    Processed {
        cakeday: CakedayOutcome,
        thanks: ThanksOutcome,
    },
}

/// Returns true if `now` lies within `window` of the next UTC midnight.
pub fn in_quiet_window(now: DateTime<Utc>, window: Duration) -> bool {
    const DAY_SECS: u64 = 24 * 60 * 60;
    let since_midnight = u64::from(now.num_seconds_from_midnight());
    since_midnight + window.as_secs() >= DAY_SECS
}

/// Consumes one community's feeds.
pub struct CommunityWorker<S> {
    source: Arc<S>,
    ctx: DetectorContext,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl<S: ContentSource> CommunityWorker<S> {
    pub fn new(
        source: Arc<S>,
        ctx: DetectorContext,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        CommunityWorker {
            source,
            ctx,
            clock,
            config,
        }
    }

    pub fn community(&self) -> &Community {
        self.source.community()
    }

    /// Runs until `shutdown` is cancelled or an error occurs.
    ///
    /// Every call starts from a fresh stream; nothing but the record store
    /// carries over between runs.
    #[instrument(skip(self, shutdown), fields(community = %self.community()))]
    pub async fn run(&self, shutdown: &CancellationToken) -> Result<()> {
        info!("Running {}", self.community());
        let mut stream = MergedStream::new(self.source.as_ref(), self.config.stream.clone());

        while let Some(item) = stream.next(shutdown).await? {
            let now = self.clock.now();

            if in_quiet_window(now, self.config.quiet_window) {
                info!(
                    sleep = ?self.config.quiet_sleep,
                    "Sleeping through the purge window (currently {})",
                    now
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.quiet_sleep) => {}
                }
            }

            self.process_item(item, now).await?;
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Applies the filters and both detectors to one stream item.
    pub async fn process_item(&self, item: StreamItem, now: DateTime<Utc>) -> Result<ItemOutcome> {
        let post = match item {
            StreamItem::Idle => {
                trace!("Feeds idle");
                return Ok(ItemOutcome::Skipped(ItemSkip::Idle));
            }
            StreamItem::Post(post) => post,
        };

        trace!(post = %post.id, created_at = %post.created_at, "Considering post");

        if post.created_date() != now.date_naive() {
            return Ok(ItemOutcome::Skipped(ItemSkip::NotToday));
        }

        let Some(author) = post.author.as_ref() else {
            debug!(post = %post.id, "Skipping deleted post");
            return Ok(ItemOutcome::Skipped(ItemSkip::DeletedAuthor));
        };

        let created_at = match self.source.author_status(author).await? {
            AuthorStatus::Active { created_at } => created_at,
            AuthorStatus::Suspended => {
                warn!("Encountered suspended user {}, skipping", author);
                return Ok(ItemOutcome::Skipped(ItemSkip::SuspendedAuthor));
            }
        };

        self.detect(&post, author, created_at, now).await
    }

    async fn detect(
        &self,
        post: &Post,
        author: &Username,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome> {
        let source = self.source.as_ref();
        let cakeday = consider_cakeday(&self.ctx, source, post, author, created_at, now).await?;
        let thanks = consider_thanks(&self.ctx, source, post, author, created_at, now).await?;

        Ok(ItemOutcome::Processed { cakeday, thanks })
    }
}
