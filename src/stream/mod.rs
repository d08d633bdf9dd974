//! Merged, deduplicated stream of new submissions and comments.
//!
//! A community has two independently ordered feeds. Each poll fetches the
//! newest window of both, merges them newest-first, drops anything already
//! yielded, and queues the rest. The queue is drained one item at a time
//! before the next poll.
//!
//! Ordering is only per poll: an item can arrive after a newer one from an
//! earlier poll, and an item evicted from the seen set can come back. Callers
//! must be idempotent.
//!
//! When the feeds go quiet the stream yields [`StreamItem::Idle`] every few
//! empty polls, so the consumer still gets control back periodically.

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::source::{self, ContentSource};
use crate::types::Post;

mod poll;
mod seen;

pub use poll::{PollBackoff, StreamConfig};
pub use seen::SeenSet;

/// One step of the merged stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A post not yielded before.
    Post(Post),

    /// Several consecutive polls found nothing new.
    Idle,
}

/// Concatenates both feeds and orders them newest first.
///
/// The sort is stable, so items with equal timestamps keep submissions
/// before comments.
pub fn merge_by_recency(submissions: Vec<Post>, comments: Vec<Post>) -> Vec<Post> {
    let mut merged = submissions;
    merged.extend(comments);
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

/// Lazy, unbounded stream over one community's feeds.
pub struct MergedStream<'a, S> {
    source: &'a S,
    config: StreamConfig,
    seen: SeenSet,
    pending: VecDeque<Post>,
    empty_polls: u32,
    backoff: PollBackoff,
}

impl<'a, S: ContentSource> MergedStream<'a, S> {
    pub fn new(source: &'a S, config: StreamConfig) -> Self {
        MergedStream {
            source,
            seen: SeenSet::new(config.seen_capacity),
            backoff: PollBackoff::new(&config),
            config,
            pending: VecDeque::new(),
            empty_polls: 0,
        }
    }

    /// Returns the next item, polling and waiting as needed.
    ///
    /// Returns `Ok(None)` once `shutdown` is cancelled. Fetch errors are
    /// returned as-is; the stream stays usable but callers normally discard
    /// it and start over.
    pub async fn next(
        &mut self,
        shutdown: &CancellationToken,
    ) -> source::Result<Option<StreamItem>> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(None);
            }

            if let Some(post) = self.pending.pop_front() {
                return Ok(Some(StreamItem::Post(post)));
            }

            let fresh = tokio::select! {
                _ = shutdown.cancelled() => return Ok(None),
                fresh = self.poll() => fresh?,
            };

            if fresh > 0 {
                self.empty_polls = 0;
                self.backoff.reset();
                continue;
            }

            self.empty_polls += 1;
            if self.empty_polls > self.config.idle_after {
                self.empty_polls = 0;
                return Ok(Some(StreamItem::Idle));
            }

            let delay = self.backoff.next_delay();
            trace!(?delay, empty_polls = self.empty_polls, "No new items, waiting");
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(None),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Fetches both feeds once and queues unseen items. Returns how many.
    async fn poll(&mut self) -> source::Result<usize> {
        let source = self.source;
        let limit = self.config.limit;
        let (submissions, comments) = tokio::try_join!(
            source.recent_submissions(limit),
            source.recent_comments(limit),
        )?;

        let mut fresh = 0;
        for post in merge_by_recency(submissions, comments) {
            if self.seen.insert(&post.id) {
                self.pending.push_back(post);
                fresh += 1;
            }
        }

        trace!(community = %source.community(), fresh, "Polled feeds");
        Ok(fresh)
    }
}
