//! Collaborator interfaces: where posts come from and how text is scored.
//!
//! The bot's core never talks to the network directly. A [`ContentSource`]
//! yields posts for one community and performs replies; a
//! [`SentimentScorer`] scores text. Production wires in
//! [`crate::reddit::RedditSource`] and [`VaderScorer`]; tests use in-crate
//! fakes.

use std::future::Future;

use crate::types::{AuthorStatus, Community, Polarity, Post, ReplyRef, Username};

pub mod error;
pub mod sentiment;

pub use error::SourceError;
pub use sentiment::VaderScorer;

/// Result type for content source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Feed and posting access for a single community.
///
/// Implementations are constructed per community, so every operation on one
/// instance targets that community.
pub trait ContentSource: Send + Sync {
    /// The community this source reads from.
    fn community(&self) -> &Community;

    /// The newest top-level submissions, at most `limit` of them.
    fn recent_submissions(&self, limit: usize) -> impl Future<Output = Result<Vec<Post>>> + Send;

    /// The newest comments anywhere in the community, at most `limit`.
    fn recent_comments(&self, limit: usize) -> impl Future<Output = Result<Vec<Post>>> + Send;

    /// Looks up an account's creation time and suspension status.
    fn author_status(&self, author: &Username)
    -> impl Future<Output = Result<AuthorStatus>> + Send;

    /// The item `post` replies to, or `None` for submissions.
    fn parent(&self, post: &Post) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// A fresh listing of the direct replies to `post`.
    fn replies(&self, post: &Post) -> impl Future<Output = Result<Vec<Post>>> + Send;

    /// Posts `text` as a reply to `post`.
    fn reply(&self, post: &Post, text: &str) -> impl Future<Output = Result<ReplyRef>> + Send;
}

/// Scores the sentiment of a piece of text.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> Polarity;
}
