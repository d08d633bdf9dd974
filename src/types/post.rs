//! Content items as seen by the bot.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PostId, Username};

/// Whether an item is a top-level submission or a reply to something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Submission,
    Comment,
}

/// A submission or comment from a community feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Fullname of this item.
    pub id: PostId,

    pub kind: PostKind,

    /// The author, or `None` if the content was deleted.
    pub author: Option<Username>,

    pub created_at: DateTime<Utc>,

    /// Comment text, or the self-text of a submission.
    pub body: String,

    /// The item this one replies to. Always `None` for submissions.
    pub parent: Option<PostId>,

    /// The submission this item belongs to (itself for submissions).
    pub link: PostId,

    /// Site-relative permanent link, e.g. `/r/cakeday/comments/abc/_/def/`.
    pub permalink: String,
}

impl Post {
    pub fn is_comment(&self) -> bool {
        self.kind == PostKind::Comment
    }

    /// The UTC calendar date the item was created on.
    pub fn created_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Account details needed for the cake day decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorStatus {
    /// A live account and the instant it was created.
    Active { created_at: DateTime<Utc> },

    /// Suspended or otherwise unavailable; no reliable creation time.
    Suspended,
}

/// Sentiment proportions for a piece of text, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Polarity {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub compound: f64,
}

/// Reference to a reply the bot just posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRef {
    pub id: PostId,
    /// Site-relative permanent link.
    pub permalink: String,
}

/// Base URL permalinks are relative to.
pub const SITE_URL: &str = "https://www.reddit.com";

impl ReplyRef {
    /// Returns the externally dereferenceable link to the reply.
    pub fn url(&self) -> String {
        format!("{}{}", SITE_URL, self.permalink)
    }
}
