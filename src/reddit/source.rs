//! [`ContentSource`] for one subreddit.

use std::sync::Arc;

use tracing::debug;

use super::client::RedditClient;
use super::parse::{
    parse_account, parse_comment_replies, parse_comment_response, parse_listing,
    parse_submission_replies,
};
use crate::source::{ContentSource, Result, SourceError};
use crate::types::{AuthorStatus, Community, Post, ReplyRef, Username};

/// Reads and replies in a single subreddit through a shared client.
#[derive(Debug, Clone)]
pub struct RedditSource {
    client: Arc<RedditClient>,
    community: Community,
}

impl RedditSource {
    pub fn new(client: Arc<RedditClient>, community: Community) -> Self {
        RedditSource { client, community }
    }

    async fn listing(&self, feed: &str, limit: usize) -> Result<Vec<Post>> {
        let path = format!("/r/{}/{}", self.community.as_str(), feed);
        let value = self
            .client
            .get(&path, &[("limit", limit.to_string())])
            .await?;
        parse_listing(value, &path)
    }
}

impl ContentSource for RedditSource {
    fn community(&self) -> &Community {
        &self.community
    }

    async fn recent_submissions(&self, limit: usize) -> Result<Vec<Post>> {
        self.listing("new", limit).await
    }

    async fn recent_comments(&self, limit: usize) -> Result<Vec<Post>> {
        self.listing("comments", limit).await
    }

    /// A 404 means the account is shadow-banned or gone; it is reported as
    /// suspended so the post is skipped.
    async fn author_status(&self, author: &Username) -> Result<AuthorStatus> {
        let path = format!("/user/{}/about", author.as_str());
        match self.client.get(&path, &[]).await {
            Ok(value) => parse_account(value, &path),
            Err(SourceError::Status { status: 404, .. }) => {
                debug!(user = %author, "Account not found, treating as suspended");
                Ok(AuthorStatus::Suspended)
            }
            Err(e) => Err(e),
        }
    }

    async fn parent(&self, post: &Post) -> Result<Option<Post>> {
        let Some(parent_id) = &post.parent else {
            return Ok(None);
        };

        let path = "/api/info";
        let value = self
            .client
            .get(path, &[("id", parent_id.as_str().to_string())])
            .await?;
        Ok(parse_listing(value, path)?.into_iter().next())
    }

    async fn replies(&self, post: &Post) -> Result<Vec<Post>> {
        let path = format!("/comments/{}", post.link.bare());
        if post.is_comment() {
            let value = self
                .client
                .get(
                    &path,
                    &[
                        ("comment", post.id.bare().to_string()),
                        ("depth", "2".to_string()),
                    ],
                )
                .await?;
            parse_comment_replies(value, &path)
        } else {
            let value = self
                .client
                .get(&path, &[("depth", "1".to_string())])
                .await?;
            parse_submission_replies(value, &path)
        }
    }

    async fn reply(&self, post: &Post, text: &str) -> Result<ReplyRef> {
        let path = "/api/comment";
        let value = self
            .client
            .post_form(
                path,
                &[
                    ("api_type", "json"),
                    ("thing_id", post.id.as_str()),
                    ("text", text),
                ],
            )
            .await?;
        parse_comment_response(value, path)
    }
}
