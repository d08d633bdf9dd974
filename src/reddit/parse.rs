//! Decoding Reddit API responses into the bot's types.
//!
//! Everything on the API is a "thing": `{"kind": "t1", "data": {...}}`.
//! Listings wrap a page of things; comments are `t1`, submissions `t3`,
//! accounts `t2`. Continuation stubs (`more`) are dropped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::source::{Result, SourceError};
use crate::types::{AuthorStatus, Post, PostId, PostKind, ReplyRef, Username};

/// Author name the API reports for deleted content.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Deserialize)]
pub struct Thing {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    name: String,
    author: Option<String>,
    created_utc: f64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    link_id: Option<String>,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    is_suspended: bool,
    created_utc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    json: CommentResponseBody,
}

#[derive(Debug, Deserialize)]
struct CommentResponseBody {
    #[serde(default)]
    errors: Vec<Value>,
    data: Option<CommentResponseData>,
}

#[derive(Debug, Deserialize)]
struct CommentResponseData {
    #[serde(default)]
    things: Vec<Thing>,
}

fn timestamp(secs: f64, endpoint: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs.trunc() as i64, 0)
        .ok_or_else(|| SourceError::malformed(endpoint, format!("timestamp {secs} out of range")))
}

fn author(raw: Option<String>) -> Option<Username> {
    raw.filter(|name| !name.is_empty() && name != DELETED_AUTHOR)
        .map(Username::new)
}

/// Decodes a submission or comment. Returns `None` for other kinds.
pub fn parse_post(thing: Thing, endpoint: &str) -> Result<Option<Post>> {
    let kind = match thing.kind.as_str() {
        "t3" => PostKind::Submission,
        "t1" => PostKind::Comment,
        _ => return Ok(None),
    };

    let raw: RawPost = serde_json::from_value(thing.data)
        .map_err(|e| SourceError::malformed(endpoint, e.to_string()))?;
    let id = PostId::new(raw.name);
    let created_at = timestamp(raw.created_utc, endpoint)?;

    let post = match kind {
        PostKind::Submission => Post {
            link: id.clone(),
            id,
            kind,
            author: author(raw.author),
            created_at,
            body: raw.selftext.unwrap_or_default(),
            parent: None,
            permalink: raw.permalink,
        },
        PostKind::Comment => {
            let link = raw
                .link_id
                .ok_or_else(|| SourceError::malformed(endpoint, "comment without link_id"))?;
            Post {
                id,
                kind,
                author: author(raw.author),
                created_at,
                body: raw.body.unwrap_or_default(),
                parent: raw.parent_id.map(PostId::new),
                link: PostId::new(link),
                permalink: raw.permalink,
            }
        }
    };

    Ok(Some(post))
}

/// Decodes every submission and comment in a listing, in listing order.
pub fn parse_listing(value: Value, endpoint: &str) -> Result<Vec<Post>> {
    let listing: Listing = serde_json::from_value(value)
        .map_err(|e| SourceError::malformed(endpoint, e.to_string()))?;

    let mut posts = Vec::with_capacity(listing.data.children.len());
    for thing in listing.data.children {
        if let Some(post) = parse_post(thing, endpoint)? {
            posts.push(post);
        }
    }
    Ok(posts)
}

/// Decodes `/user/{name}/about`.
pub fn parse_account(value: Value, endpoint: &str) -> Result<AuthorStatus> {
    let thing: Thing = serde_json::from_value(value)
        .map_err(|e| SourceError::malformed(endpoint, e.to_string()))?;
    let raw: RawAccount = serde_json::from_value(thing.data)
        .map_err(|e| SourceError::malformed(endpoint, e.to_string()))?;

    if raw.is_suspended {
        return Ok(AuthorStatus::Suspended);
    }

    let created_utc = raw
        .created_utc
        .ok_or_else(|| SourceError::malformed(endpoint, "account without created_utc"))?;
    Ok(AuthorStatus::Active {
        created_at: timestamp(created_utc, endpoint)?,
    })
}

/// Extracts the direct replies of the focused comment from a
/// `/comments/{article}?comment={id}` response.
///
/// The response is `[submission listing, comment listing]`; the comment
/// listing holds the focused comment, whose `replies` field is either a
/// listing or an empty string.
pub fn parse_comment_replies(value: Value, endpoint: &str) -> Result<Vec<Post>> {
    let Some(focus) = value.pointer("/1/data/children/0/data") else {
        return Err(SourceError::malformed(endpoint, "no focused comment"));
    };

    match focus.get("replies") {
        Some(replies @ Value::Object(_)) => parse_listing(replies.clone(), endpoint),
        _ => Ok(Vec::new()),
    }
}

/// Extracts the top-level comments from a `/comments/{article}` response.
pub fn parse_submission_replies(value: Value, endpoint: &str) -> Result<Vec<Post>> {
    match value {
        Value::Array(mut parts) if parts.len() >= 2 => parse_listing(parts.swap_remove(1), endpoint),
        _ => Err(SourceError::malformed(endpoint, "expected [submission, comments]")),
    }
}

/// Decodes the `/api/comment` response (`api_type=json`).
///
/// # Errors
///
/// [`SourceError::Rejected`] when the site lists errors (rate limits,
/// locked threads, deleted parents).
pub fn parse_comment_response(value: Value, endpoint: &str) -> Result<ReplyRef> {
    let response: CommentResponse = serde_json::from_value(value)
        .map_err(|e| SourceError::malformed(endpoint, e.to_string()))?;

    if !response.json.errors.is_empty() {
        let reasons: Vec<String> = response
            .json
            .errors
            .iter()
            .map(|e| match e {
                Value::Array(parts) => parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(": "),
                other => other.to_string(),
            })
            .collect();
        return Err(SourceError::Rejected(reasons.join("; ")));
    }

    let thing = response
        .json
        .data
        .and_then(|data| data.things.into_iter().next())
        .ok_or_else(|| SourceError::malformed(endpoint, "no comment in response"))?;

    let name = thing
        .data
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::malformed(endpoint, "comment without name"))?;
    let permalink = thing
        .data
        .get("permalink")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(ReplyRef {
        id: PostId::from(name),
        permalink: permalink.to_string(),
    })
}
