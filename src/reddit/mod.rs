//! Reddit-backed content source.
//!
//! One [`RedditClient`] holds the OAuth session and is shared by every
//! community; each community gets a [`RedditSource`] wrapping it. Rate
//! limiting is left to Reddit: a 429 surfaces as a transient failure and the
//! worker's recovery backoff absorbs it.
//!
//! # Module Structure
//!
//! - [`client`]: credentials, token management, authenticated requests
//! - [`parse`]: JSON "thing" and listing decoding
//! - [`source`]: the per-community [`crate::source::ContentSource`]

pub mod client;
pub mod parse;
pub mod source;


pub use client::{RedditClient, RedditCredentials, RedditEndpoints};
pub use source::RedditSource;
