//! Core domain types for the cake day bot.

pub mod ids;
pub mod post;

pub use ids::{Community, PostId, Username};
pub use post::{AuthorStatus, Polarity, Post, PostKind, ReplyRef, SITE_URL};
