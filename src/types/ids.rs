//! Newtype wrappers for identifiers.
//!
//! These types prevent accidental mixing of the different string identities
//! that flow through the bot (an account name where a community name is
//! expected, a post id where an account is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account name on the content site. This is the record store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    pub fn new(s: impl Into<String>) -> Self {
        Username(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if both names refer to the same account.
    ///
    /// Account names are case-insensitive on the site, so `CaDaBot` and
    /// `cadabot` are the same identity.
    pub fn same_account(&self, other: &Username) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u/{}", self.0)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Username(s.to_string())
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Username(s)
    }
}

/// A monitored community name, without the `r/` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Community(pub String);

impl Community {
    pub fn new(s: impl Into<String>) -> Self {
        Community(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r/{}", self.0)
    }
}

impl From<&str> for Community {
    fn from(s: &str) -> Self {
        Community(s.to_string())
    }
}

/// A post identifier in the site's "fullname" form: a type prefix plus a
/// base-36 id (`t3_abc123` for submissions, `t1_def456` for comments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(s: impl Into<String>) -> Self {
        PostId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id with its type prefix removed (`t1_def456` -> `def456`).
    pub fn bare(&self) -> &str {
        self.0
            .split_once('_')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0)
    }

    /// Returns true if this id names a comment.
    pub fn is_comment(&self) -> bool {
        self.0.starts_with("t1_")
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}
