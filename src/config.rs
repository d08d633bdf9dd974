//! Process configuration from environment variables.
//!
//! Every setting has a default, so the bot starts with no configuration at
//! all (Reddit credentials are read separately by
//! [`crate::reddit::RedditCredentials::from_env`]). The bot recognises its
//! own replies by the account it logs in as, so there is no separate setting
//! for its name. Unparseable values fall back to the default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::Community;

/// Default communities to monitor.
pub const DEFAULT_COMMUNITIES: &[&str] = &["cakeday", "FreeKarma4U"];

/// Default record store location.
pub const DEFAULT_STORE_PATH: &str = "cakedays.json";

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Default backoff before restarting a failed worker.
pub const DEFAULT_RESTART_BACKOFF_SECS: u64 = 60;

/// Top-level bot settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Communities to monitor, one worker each.
    pub communities: Vec<Community>,

    pub store_path: PathBuf,

    pub listen_addr: SocketAddr,

    /// Pause between a worker failure and its restart.
    pub restart_backoff: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            communities: DEFAULT_COMMUNITIES.iter().map(|c| Community::from(*c)).collect(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            restart_backoff: Duration::from_secs(DEFAULT_RESTART_BACKOFF_SECS),
        }
    }
}

impl BotConfig {
    /// Reads the configuration from the process environment.
    ///
    /// - `CAKEDAY_COMMUNITIES`: comma-separated community names
    /// - `CAKEDAY_STORE_PATH`
    /// - `CAKEDAY_LISTEN_ADDR`
    /// - `CAKEDAY_RESTART_BACKOFF_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let communities = lookup("CAKEDAY_COMMUNITIES")
            .map(|s| parse_communities(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.communities);

        let store_path = lookup("CAKEDAY_STORE_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let listen_addr = lookup("CAKEDAY_LISTEN_ADDR")
            .and_then(|s| s.parse::<SocketAddr>().ok())
            .unwrap_or(defaults.listen_addr);

        let backoff_secs = lookup("CAKEDAY_RESTART_BACKOFF_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RESTART_BACKOFF_SECS);

        BotConfig {
            communities,
            store_path,
            listen_addr,
            restart_backoff: Duration::from_secs(backoff_secs),
        }
    }
}

/// Splits a comma-separated list, dropping blanks and an optional `r/`
/// prefix. Duplicates (ignoring case) keep their first spelling.
pub fn parse_communities(raw: &str) -> Vec<Community> {
    let mut communities: Vec<Community> = Vec::new();
    for name in raw.split(',') {
        let name = name.trim();
        let name = name.strip_prefix("r/").unwrap_or(name);
        if name.is_empty() {
            continue;
        }
        if communities
            .iter()
            .any(|c| c.as_str().eq_ignore_ascii_case(name))
        {
            continue;
        }
        communities.push(Community::from(name));
    }
    communities
}
