//! Authenticated HTTP access to the Reddit API.
//!
//! Authentication uses the OAuth "script app" password grant. The access
//! token is cached and shared by every community; it is refreshed shortly
//! before it expires, or immediately after the API answers 401.

use std::time::{Duration, Instant};

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::source::{Result, SourceError};
use crate::types::Username;

/// API host for authenticated requests.
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

/// Token endpoint for the password grant.
pub const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh tokens this long before the server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Script-app credentials for the bot account.
#[derive(Clone)]
pub struct RedditCredentials {
    pub user_agent: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("user_agent", &self.user_agent)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RedditCredentials {
    /// Reads `CAKEDAY_USER_AGENT`, `CAKEDAY_CLIENT_ID`,
    /// `CAKEDAY_CLIENT_SECRET`, `CAKEDAY_USERNAME` and `CAKEDAY_PASSWORD`.
    ///
    /// # Errors
    ///
    /// [`SourceError::Auth`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SourceError::Auth(format!("{key} is not set")))
        };

        Ok(RedditCredentials {
            user_agent: require("CAKEDAY_USER_AGENT")?,
            client_id: require("CAKEDAY_CLIENT_ID")?,
            client_secret: require("CAKEDAY_CLIENT_SECRET")?,
            username: require("CAKEDAY_USERNAME")?,
            password: require("CAKEDAY_PASSWORD")?,
        })
    }
}

/// Where the client sends requests.
#[derive(Debug, Clone)]
pub struct RedditEndpoints {
    pub api_base: String,
    pub token_url: String,
}

impl Default for RedditEndpoints {
    fn default() -> Self {
        RedditEndpoints {
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// Shared, authenticated Reddit API client.
pub struct RedditClient {
    http: Client,
    credentials: RedditCredentials,
    endpoints: RedditEndpoints,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("credentials", &self.credentials)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self> {
        Self::with_endpoints(credentials, RedditEndpoints::default())
    }

    pub fn with_endpoints(credentials: RedditCredentials, endpoints: RedditEndpoints) -> Result<Self> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(RedditClient {
            http,
            credentials,
            endpoints,
            token: Mutex::new(None),
        })
    }

    /// Returns the account the client is logged in as. This is the identity
    /// the detectors use to recognise the bot's own comments.
    pub fn username(&self) -> Username {
        Username::from(self.credentials.username.as_str())
    }

    /// Returns a valid access token, fetching a new one if needed.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh()
        {
            return Ok(token.value.clone());
        }

        debug!(username = %self.credentials.username, "Requesting access token");
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Auth(format!("token endpoint returned {status}")));
        }

        let body: TokenResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(SourceError::Auth(error));
        }
        let value = body
            .access_token
            .ok_or_else(|| SourceError::Auth("no access_token in response".to_string()))?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));

        let token = AccessToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        };
        *cached = Some(token);
        Ok(value)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoints.api_base, path))
    }

    /// Sends an authenticated request and decodes the JSON body.
    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Value> {
        let token = self.access_token().await?;
        let response = builder.bearer_auth(token).send().await?;

        let status = response.status();
        trace!(path, %status, "Reddit API response");

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "Access token rejected, will re-authenticate");
            self.forget_token().await;
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }

    /// `GET {api_base}{path}` with `raw_json=1` added to `query`.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let builder = self
            .request(Method::GET, path)
            .query(query)
            .query(&[("raw_json", "1")]);
        self.send(path, builder).await
    }

    /// `POST {api_base}{path}` with a form body.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value> {
        let builder = self.request(Method::POST, path).form(form);
        self.send(path, builder).await
    }
}
