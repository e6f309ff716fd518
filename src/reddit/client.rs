// Reddit OAuth client: a thin reqwest wrapper for a script app.
//
// Authenticates with the password grant, caches the bearer token until just
// before it expires, and spaces every API call through the rate limiter.
// Only the endpoints behind ModerationApi are wrapped.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::models::{AccessToken, JsonEnvelope, Listing, Submission};
use super::rate_limiter::RateLimiter;
use super::traits::ModerationApi;
use crate::config::RedditSettings;

/// OAuth API host.
pub const DEFAULT_API_URL: &str = "https://oauth.reddit.com";

/// Host of the token endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";

pub const DEFAULT_USER_AGENT: &str = "sfwbot/0.1 (subreddit image moderation)";

/// Largest page `/new` returns and most ids `/api/info` accepts per call.
pub const MAX_PAGE_SIZE: usize = 100;

/// Refresh the token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct RedditClient {
    client: reqwest::Client,
    api_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    token: Mutex<Option<CachedToken>>,
    rate_limiter: RateLimiter,
}

impl RedditClient {
    /// Build a client from the `[reddit]` settings. Does not authenticate
    /// until the first request.
    pub fn new(settings: &RedditSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            auth_url: settings.auth_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            token: Mutex::new(None),
            rate_limiter: RateLimiter::default(),
        })
    }

    /// Return a valid bearer token, fetching a new one when the cached one
    /// is missing or about to expire.
    async fn bearer(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/api/v1/access_token", self.auth_url);
        self.rate_limiter.acquire().await;
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .context("Reddit token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit token endpoint returned {status}: {body}");
        }

        let token: AccessToken = response
            .json()
            .await
            .context("Failed to parse Reddit token response")?;

        info!(
            user = self.username.as_str(),
            expires_in = token.expires_in,
            "Authenticated with Reddit"
        );

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    /// GET an API path and deserialize the JSON response.
    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let token = self.bearer().await?;
        let url = format!("{}{}", self.api_url, path);

        debug!(path = path, "Reddit GET request");
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Reddit request failed: GET {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit GET {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize GET {path} response"))
    }

    /// POST a form to an API path, failing on a non-success status.
    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        let token = self.bearer().await?;
        let url = format!("{}{}", self.api_url, path);

        debug!(path = path, "Reddit POST request");
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Reddit request failed: POST {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit POST {path} returned {status}: {body}");
        }

        Ok(response)
    }
}

#[async_trait]
impl ModerationApi for RedditClient {
    async fn new_submissions(&self, subreddit: &str, limit: u32) -> Result<Vec<Submission>> {
        let limit = limit as usize;
        let path = format!("/r/{subreddit}/new");
        let mut submissions = Vec::new();
        let mut after: Option<String> = None;

        while submissions.len() < limit {
            let page_size = (limit - submissions.len()).min(MAX_PAGE_SIZE).to_string();
            let mut params: Vec<(&str, &str)> =
                vec![("limit", page_size.as_str()), ("raw_json", "1")];
            if let Some(ref cursor) = after {
                params.push(("after", cursor.as_str()));
            }

            let listing: Listing<Submission> = self
                .get(&path, &params)
                .await
                .with_context(|| format!("Failed to list new submissions in r/{subreddit}"))?;

            let next = listing.data.after.clone();
            let page = listing.into_submissions();
            if page.is_empty() {
                break;
            }
            submissions.extend(page);

            after = next;
            if after.is_none() {
                break;
            }
        }

        submissions.truncate(limit);
        info!(
            subreddit = subreddit,
            count = submissions.len(),
            "Listed new submissions"
        );
        Ok(submissions)
    }

    async fn submissions_by_fullname(&self, fullnames: &[String]) -> Result<Vec<Submission>> {
        let mut submissions = Vec::with_capacity(fullnames.len());
        for chunk in fullnames.chunks(MAX_PAGE_SIZE) {
            let ids = chunk.join(",");
            let listing: Listing<Submission> = self
                .get("/api/info", &[("id", ids.as_str()), ("raw_json", "1")])
                .await
                .context("Failed to look up submissions")?;
            submissions.extend(listing.into_submissions());
        }
        Ok(submissions)
    }

    async fn mark_nsfw(&self, fullname: &str) -> Result<()> {
        self.post_form("/api/marknsfw", &[("id", fullname)])
            .await
            .with_context(|| format!("Failed to mark {fullname} NSFW"))?;
        Ok(())
    }

    async fn remove(&self, fullname: &str) -> Result<()> {
        self.post_form("/api/remove", &[("id", fullname), ("spam", "false")])
            .await
            .with_context(|| format!("Failed to remove {fullname}"))?;
        Ok(())
    }

    async fn message_moderators(&self, subreddit: &str, subject: &str, body: &str) -> Result<()> {
        let to = format!("/r/{subreddit}");
        let response = self
            .post_form(
                "/api/compose",
                &[
                    ("api_type", "json"),
                    ("to", to.as_str()),
                    ("subject", subject),
                    ("text", body),
                ],
            )
            .await
            .with_context(|| format!("Failed to message moderators of r/{subreddit}"))?;

        let envelope: JsonEnvelope = response
            .json()
            .await
            .context("Failed to parse /api/compose response")?;
        if !envelope.json.errors.is_empty() {
            anyhow::bail!(
                "Reddit rejected the modmail to r/{subreddit}: {}",
                envelope.json.describe()
            );
        }
        Ok(())
    }
}
