use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Base name of the config file looked up in the working directory when
/// `--config` is not given. Any extension the `config` crate understands works
/// (`sfwbot.toml`, `sfwbot.ini`, ...).
pub const DEFAULT_CONFIG_NAME: &str = "sfwbot";

/// Prefix for environment overrides, e.g. `SFWBOT_REDDIT__PASSWORD`.
pub const ENV_PREFIX: &str = "SFWBOT";

/// Central configuration, built once in `main` and handed to each stage.
///
/// Values come from a sectioned key/value file layered under environment
/// variables. Secrets belong in the environment (or a `.env` file, which is
/// loaded at startup via dotenvy), never in the repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditSettings,
    #[serde(default)]
    pub bot: BotSettings,
}

/// Credentials and endpoints for the Reddit script app.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// OAuth API host (defaults to https://oauth.reddit.com).
    pub api_url: String,
    /// Token endpoint host (defaults to https://www.reddit.com).
    pub auth_url: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            user_agent: crate::reddit::client::DEFAULT_USER_AGENT.to_string(),
            api_url: crate::reddit::client::DEFAULT_API_URL.to_string(),
            auth_url: crate::reddit::client::DEFAULT_AUTH_URL.to_string(),
        }
    }
}

/// Settings shared by the fetch and quarantine stages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Subreddit to moderate; the positional CLI argument wins when given.
    pub subreddit: Option<String>,
    /// Directory shared with the classifier (images in, `.result` files out).
    pub image_dir: Option<PathBuf>,
    /// How many of the newest submissions to look at per fetch run.
    pub submission_limit: u32,
    /// Minimum NSFW probability (exclusive) that triggers a quarantine.
    pub nsfw_threshold: f64,
    pub quarantine_list: PathBuf,
    pub safe_list: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            subreddit: None,
            image_dir: None,
            submission_limit: 10,
            nsfw_threshold: 0.3,
            quarantine_list: PathBuf::from("quarantine.json"),
            safe_list: PathBuf::from("safe.json"),
            request_timeout_secs: 30,
        }
    }
}

/// `SFWBOT_<SECTION>__<KEY>` overrides. Values stay strings so secrets such
/// as `007` survive intact; numeric settings are converted on deserialize.
fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

impl Config {
    /// Load configuration from a file plus `SFWBOT_*` environment overrides.
    ///
    /// With `path`, that file must exist. Without it, `sfwbot.<ext>` in the
    /// working directory is used if present and defaults apply otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let file = match path {
            Some(p) => ::config::File::from(p).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.bot.nsfw_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("bot.nsfw_threshold must be between 0 and 1, got {threshold}");
        }
        if self.bot.submission_limit == 0 {
            anyhow::bail!("bot.submission_limit must be at least 1");
        }
        Ok(())
    }

    /// Check that the Reddit script-app credentials are configured.
    /// Call this before any operation that talks to the Reddit API.
    pub fn require_reddit(&self) -> Result<()> {
        let r = &self.reddit;
        let missing: Vec<&str> = [
            ("client_id", r.client_id.is_empty()),
            ("client_secret", r.client_secret.is_empty()),
            ("username", r.username.is_empty()),
            ("password", r.password.is_empty()),
        ]
        .iter()
        .filter(|(_, empty)| *empty)
        .map(|(key, _)| *key)
        .collect();

        if !missing.is_empty() {
            anyhow::bail!(
                "Reddit credentials missing: {}.\n\
                 Set them in the [reddit] section of sfwbot.toml or as \
                 SFWBOT_REDDIT__<KEY> environment variables.",
                missing.join(", ")
            );
        }
        Ok(())
    }

    /// The subreddit to work on: CLI argument first, then the config file.
    /// Accepts `name`, `r/name` and `/r/name`.
    pub fn subreddit(&self, cli: Option<String>) -> Result<String> {
        let raw = cli
            .or_else(|| self.bot.subreddit.clone())
            .context("No subreddit given. Pass it as an argument or set bot.subreddit.")?;
        let name = raw
            .trim()
            .trim_start_matches('/')
            .trim_start_matches("r/")
            .trim_end_matches('/');
        if name.is_empty() {
            anyhow::bail!("Subreddit name is empty");
        }
        Ok(name.to_string())
    }

    /// The image directory: CLI argument first, then the config file.
    pub fn image_dir(&self, cli: Option<PathBuf>) -> Result<PathBuf> {
        cli.or_else(|| self.bot.image_dir.clone())
            .context("No image directory given. Pass --image-dir or set bot.image_dir.")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.bot.request_timeout_secs)
    }
}
