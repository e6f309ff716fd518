// Fetch-and-validate for submission images.
//
// Two checks bracket the single GET: a MIME guess from the URL alone (so
// obvious non-images never hit the network) and a magic-byte sniff of the
// written file (so an HTML error page saved as "cat.jpg" is thrown away).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use mime_guess::mime;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Imgur page links (`https://imgur.com/abc123`) serve the image itself once
/// an extension is added.
const IMGUR_MARKER: &str = "imgur";
const IMGUR_EXTENSION: &str = ".jpg";

/// How a failed fetch should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The link is not an image and never will be. Skip the submission.
    Rejected,
    /// Network trouble; the same link may work on a later run.
    Transient,
    /// The local working directory is unusable. Abort the run.
    Local,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("url required")]
    EmptyUrl,

    #[error("url '{url}' is not valid: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("mime type of url '{url}' is not an image")]
    NotImageUrl { url: String },

    #[error("header of file '{}' is not an image", path.display())]
    NotImageContent { path: PathBuf },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("GET {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not write '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::EmptyUrl
            | FetchError::InvalidUrl { .. }
            | FetchError::NotImageUrl { .. }
            | FetchError::NotImageContent { .. } => FailureKind::Rejected,
            FetchError::Status { status, .. } => {
                if status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS {
                    FailureKind::Transient
                } else {
                    FailureKind::Rejected
                }
            }
            FetchError::Request { .. } => FailureKind::Transient,
            FetchError::Io { .. } => FailureKind::Local,
        }
    }
}

/// Apply host-specific rewrites before anything else looks at the URL.
pub fn rewrite_url(url: &str) -> String {
    if url.contains(IMGUR_MARKER) {
        format!("{url}{IMGUR_EXTENSION}")
    } else {
        url.to_string()
    }
}

/// Validate a link without touching the network: non-empty, rewritten,
/// parseable http(s), and named like an image. Returns the URL to download.
pub fn check_url(url: &str) -> Result<Url, FetchError> {
    if url.trim().is_empty() {
        return Err(FetchError::EmptyUrl);
    }

    let rewritten = rewrite_url(url.trim());
    let parsed = Url::parse(&rewritten).map_err(|e| FetchError::InvalidUrl {
        url: rewritten.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
            url: rewritten,
        });
    }

    // Guess from the path only so query strings don't hide the extension.
    let is_image = mime_guess::from_path(parsed.path())
        .first()
        .is_some_and(|m| m.type_() == mime::IMAGE);
    if !is_image {
        return Err(FetchError::NotImageUrl { url: rewritten });
    }

    Ok(parsed)
}

/// Sniff a file's leading bytes for a known image signature.
pub fn is_image_file(path: &Path) -> std::io::Result<bool> {
    Ok(infer::get_from_path(path)?.is_some_and(|t| t.matcher_type() == infer::MatcherType::Image))
}

/// Downloads submission images over a shared HTTP client.
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Download the image at `url` to `dest`.
    ///
    /// Fails before any network call if the URL is empty or does not look
    /// like an image. On success `dest` holds a file whose header sniffs as an
    /// image; on any failure after the GET, `dest` is removed.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let target = check_url(url)?;
        let url_str = target.to_string();

        debug!(url = url_str.as_str(), dest = %dest.display(), "Downloading image");

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_str,
                status,
            });
        }

        if let Err(e) = write_body(response, &url_str, dest).await {
            // Don't leave half a file behind for the classifier.
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        let is_image = is_image_file(dest).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        if !is_image {
            tokio::fs::remove_file(dest)
                .await
                .map_err(|source| FetchError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
            return Err(FetchError::NotImageContent {
                path: dest.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Stream the response body to `dest` chunk by chunk.
async fn write_body(response: reqwest::Response, url: &str, dest: &Path) -> Result<(), FetchError> {
    let io_err = |source: std::io::Error| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;
    Ok(())
}
