// Moderation API trait: the seam between the pipelines and Reddit.

use anyhow::Result;
use async_trait::async_trait;

use super::models::Submission;

/// The handful of Reddit operations the fetch and quarantine stages need.
/// Implementations must be async because the real one is an HTTP client.
#[async_trait]
pub trait ModerationApi: Send + Sync {
    /// List up to `limit` of the newest submissions in a subreddit, newest first.
    async fn new_submissions(&self, subreddit: &str, limit: u32) -> Result<Vec<Submission>>;

    /// Look up submissions by full-name. Unknown names are simply absent
    /// from the result.
    async fn submissions_by_fullname(&self, fullnames: &[String]) -> Result<Vec<Submission>>;

    /// Set the NSFW flag on a submission.
    async fn mark_nsfw(&self, fullname: &str) -> Result<()>;

    /// Remove a submission (not as spam).
    async fn remove(&self, fullname: &str) -> Result<()>;

    /// Send a message to the moderators of a subreddit.
    async fn message_moderators(&self, subreddit: &str, subject: &str, body: &str) -> Result<()>;
}
