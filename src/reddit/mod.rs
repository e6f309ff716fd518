// Reddit API access: listing, lookup, and moderation actions.
//
// The pipelines only see the ModerationApi trait. RedditClient implements it
// over the OAuth API; tests substitute an in-memory fake.

pub mod client;
pub mod models;
pub mod rate_limiter;
pub mod traits;
