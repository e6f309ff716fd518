// Serde types for the parts of the Reddit API sfwbot reads.

use serde::Deserialize;

/// Public site root, used to turn relative permalinks into links.
pub const SITE_URL: &str = "https://www.reddit.com";

/// A submission (`t3` thing), only the fields the bot needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    /// Full-name, e.g. `t3_1abcde`. Stable dedup key across runs.
    pub name: String,
    /// Link target. Self posts point back at their own permalink.
    #[serde(default)]
    pub url: String,
    /// Site-relative permalink (`/r/pics/comments/...`).
    #[serde(default)]
    pub permalink: String,
    /// Moderator who approved the submission. Only visible to moderators.
    #[serde(default)]
    pub approved_by: Option<String>,
}

impl Submission {
    pub fn fullname(&self) -> &str {
        &self.name
    }

    pub fn is_approved(&self) -> bool {
        self.approved_by.is_some()
    }

    /// Absolute link to the submission's comments page.
    pub fn permalink_url(&self) -> String {
        if self.permalink.starts_with("http") {
            self.permalink.clone()
        } else {
            format!("{SITE_URL}{}", self.permalink)
        }
    }
}

/// Envelope for every Reddit object: `{"kind": "t3", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

/// Response shape of `/r/{sub}/new` and `/api/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    pub children: Vec<Thing<T>>,
    /// Cursor for the next page; `None` on the last one.
    pub after: Option<String>,
}

impl Listing<Submission> {
    /// Unwrap the `t3` children, ignoring any other thing kinds.
    pub fn into_submissions(self) -> Vec<Submission> {
        self.data
            .children
            .into_iter()
            .filter(|t| t.kind == "t3")
            .map(|t| t.data)
            .collect()
    }
}

/// Token endpoint response for the password grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Body returned by `api_type=json` endpoints such as `/api/compose`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonEnvelope {
    pub json: JsonErrors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonErrors {
    /// Each error is `[code, message, field]`.
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
}

impl JsonErrors {
    /// Render the error triples into one readable line.
    pub fn describe(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                e.iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
