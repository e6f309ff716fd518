// Fetch stage: newest submissions -> validated images in the image directory.
//
// 1. List the newest submissions
// 2. Skip anything already quarantined or marked safe
// 3. Download each remaining image into a scratch directory
// 4. Copy the good downloads into the image directory for the classifier
//
// Downloads land in scratch first so the classifier never sees a half-written
// or not-yet-validated file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::images::download::{FailureKind, ImageFetcher};
use crate::lists::KnownLists;
use crate::reddit::traits::ModerationApi;

/// What happened to each listed submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSummary {
    pub listed: usize,
    /// Already in the quarantine or safe list.
    pub skipped: usize,
    /// Full-names whose image is now in the image directory.
    pub downloaded: Vec<String>,
    /// Not an image (bad link, non-image content, 4xx).
    pub rejected: usize,
    /// Network trouble; worth retrying on a later run.
    pub failed: usize,
}

/// Full-names become file names, so refuse anything that could escape the
/// scratch directory.
fn is_safe_file_name(fullname: &str) -> bool {
    !fullname.is_empty()
        && fullname != "."
        && fullname != ".."
        && !fullname.contains(['/', '\\'])
}

/// Run the fetch stage.
///
/// Per-submission failures are logged and counted. Only listing errors and
/// local I/O errors abort the run.
pub async fn run(
    api: &dyn ModerationApi,
    fetcher: &ImageFetcher,
    lists: &KnownLists,
    subreddit: &str,
    limit: u32,
    image_dir: &Path,
) -> Result<FetchSummary> {
    let submissions = api.new_submissions(subreddit, limit).await?;
    let mut summary = FetchSummary {
        listed: submissions.len(),
        ..Default::default()
    };

    let scratch = tempfile::Builder::new()
        .prefix("sfwbot-")
        .tempdir()
        .context("Failed to create scratch directory")?;

    for submission in &submissions {
        let fullname = submission.fullname();

        if lists.contains(fullname) {
            info!(fullname = fullname, "Already processed, skipping");
            summary.skipped += 1;
            continue;
        }
        if !is_safe_file_name(fullname) {
            warn!(fullname = fullname, "Unusable full-name, skipping");
            summary.rejected += 1;
            continue;
        }

        let dest = scratch.path().join(fullname);
        match fetcher.fetch(&submission.url, &dest).await {
            Ok(()) => {
                info!(fullname = fullname, "Downloaded image from submission");
                summary.downloaded.push(fullname.to_string());
            }
            Err(e) => match e.kind() {
                FailureKind::Rejected => {
                    info!(fullname = fullname, reason = %e, "Skipped submission");
                    summary.rejected += 1;
                }
                FailureKind::Transient => {
                    warn!(fullname = fullname, error = %e, "Download failed, will retry next run");
                    summary.failed += 1;
                }
                FailureKind::Local => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to store image for {fullname}")));
                }
            },
        }
    }

    if !summary.downloaded.is_empty() {
        std::fs::create_dir_all(image_dir)
            .with_context(|| format!("Failed to create {}", image_dir.display()))?;
    }
    for fullname in &summary.downloaded {
        let from = scratch.path().join(fullname);
        let to = image_dir.join(fullname);
        std::fs::copy(&from, &to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    }

    info!(
        listed = summary.listed,
        skipped = summary.skipped,
        downloaded = summary.downloaded.len(),
        rejected = summary.rejected,
        failed = summary.failed,
        "Fetch complete"
    );

    Ok(summary)
}
