// Quarantine stage: classifier results -> NSFW flag, removal, modmail.
//
// 1. Read every `*.result` file in the image directory
// 2. Keep submissions scoring above the threshold that no list knows yet
// 3. Look them up in one batch; leave moderator-approved ones alone
// 4. Mark NSFW + remove the rest, record them, and send one alert message

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::lists::KnownLists;
use crate::reddit::models::Submission;
use crate::reddit::traits::ModerationApi;
use crate::results::{result_fullname, scan_results, ScoreReport};

pub const ALERT_SUBJECT: &str = "SFWBot Quarantine Alert";

const ALERT_PREAMBLE: &str = "The following submissions were quarantined for being possibly NSFW. \
If approved, a submission will be removed from the quarantine and will not be quarantined again.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarantineSummary {
    /// Result files read.
    pub scanned: usize,
    /// Result files that failed to parse.
    pub malformed: usize,
    /// Full-names above the threshold and not in either list.
    pub candidates: Vec<String>,
    /// Candidates a moderator had already approved; recorded as safe.
    pub approved: Vec<String>,
    /// Candidates marked NSFW and removed.
    pub quarantined: Vec<String>,
    /// Links included in the moderator alert.
    pub permalinks: Vec<String>,
    /// Whether the moderator alert was sent.
    pub notified: bool,
    pub dry_run: bool,
}

/// Body of the moderator alert: a preamble and one bullet per permalink.
pub fn alert_message(permalinks: &[String]) -> String {
    let bullets: Vec<String> = permalinks.iter().map(|p| format!("* {p}")).collect();
    format!("{ALERT_PREAMBLE}\n\n{}", bullets.join("\n"))
}

/// Read result files and pick the submissions that need quarantining.
fn collect_candidates(
    image_dir: &Path,
    threshold: f64,
    lists: &KnownLists,
    summary: &mut QuarantineSummary,
) -> Result<()> {
    for path in scan_results(image_dir)? {
        let Some(fullname) = result_fullname(&path) else {
            continue;
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        summary.scanned += 1;

        let report = match ScoreReport::parse(&fullname, &text) {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed result file, skipping");
                summary.malformed += 1;
                continue;
            }
        };

        if !report.exceeds(threshold) {
            continue;
        }
        if lists.contains(&report.fullname) {
            debug!(fullname = report.fullname.as_str(), "Already handled, skipping");
            continue;
        }
        debug!(
            fullname = report.fullname.as_str(),
            score = report.nsfw_score,
            "Over threshold"
        );
        summary.candidates.push(report.fullname);
    }
    Ok(())
}

/// Run the quarantine stage.
///
/// With `dry_run`, every decision is logged but nothing is mutated on Reddit,
/// no message is sent, and neither list is written. If a moderation call
/// fails partway, the submissions already quarantined are still announced
/// before the error is returned.
pub async fn run(
    api: &dyn ModerationApi,
    lists: &mut KnownLists,
    subreddit: &str,
    image_dir: &Path,
    threshold: f64,
    dry_run: bool,
) -> Result<QuarantineSummary> {
    let mut summary = QuarantineSummary {
        dry_run,
        ..Default::default()
    };

    collect_candidates(image_dir, threshold, lists, &mut summary)?;

    if summary.candidates.is_empty() {
        info!("Did not find any NSFW submissions to quarantine");
        return Ok(summary);
    }

    let submissions = api.submissions_by_fullname(&summary.candidates).await?;
    if submissions.len() < summary.candidates.len() {
        warn!(
            requested = summary.candidates.len(),
            found = submissions.len(),
            "Some submissions no longer exist"
        );
    }

    // Submissions acted on before a failure still get announced.
    let outcome = act_on_submissions(api, lists, &submissions, dry_run, &mut summary).await;
    let notified = notify_moderators(api, subreddit, &mut summary).await;

    if let Err(e) = outcome {
        if let Err(notify_err) = notified {
            warn!(
                error = %notify_err,
                count = summary.permalinks.len(),
                "Could not alert moderators about submissions already quarantined"
            );
        }
        return Err(e);
    }
    notified?;

    Ok(summary)
}

/// Mark NSFW and remove each unapproved candidate, recording it as it goes.
/// Stops at the first API or list-write failure.
async fn act_on_submissions(
    api: &dyn ModerationApi,
    lists: &mut KnownLists,
    submissions: &[Submission],
    dry_run: bool,
    summary: &mut QuarantineSummary,
) -> Result<()> {
    for submission in submissions {
        let fullname = submission.fullname();
        if !summary.candidates.iter().any(|c| c == fullname) {
            continue;
        }

        if submission.is_approved() {
            info!(
                fullname = fullname,
                approved_by = submission.approved_by.as_deref().unwrap_or_default(),
                "Submission approved by a moderator, skipping"
            );
            summary.approved.push(fullname.to_string());
            if !dry_run && lists.safe.insert(fullname) {
                lists.safe.save()?;
            }
            continue;
        }

        info!(fullname = fullname, "Quarantining submission for being possibly NSFW");
        if !dry_run {
            api.mark_nsfw(fullname).await?;
            api.remove(fullname).await?;
            // Record right away so a later failure doesn't cause a repeat.
            if lists.quarantine.insert(fullname) {
                lists.quarantine.save()?;
            }
        }
        summary.quarantined.push(fullname.to_string());
        summary.permalinks.push(submission.permalink_url());
    }
    Ok(())
}

/// Send the single alert listing every quarantined permalink, if any.
async fn notify_moderators(
    api: &dyn ModerationApi,
    subreddit: &str,
    summary: &mut QuarantineSummary,
) -> Result<()> {
    if summary.permalinks.is_empty() {
        return Ok(());
    }

    let body = alert_message(&summary.permalinks);
    if summary.dry_run {
        info!(
            count = summary.permalinks.len(),
            "Dry run: would send alert message to subreddit moderators"
        );
        return Ok(());
    }

    info!(
        count = summary.permalinks.len(),
        "Sending alert message to subreddit moderators"
    );
    api.message_moderators(subreddit, ALERT_SUBJECT, &body).await?;
    summary.notified = true;
    Ok(())
}
