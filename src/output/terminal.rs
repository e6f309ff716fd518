// Colored terminal output for run summaries.
//
// Logging goes through tracing; this module prints the short human-facing
// recap at the end of each command.

use colored::Colorize;

use crate::pipeline::fetch::FetchSummary;
use crate::pipeline::quarantine::QuarantineSummary;

/// Display the outcome of a fetch run.
pub fn display_fetch_summary(subreddit: &str, summary: &FetchSummary) {
    println!("\n{}", format!("=== Fetch r/{subreddit} ===").bold());
    println!("  Submissions listed:   {}", summary.listed);
    println!(
        "  Already processed:    {}",
        summary.skipped.to_string().dimmed()
    );
    println!(
        "  Images downloaded:    {}",
        summary.downloaded.len().to_string().green()
    );
    println!("  Not an image:         {}", summary.rejected);
    if summary.failed > 0 {
        println!(
            "  {} {} downloads failed (network), will retry next run",
            "!".yellow(),
            summary.failed
        );
    }
}

/// Display the outcome of a quarantine run.
pub fn display_quarantine_summary(subreddit: &str, summary: &QuarantineSummary) {
    let title = if summary.dry_run {
        format!("=== Quarantine r/{subreddit} (dry run) ===")
    } else {
        format!("=== Quarantine r/{subreddit} ===")
    };
    println!("\n{}", title.bold());
    println!("  Result files read:    {}", summary.scanned);
    if summary.malformed > 0 {
        println!(
            "  {} {} malformed result files skipped",
            "!".yellow(),
            summary.malformed
        );
    }
    println!("  Over threshold:       {}", summary.candidates.len());
    println!(
        "  Approved (now safe):  {}",
        summary.approved.len().to_string().green()
    );

    if summary.quarantined.is_empty() {
        println!("\n  {}", "No submissions quarantined.".green());
        return;
    }

    let verb = if summary.dry_run {
        "Would quarantine"
    } else {
        "Quarantined"
    };
    println!(
        "\n  {} {} submissions:",
        verb.red().bold(),
        summary.quarantined.len()
    );
    for link in &summary.permalinks {
        println!("    {}", link.dimmed());
    }
    if summary.notified {
        println!("  Moderators notified.");
    }
}
