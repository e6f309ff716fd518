// Status display: list sizes, last update times, and what is waiting in the
// image directory.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::lists::{IdList, KnownLists};
use crate::results::result_fullname;

/// What the image directory currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirStats {
    /// Downloaded images waiting for (or done with) classification.
    pub images: usize,
    /// Classifier result files.
    pub results: usize,
    /// Result files for submissions neither list knows about yet.
    pub pending: usize,
}

/// Count images and result files directly inside `dir`.
pub fn dir_stats(dir: &Path, lists: &KnownLists) -> Result<DirStats> {
    let mut stats = DirStats::default();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
        {
            continue;
        }
        match result_fullname(&path) {
            Some(fullname) => {
                stats.results += 1;
                if !lists.contains(&fullname) {
                    stats.pending += 1;
                }
            }
            None => stats.images += 1,
        }
    }
    Ok(stats)
}

/// Display system status to the terminal.
pub fn show(lists: &KnownLists, image_dir: Option<&Path>) -> Result<()> {
    print_list("Quarantine list", &lists.quarantine);
    print_list("Safe list", &lists.safe);

    match image_dir {
        Some(dir) if dir.exists() => {
            let stats = dir_stats(dir, lists)?;
            println!("Image directory: {}", dir.display());
            println!("  Images: {}", stats.images);
            println!(
                "  Result files: {} ({} not yet acted on)",
                stats.results, stats.pending
            );
            if stats.pending > 0 {
                println!("  Run `sfwbot quarantine` to act on them");
            }
        }
        Some(dir) => {
            println!("Image directory: {} (does not exist yet)", dir.display());
            println!("  Run `sfwbot fetch` to download images");
        }
        None => {
            println!("Image directory: not configured");
        }
    }

    Ok(())
}

fn print_list(label: &str, list: &IdList) {
    let updated = std::fs::metadata(list.path())
        .and_then(|m| m.modified())
        .map(|t| {
            DateTime::<Local>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| "never".to_string());
    println!(
        "{label}: {} ({} entries, updated {updated})",
        list.path().display(),
        list.len()
    );
}
