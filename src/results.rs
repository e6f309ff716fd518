// Classifier result files.
//
// The classifier writes `<fullname>.result` next to each image. The file is a
// set of `key: value` lines; the one we care about is `NSFW score`, a
// probability in [0, 1]. Other keys are ignored so the classifier can add
// fields without breaking us.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Extension of classifier output files.
pub const RESULT_EXTENSION: &str = "result";

/// Key of the NSFW probability line (matched case-insensitively).
pub const SCORE_KEY: &str = "NSFW score";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreParseError {
    #[error("no 'NSFW score' line")]
    MissingScore,

    #[error("'NSFW score' appears more than once (line {line})")]
    DuplicateScore { line: usize },

    #[error("'{value}' on line {line} is not a number")]
    InvalidNumber { line: usize, value: String },

    #[error("score {value} on line {line} is outside [0, 1]")]
    OutOfRange { line: usize, value: f64 },
}

/// A parsed result file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub fullname: String,
    pub nsfw_score: f64,
}

impl ScoreReport {
    /// Parse a result file's text for the given submission.
    ///
    /// Each line is split at the first `:` or `=`. Lines without a delimiter
    /// and lines with other keys are ignored.
    pub fn parse(fullname: &str, text: &str) -> Result<Self, ScoreParseError> {
        let mut score: Option<f64> = None;

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let Some((key, value)) = line.split_once([':', '=']) else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case(SCORE_KEY) {
                continue;
            }
            if score.is_some() {
                return Err(ScoreParseError::DuplicateScore { line: line_no });
            }

            let value = value.trim();
            let parsed: f64 = value.parse().map_err(|_| ScoreParseError::InvalidNumber {
                line: line_no,
                value: value.to_string(),
            })?;
            // NaN fails the range check too.
            if !(0.0..=1.0).contains(&parsed) {
                return Err(ScoreParseError::OutOfRange {
                    line: line_no,
                    value: parsed,
                });
            }
            score = Some(parsed);
        }

        Ok(Self {
            fullname: fullname.to_string(),
            nsfw_score: score.ok_or(ScoreParseError::MissingScore)?,
        })
    }

    /// Strictly above the threshold.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.nsfw_score > threshold
    }
}

/// Full-name a result file belongs to: its file name minus `.result`.
pub fn result_fullname(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != RESULT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// All `*.result` files directly inside `dir`, sorted by name.
pub fn scan_results(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && result_fullname(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
