// Persisted full-name lists: which submissions were already quarantined or
// approved as safe.
//
// Each list is a flat JSON array of strings. Lists are read whole at the start
// of a run and only ever appended to. Writes go through a temporary sibling
// file that is renamed over the original.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// An append-only, order-preserving set of submission full-names bound to
/// the JSON file it was loaded from.
#[derive(Debug, Clone)]
pub struct IdList {
    path: PathBuf,
    ids: Vec<String>,
    index: HashSet<String>,
}

impl IdList {
    /// Read a list from disk. A missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        let ids: Vec<String> = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of strings", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "List file missing, starting empty");
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let mut list = Self {
            path: path.to_path_buf(),
            ids: Vec::with_capacity(ids.len()),
            index: HashSet::with_capacity(ids.len()),
        };
        for id in ids {
            list.insert(id);
        }
        Ok(list)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.index.contains(fullname)
    }

    /// Append a full-name. Returns false if it was already present.
    pub fn insert(&mut self, fullname: impl Into<String>) -> bool {
        let fullname = fullname.into();
        if self.index.contains(&fullname) {
            return false;
        }
        self.index.insert(fullname.clone());
        self.ids.push(fullname);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Write the list back to its file.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, &self.ids)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = self.ids.len(), "Saved list");
        Ok(())
    }
}

/// The two lists every stage consults before touching a submission.
#[derive(Debug, Clone)]
pub struct KnownLists {
    pub quarantine: IdList,
    pub safe: IdList,
}

impl KnownLists {
    pub fn load(quarantine_path: &Path, safe_path: &Path) -> Result<Self> {
        Ok(Self {
            quarantine: IdList::load(quarantine_path)?,
            safe: IdList::load(safe_path)?,
        })
    }

    /// True if the submission was already quarantined or approved.
    pub fn contains(&self, fullname: &str) -> bool {
        self.quarantine.contains(fullname) || self.safe.contains(fullname)
    }
}
