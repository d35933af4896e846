//! Git working-tree status as bundle selections and change labels.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use cb_bundle::{ChangeLabel, ChangeStatusLookup, Selection};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VcsError};

/// One changed path from `git status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Slash-separated path. Relative to the repository root as parsed, and
    /// to the project root once loaded through `GitStatus::load`.
    pub path: String,
    pub label: ChangeLabel,
    /// Unknown to git (`??`).
    pub untracked: bool,
    /// Source path of a rename or copy.
    pub original_path: Option<String>,
}

impl ChangeEntry {
    /// The selection this change contributes, rooted at `project_root`.
    pub fn into_selection(self, project_root: &Path) -> Selection {
        let path = project_root.join(&self.path);
        if self.untracked {
            Selection::Untracked(path)
        } else {
            Selection::Change {
                path,
                label: self.label,
            }
        }
    }
}

/// Map a two-letter porcelain status to a label. `None` for ignored and
/// unchanged entries.
fn label_for_status(x: char, y: char) -> Option<(ChangeLabel, bool)> {
    match (x, y) {
        ('?', '?') => Some((ChangeLabel::New, true)),
        ('!', '!') => None,
        _ if x == 'R' || y == 'R' => Some((ChangeLabel::Moved, false)),
        _ if x == 'D' || y == 'D' => Some((ChangeLabel::Deleted, false)),
        _ if matches!(x, 'A' | 'C') => Some((ChangeLabel::New, false)),
        _ if matches!(x, 'M' | 'T' | 'U') || matches!(y, 'M' | 'T' | 'U' | 'A') => {
            Some((ChangeLabel::Modified, false))
        }
        _ => None,
    }
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Records are NUL-terminated `XY <path>`. Renames and copies are followed by
/// one extra NUL-terminated field holding the original path.
pub fn parse_porcelain(output: &str) -> Vec<ChangeEntry> {
    let mut entries = Vec::new();
    let mut fields = output.split('\0');

    while let Some(record) = fields.next() {
        if record.len() < 4 {
            continue;
        }
        let mut status = record.chars();
        let (Some(x), Some(y)) = (status.next(), status.next()) else {
            continue;
        };
        let path = &record[3..];

        let original_path = if matches!(x, 'R' | 'C') {
            fields.next().map(str::to_string)
        } else {
            None
        };

        let Some((label, untracked)) = label_for_status(x, y) else {
            tracing::debug!("ignoring git status {}{} for {}", x, y, path);
            continue;
        };
        entries.push(ChangeEntry {
            path: path.to_string(),
            label,
            untracked,
            original_path,
        });
    }

    entries
}

/// Snapshot of a repository's working-tree changes under a project root.
#[derive(Debug, Clone)]
pub struct GitStatus {
    project_root: PathBuf,
    entries: Vec<ChangeEntry>,
    labels: HashMap<String, ChangeLabel>,
}

impl GitStatus {
    /// Run `git status` for `project_root`. When the project is a
    /// subdirectory of the repository, only changes beneath it are kept and
    /// their paths are made relative to it.
    pub fn load(project_root: &Path) -> Result<Self> {
        let prefix = match git_cmd(project_root, &["rev-parse", "--show-prefix"]) {
            Ok(out) => String::from_utf8_lossy(&out).trim().to_string(),
            Err(VcsError::CommandFailed { stderr, .. })
                if stderr.to_lowercase().contains("not a git repository") =>
            {
                return Err(VcsError::NotARepository {
                    path: project_root.to_path_buf(),
                });
            }
            Err(e) => return Err(e),
        };

        let raw = git_cmd(
            project_root,
            &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
        )?;
        let entries: Vec<ChangeEntry> = parse_porcelain(&String::from_utf8_lossy(&raw))
            .into_iter()
            .filter_map(|mut entry| {
                let relative = entry.path.strip_prefix(&prefix)?.to_string();
                entry.path = relative;
                Some(entry)
            })
            .collect();

        tracing::info!(
            "git status: {} changed path(s) under {}",
            entries.len(),
            project_root.display()
        );
        Ok(Self::from_entries(project_root, entries))
    }

    /// Build a status from already-parsed entries (paths relative to
    /// `project_root`).
    pub fn from_entries(project_root: &Path, entries: Vec<ChangeEntry>) -> Self {
        let labels = entries
            .iter()
            .map(|entry| (entry.path.clone(), entry.label))
            .collect();
        Self {
            project_root: project_root.to_path_buf(),
            entries,
            labels,
        }
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every change as a selection, in `git status` order.
    pub fn selection(&self) -> Vec<Selection> {
        self.entries
            .iter()
            .cloned()
            .map(|entry| entry.into_selection(&self.project_root))
            .collect()
    }
}

impl ChangeStatusLookup for GitStatus {
    fn label_for(&self, relative_path: &str) -> Option<ChangeLabel> {
        self.labels.get(relative_path).copied()
    }

    fn historical_content(&self, relative_path: &str) -> Option<Vec<u8>> {
        let object = format!("HEAD:./{}", relative_path);
        match git_cmd(&self.project_root, &["show", &object]) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("no committed content for {}: {}", relative_path, e);
                None
            }
        }
    }
}

/// Run git in `dir` and return raw stdout.
fn git_cmd(dir: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;

    if !output.status.success() {
        return Err(VcsError::CommandFailed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
