// restore.rs - Turns decoded entries into filesystem changes.
//
// Restoring is two-phase:
//
//   1. `plan()` checks the filesystem once and records which targets already
//      exist. The conflict list is read off the finished plan and shown to the
//      user before anything is written.
//   2. `execute()` applies the plan under a single `ConflictPolicy` chosen
//      from that list. Each entry fails on its own; the run always finishes
//      and reports aggregate counts.
//
// Targets are always `project_root.join(normalized_path)`. Normalization has
// already removed `..`, drive prefixes, and absolute roots. Symlinks are the
// remaining way out: a symlinked parent or target is followed only when it
// resolves inside the project root.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::decoder::ParsedFileEntry;
use crate::error::BundleError;
use crate::path::validate_file_name;

/// How to treat writes whose target already exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Do nothing at all if any conflict exists.
    #[default]
    Abort,
    /// Replace every existing target.
    OverwriteAll,
    /// Leave every existing target untouched.
    SkipExisting,
    /// Overwrite exactly the listed paths; skip other existing targets.
    PerFile(BTreeSet<String>),
}

impl ConflictPolicy {
    fn allows_overwrite(&self, path: &str) -> bool {
        match self {
            ConflictPolicy::OverwriteAll => true,
            ConflictPolicy::PerFile(approved) => approved.contains(path),
            ConflictPolicy::Abort | ConflictPolicy::SkipExisting => false,
        }
    }
}

/// A file to create or overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedWrite {
    /// Normalized relative path (may be empty for an unusable header).
    pub path: String,
    /// Header path as written in the bundle, for reporting.
    pub raw_path: String,
    pub content: String,
    /// A regular file already exists at the target.
    pub exists: bool,
    /// Body is a size-skip marker; never written.
    pub placeholder: bool,
}

/// A file the bundle marks as deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDelete {
    pub path: String,
    pub raw_path: String,
    /// An existing non-directory target was found.
    pub exists: bool,
}

/// The filesystem operations derived from a bundle. Built once, then only
/// executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePlan {
    pub root: PathBuf,
    pub writes: Vec<PlannedWrite>,
    pub deletes: Vec<PlannedDelete>,
}

/// One entry that could not be restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: String,
    pub reason: String,
}

/// Aggregate outcome of `execute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResult {
    /// New files written.
    pub created_count: usize,
    /// Existing files replaced.
    pub overwritten_count: usize,
    /// Writes not performed (existing target under the policy, or placeholder).
    pub skipped_count: usize,
    pub deleted_count: usize,
    /// Deletions whose target did not exist.
    pub not_found_count: usize,
    pub failures: Vec<RestoreFailure>,
    /// The policy was `Abort` and the plan had conflicts; nothing ran.
    pub aborted: bool,
}

impl RestoreResult {
    /// Nothing was changed on disk and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.created_count == 0
            && self.overwritten_count == 0
            && self.deleted_count == 0
            && self.failures.is_empty()
    }

    /// One-line summary for the notification surface.
    pub fn summary(&self) -> String {
        if self.aborted {
            return "Restore aborted: existing files would be overwritten.".to_string();
        }
        let mut summary = format!(
            "{} created, {} overwritten, {} skipped, {} deleted",
            self.created_count, self.overwritten_count, self.skipped_count, self.deleted_count
        );
        if self.not_found_count > 0 {
            summary.push_str(&format!(", {} not found", self.not_found_count));
        }
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        summary
    }
}

/// Existing non-directory entry at `path` (symlinks count as files).
fn is_existing_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| !meta.is_dir())
}

impl RestorePlan {
    /// Split entries into writes and deletions and check their targets.
    ///
    /// When a bundle names the same path more than once, the last entry wins
    /// and keeps the position of the first.
    pub fn build(entries: &[ParsedFileEntry], project_root: &Path) -> Self {
        let mut latest: Vec<&ParsedFileEntry> = Vec::with_capacity(entries.len());
        let mut index: HashMap<&str, usize> = HashMap::new();
        for entry in entries {
            if entry.path.is_empty() {
                latest.push(entry);
                continue;
            }
            match index.get(entry.path.as_str()) {
                Some(&i) => latest[i] = entry,
                None => {
                    index.insert(entry.path.as_str(), latest.len());
                    latest.push(entry);
                }
            }
        }

        let mut writes = Vec::new();
        let mut deletes = Vec::new();
        for entry in latest {
            let target = project_root.join(&entry.path);
            let exists = !entry.path.is_empty() && is_existing_file(&target);
            if entry.is_deleted {
                deletes.push(PlannedDelete {
                    path: entry.path.clone(),
                    raw_path: entry.raw_path.clone(),
                    exists,
                });
            } else {
                writes.push(PlannedWrite {
                    path: entry.path.clone(),
                    raw_path: entry.raw_path.clone(),
                    content: entry.content.clone(),
                    exists,
                    placeholder: entry.is_placeholder,
                });
            }
        }

        Self {
            root: project_root.to_path_buf(),
            writes,
            deletes,
        }
    }

    /// Writes whose target already exists, in bundle order. This is the
    /// pre-flight list a conflict policy is chosen from.
    pub fn conflicts(&self) -> Vec<&str> {
        self.writes
            .iter()
            .filter(|w| w.exists && !w.placeholder)
            .map(|w| w.path.as_str())
            .collect()
    }

    /// Deletions that resolve to an existing file.
    pub fn deletions(&self) -> impl Iterator<Item = &PlannedDelete> {
        self.deletes.iter().filter(|d| d.exists)
    }

    /// No write and no real deletion: "nothing to do".
    pub fn is_empty(&self) -> bool {
        self.writes.iter().all(|w| w.placeholder) && self.deletions().next().is_none()
    }
}

/// Build a restore plan. See [`RestorePlan::build`].
pub fn plan(entries: &[ParsedFileEntry], project_root: &Path) -> RestorePlan {
    RestorePlan::build(entries, project_root)
}

/// Execute `plan` under `policy`.
pub fn execute(plan: &RestorePlan, policy: &ConflictPolicy) -> RestoreResult {
    let mut result = RestoreResult::default();

    if *policy == ConflictPolicy::Abort && !plan.conflicts().is_empty() {
        tracing::info!(
            "restore aborted: {} existing file(s) would be overwritten",
            plan.conflicts().len()
        );
        result.aborted = true;
        return result;
    }

    for write in &plan.writes {
        if let Err(e) = apply_write(&plan.root, write, policy, &mut result) {
            tracing::warn!("failed to restore {}: {}", display_path(write), e);
            result.failures.push(RestoreFailure {
                path: display_path(write).to_string(),
                reason: e.to_string(),
            });
        }
    }

    for delete in &plan.deletes {
        if let Err(e) = apply_delete(&plan.root, delete, &mut result) {
            tracing::warn!("failed to delete {}: {}", delete.path, e);
            result.failures.push(RestoreFailure {
                path: if delete.path.is_empty() {
                    delete.raw_path.clone()
                } else {
                    delete.path.clone()
                },
                reason: e.to_string(),
            });
        }
    }

    tracing::info!("restore finished: {}", result.summary());
    result
}

fn display_path(write: &PlannedWrite) -> &str {
    if write.path.is_empty() {
        &write.raw_path
    } else {
        &write.path
    }
}

fn apply_write(
    root: &Path,
    write: &PlannedWrite,
    policy: &ConflictPolicy,
    result: &mut RestoreResult,
) -> Result<(), BundleError> {
    validate_file_name(&write.path).map_err(|e| match e {
        BundleError::InvalidPath { .. } => BundleError::InvalidPath {
            path: write.raw_path.clone(),
        },
        other => other,
    })?;

    if write.placeholder {
        tracing::debug!("not restoring size-skipped placeholder {}", write.path);
        result.skipped_count += 1;
        return Ok(());
    }

    let target = root.join(&write.path);
    if target.is_dir() {
        return Err(BundleError::TargetIsDirectory {
            path: write.path.clone(),
        });
    }

    // A target that appeared after planning is still treated as a conflict.
    let exists = write.exists || is_existing_file(&target);
    if exists && !policy.allows_overwrite(&write.path) {
        tracing::debug!("skipping existing {}", write.path);
        result.skipped_count += 1;
        return Ok(());
    }

    ensure_parent_dirs(root, &write.path)?;
    if fs::symlink_metadata(&target).is_ok_and(|meta| meta.file_type().is_symlink()) {
        ensure_contained(root, &target, &write.path)?;
    }
    fs::write(&target, with_final_newline(&write.content)).map_err(|source| {
        BundleError::IoError {
            path: target.clone(),
            source,
        }
    })?;

    if exists {
        tracing::debug!("overwrote {}", write.path);
        result.overwritten_count += 1;
    } else {
        tracing::debug!("created {}", write.path);
        result.created_count += 1;
    }
    Ok(())
}

fn apply_delete(
    root: &Path,
    delete: &PlannedDelete,
    result: &mut RestoreResult,
) -> Result<(), BundleError> {
    validate_file_name(&delete.path)?;

    if !delete.exists {
        tracing::debug!("{} not found, skipped", delete.path);
        result.not_found_count += 1;
        return Ok(());
    }

    let target = root.join(&delete.path);
    if let Some(parent) = target.parent().filter(|parent| parent.exists()) {
        ensure_contained(root, parent, &delete.path)?;
    }
    match fs::remove_file(&target) {
        Ok(()) => {
            tracing::debug!("deleted {}", delete.path);
            result.deleted_count += 1;
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            result.not_found_count += 1;
            Ok(())
        }
        Err(source) => Err(BundleError::IoError {
            path: target,
            source,
        }),
    }
}

/// Fail unless `path` resolves to a location under the resolved `root`.
/// Dangling links cannot be resolved and count as outside.
fn ensure_contained(root: &Path, path: &Path, rel: &str) -> Result<(), BundleError> {
    let resolved_root = fs::canonicalize(root).map_err(|source| BundleError::IoError {
        path: root.to_path_buf(),
        source,
    })?;
    match fs::canonicalize(path) {
        Ok(resolved) if resolved.starts_with(&resolved_root) => Ok(()),
        _ => Err(BundleError::OutsideRoot {
            path: rel.to_string(),
        }),
    }
}

/// Create every missing parent of `rel` under `root`, one level at a time.
/// Existing directories are reused; an existing file in the way is an error.
/// A symlinked directory is reused only when it stays under `root`.
/// Creation is create-if-absent, so concurrent creators of a shared parent
/// do not fail each other.
fn ensure_parent_dirs(root: &Path, rel: &str) -> Result<(), BundleError> {
    let mut segments: Vec<&str> = rel.split('/').collect();
    segments.pop();

    let mut current = root.to_path_buf();
    for segment in segments {
        current.push(segment);
        let shown = || current.strip_prefix(root).unwrap_or(&current).display().to_string();
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.is_dir() => continue,
            Ok(meta) if meta.file_type().is_symlink() && current.is_dir() => {
                ensure_contained(root, &current, &shown())?;
                continue;
            }
            Ok(_) => return Err(BundleError::ParentIsFile { path: shown() }),
            Err(_) => {}
        }
        match fs::create_dir(&current) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists && current.is_dir() => {}
            Err(source) => {
                return Err(BundleError::IoError {
                    path: current,
                    source,
                })
            }
        }
    }
    Ok(())
}

/// Decoded bodies exclude the final newline; put one back on non-empty text.
fn with_final_newline(content: &str) -> String {
    if content.is_empty() || content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{}\n", content)
    }
}
