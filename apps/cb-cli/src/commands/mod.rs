// mod.rs - Subcommands and the options they share.

pub mod config;
pub mod copy;
pub mod paste;
pub mod preview;

use std::path::{Path, PathBuf};

use anyhow::Context;
use cb_bundle::{BundleConfig, ChangeStatusLookup, Selection};
use cb_vcs::{GitStatus, VcsError};
use clap::Args;

/// Per-invocation overrides of the loaded configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Stop after this many files (overrides `limits.max_file_count`).
    #[arg(long)]
    pub max_files: Option<usize>,
    /// Per-file size limit in bytes; 0 disables it.
    #[arg(long)]
    pub max_size: Option<u64>,
    /// Header template with a `{path}` placeholder.
    #[arg(long)]
    pub header: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut BundleConfig) {
        if let Some(max) = self.max_files {
            config.limits.max_file_count = Some(max);
        }
        if let Some(max) = self.max_size {
            config.limits.max_file_size_bytes = Some(max);
        }
        if let Some(header) = &self.header {
            config.header_template = header.clone();
        }
    }
}

/// Which files to bundle.
#[derive(Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    /// Files or directories to include, relative to the project root
    /// (defaults to the whole project).
    pub paths: Vec<PathBuf>,
    /// Add every changed and untracked file reported by git.
    #[arg(long)]
    pub changes: bool,
    /// Do not consult git for change labels.
    #[arg(long, conflicts_with = "changes")]
    pub no_git: bool,
}

/// Load the project's configuration and apply command-line overrides.
pub fn effective_config(
    project_root: &Path,
    overrides: &ConfigOverrides,
) -> anyhow::Result<BundleConfig> {
    let (mut config, source) = BundleConfig::load_for_project(project_root)
        .context("failed to load bundle configuration")?;
    match source {
        Some(path) => tracing::debug!("using config {}", path.display()),
        None => tracing::debug!("no config file found; using defaults"),
    }
    overrides.apply(&mut config);
    Ok(config)
}

/// Git status for the project, when it is a repository and git is wanted.
pub fn load_git_status(project_root: &Path, args: &SelectionArgs) -> anyhow::Result<Option<GitStatus>> {
    if args.no_git {
        return Ok(None);
    }
    match GitStatus::load(project_root) {
        Ok(status) => Ok(Some(status)),
        Err(e) if args.changes => Err(e).context("--changes needs a git repository"),
        Err(VcsError::NotARepository { .. }) => Ok(None),
        Err(e) => {
            tracing::warn!("git status unavailable: {}", e);
            Ok(None)
        }
    }
}

/// Resolve the selection: explicit paths first, then git changes.
pub fn build_selection(
    project_root: &Path,
    args: &SelectionArgs,
    git: Option<&GitStatus>,
) -> Vec<Selection> {
    let mut selection: Vec<Selection> = args
        .paths
        .iter()
        .map(|path| Selection::Path(path.clone()))
        .collect();
    if args.changes {
        if let Some(status) = git {
            selection.extend(status.selection());
        }
    }
    if selection.is_empty() && !args.changes {
        selection.push(Selection::Path(project_root.to_path_buf()));
    }
    selection
}

pub fn as_lookup(git: Option<&GitStatus>) -> Option<&dyn ChangeStatusLookup> {
    git.map(|status| status as &dyn ChangeStatusLookup)
}
