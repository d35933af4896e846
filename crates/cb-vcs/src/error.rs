//! Error types for git access.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("IO error running git: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{} is not inside a git repository", path.display())]
    NotARepository { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, VcsError>;
