// error.rs - Error types for the bundle pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while encoding, configuring, or restoring.
///
/// Most of these never escape a whole run: the encoder and restorer catch them
/// per file and record the display text as a skip or failure reason.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path normalized to nothing usable.
    #[error("invalid path: '{path}' contains no usable segments")]
    InvalidPath { path: String },

    /// The final path segment is empty or contains reserved characters.
    #[error("invalid file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    /// A file write was requested where a directory already exists.
    #[error("target '{path}' is a directory")]
    TargetIsDirectory { path: String },

    /// A parent component of the target exists as a regular file.
    #[error("parent '{path}' exists and is not a directory")]
    ParentIsFile { path: String },

    /// The target or one of its parents is a symlink leading out of the
    /// project root.
    #[error("'{path}' resolves outside the project root")]
    OutsideRoot { path: String },

    /// The configuration file could not be parsed or written.
    #[error("configuration error in {path}: {message}")]
    ConfigError { path: PathBuf, message: String },
}
