//! Version-control collaborator for clipbundle.
//!
//! Reads the working-tree status of a git repository and exposes it two ways:
//! as [`cb_bundle::Selection`] values (so "copy my changes" works without the
//! user picking files) and as a [`cb_bundle::ChangeStatusLookup`] (so plain
//! files reached through directory traversal still get their labels).

pub mod error;
pub mod git;

pub use error::VcsError;
pub use git::{parse_porcelain, ChangeEntry, GitStatus};
