//! # cb-bundle
//!
//! Packs a selection of files into one pasteable text block and turns such a
//! block back into files on disk.
//!
//! The pipeline runs leaf-first:
//!
//! - [`path`]: canonicalizes arbitrary path strings into safe relative paths.
//! - [`filter`]: include/exclude rules deciding which files are eligible.
//! - [`label`]: the closed change-label vocabulary (`[NEW]`, `[MODIFIED]`, ...).
//! - [`encoder`]: walks a selection and emits the bundle plus [`BundleStats`].
//! - [`decoder`]: recovers [`ParsedFileEntry`] values from pasted text, even
//!   when the header format has drifted.
//! - [`restore`]: turns decoded entries into a [`RestorePlan`] and executes it
//!   under an explicit [`ConflictPolicy`].
//!
//! Everything except [`restore::execute`] is a pure transformation over its
//! inputs; no state is shared between calls.

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod label;
pub mod path;
pub mod restore;
pub mod source;
pub mod stats;
pub mod template;

pub use config::{BundleConfig, Limits};
pub use decoder::{decode, ParsedFileEntry};
pub use encoder::{encode, EncodeOutput, EncodeRequest};
pub use error::BundleError;
pub use filter::{FilterConfig, FilterEngine, FilterRule, RuleAction, RuleKind};
pub use label::ChangeLabel;
pub use path::normalize_path;
pub use restore::{ConflictPolicy, RestorePlan, RestoreResult};
pub use source::{
    BinaryClassifier, ChangeStatusLookup, DefaultClassifier, FileContent, FileRecord, Selection,
};
pub use stats::{BundleStats, SkippedFile};
pub use template::HeaderTemplate;
