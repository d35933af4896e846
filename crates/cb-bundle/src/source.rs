// source.rs - Selection sources and the uniform FileRecord the encoder sees.
//
// The host hands over a mix of plain paths, version-control change records,
// and untracked-file markers. They are resolved once at this boundary so the
// encoder loop only ever deals with `FileRecord`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::label::ChangeLabel;

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8192;

/// Extensions that are never worth reading as text.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "psd", "pdf", "zip", "gz", "tgz",
    "bz2", "xz", "7z", "rar", "tar", "jar", "war", "exe", "dll", "so", "dylib", "a", "lib", "o",
    "obj", "class", "pyc", "wasm", "bin", "dat", "db", "sqlite", "mp3", "mp4", "wav", "ogg",
    "flac", "mov", "avi", "mkv", "woff", "woff2", "ttf", "otf", "eot",
];

/// One root of the host's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A file or directory picked directly. Directories are traversed.
    Path(PathBuf),
    /// A version-control change record carrying its own label.
    Change { path: PathBuf, label: ChangeLabel },
    /// A file unknown to version control; encoded as `[NEW]`.
    Untracked(PathBuf),
}

impl Selection {
    pub fn path(&self) -> &Path {
        match self {
            Selection::Path(path)
            | Selection::Change { path, .. }
            | Selection::Untracked(path) => path,
        }
    }

    /// The label this selection carries on its own, if any.
    pub fn label(&self) -> Option<ChangeLabel> {
        match self {
            Selection::Path(_) => None,
            Selection::Change { label, .. } => Some(*label),
            Selection::Untracked(_) => Some(ChangeLabel::New),
        }
    }
}

/// Content of a resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    /// Not read because the file exceeds the size limit.
    TooLarge,
    /// Looks binary; never emitted.
    Binary,
    /// Could not be read; the string is the reason.
    Unavailable(String),
}

/// The uniform per-file shape produced at the selection boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Project-relative, slash-separated path written into the header.
    pub logical_path: String,
    pub label: Option<ChangeLabel>,
    pub size_bytes: u64,
    pub content: FileContent,
}

/// External version-control collaborator mapping paths to change labels.
pub trait ChangeStatusLookup {
    /// Label for a project-relative path, or `None` when unchanged/unknown.
    fn label_for(&self, relative_path: &str) -> Option<ChangeLabel>;

    /// Last committed content, used for files deleted from the working tree.
    fn historical_content(&self, _relative_path: &str) -> Option<Vec<u8>> {
        None
    }
}

impl ChangeStatusLookup for HashMap<String, ChangeLabel> {
    fn label_for(&self, relative_path: &str) -> Option<ChangeLabel> {
        self.get(relative_path).copied()
    }
}

/// Decides which files are binary and must be left out of a bundle.
pub trait BinaryClassifier {
    fn is_binary_path(&self, path: &Path) -> bool;
    fn is_binary_content(&self, bytes: &[u8]) -> bool;
}

/// Extension list first, then a NUL byte in the first 8 KiB.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl BinaryClassifier for DefaultClassifier {
    fn is_binary_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                BINARY_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    fn is_binary_content(&self, bytes: &[u8]) -> bool {
        bytes.get(..SNIFF_LEN).unwrap_or(bytes).contains(&0)
    }
}

/// Decode raw bytes as text, or classify them as binary.
pub fn classify_bytes(bytes: Vec<u8>, classifier: &dyn BinaryClassifier) -> FileContent {
    if classifier.is_binary_content(&bytes) {
        return FileContent::Binary;
    }
    match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(_) => FileContent::Binary,
    }
}
