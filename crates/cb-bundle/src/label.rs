// label.rs - Change-label vocabulary attached to bundle headers.
//
// Labels are a closed set with one canonical bracketed form each. The encoder
// writes them in front of a path; the decoder strips any run of them back off
// and uses the run to decide whether an entry is a deletion.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A change annotation on a bundled path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLabel {
    New,
    Modified,
    Deleted,
    Moved,
}

impl ChangeLabel {
    pub const ALL: [ChangeLabel; 4] = [
        ChangeLabel::New,
        ChangeLabel::Modified,
        ChangeLabel::Deleted,
        ChangeLabel::Moved,
    ];

    /// The canonical bracketed form written into headers.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeLabel::New => "[NEW]",
            ChangeLabel::Modified => "[MODIFIED]",
            ChangeLabel::Deleted => "[DELETED]",
            ChangeLabel::Moved => "[MOVED]",
        }
    }

    /// Parse a bracketed label token. Matching ignores ASCII case so
    /// hand-edited bundles still decode.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for ChangeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split one leading label off `text`, returning the label and the remainder
/// with surrounding whitespace removed. A label must be followed by
/// whitespace or the end of the text; `[NEW]foo.txt` is a file name.
fn split_label(text: &str) -> Option<(ChangeLabel, &str)> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('[') {
        return None;
    }
    let close = trimmed.find(']')?;
    let rest = &trimmed[close + 1..];
    if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    let label = ChangeLabel::from_token(&trimmed[..=close])?;
    Some((label, rest.trim_start()))
}

/// Every label in the leading run of `path`, in order.
pub fn leading_labels(path: &str) -> Vec<ChangeLabel> {
    let mut labels = Vec::new();
    let mut rest = path;
    while let Some((label, remainder)) = split_label(rest) {
        labels.push(label);
        rest = remainder;
    }
    labels
}

/// Strip the full run of leading labels from `path`.
///
/// If nothing would remain, the input is returned untouched: a bare `[NEW]`
/// is treated as a file name, not a label.
pub fn strip_leading_labels(path: &str) -> &str {
    let mut rest = path;
    while let Some((_, remainder)) = split_label(rest) {
        rest = remainder;
    }
    if rest.is_empty() {
        path
    } else {
        rest
    }
}

/// True when any label in the leading run is `[DELETED]`.
pub fn is_deleted(path: &str) -> bool {
    if strip_leading_labels(path) == path {
        return false;
    }
    leading_labels(path).contains(&ChangeLabel::Deleted)
}

/// Render a header path: `"[LABEL] path"` when labelled, `path` otherwise.
pub fn labelled_path(label: Option<ChangeLabel>, path: &str) -> String {
    match label {
        Some(label) => format!("{} {}", label, path),
        None => path.to_string(),
    }
}
