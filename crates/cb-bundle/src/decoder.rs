// decoder.rs - Recovers file entries from pasted bundle text.
//
// The decoder never fails. Each recognized header opens a new entry and
// closes the previous one; everything between two headers is the earlier
// entry's body. Text before the first header is ignored. An input with no
// recognizable header yields an empty list.

use serde::{Deserialize, Serialize};

use crate::encoder::is_size_skip_marker;
use crate::label::{is_deleted, leading_labels, strip_leading_labels, ChangeLabel};
use crate::path::normalize_path;
use crate::template::HeaderTemplate;

/// One file recovered from a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFileEntry {
    /// The path exactly as captured from the header, labels included.
    pub raw_path: String,
    /// Labels stripped and normalized. Empty means the header carried no
    /// usable path; the restorer reports such entries as failures.
    pub path: String,
    /// First label of the leading run, if any.
    pub label: Option<ChangeLabel>,
    /// Any label in the leading run was `[DELETED]`.
    pub is_deleted: bool,
    /// Body with leading and trailing blank lines removed.
    pub content: String,
    /// The body is only the encoder's size-skip marker.
    pub is_placeholder: bool,
}

struct OpenEntry<'t> {
    raw_path: String,
    lines: Vec<&'t str>,
}

impl OpenEntry<'_> {
    fn finish(self) -> ParsedFileEntry {
        let start = self
            .lines
            .iter()
            .position(|line| !line.trim().is_empty())
            .unwrap_or(self.lines.len());
        let end = self
            .lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(start, |last| last + 1);
        let content = self.lines[start..end].join("\n");

        let raw = self.raw_path.as_str();
        let labels = if strip_leading_labels(raw) == raw {
            Vec::new()
        } else {
            leading_labels(raw)
        };
        let path = normalize_path(strip_leading_labels(raw));
        let is_placeholder = is_size_skip_marker(&content);

        ParsedFileEntry {
            label: labels.first().copied(),
            is_deleted: is_deleted(raw),
            path,
            is_placeholder,
            content,
            raw_path: self.raw_path,
        }
    }
}

/// Parse `text` into file entries using `template`, falling back to the
/// generic `file: <path>` recognizer for lines the template does not match.
pub fn decode(text: &str, template: &HeaderTemplate) -> Vec<ParsedFileEntry> {
    let mut entries = Vec::new();
    let mut current: Option<OpenEntry<'_>> = None;

    // Split on `\n` only: body lines keep any `\r`, header lines drop it.
    for line in text.split('\n') {
        let header_line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(raw_path) = template.match_line(header_line) {
            if let Some(open) = current.take() {
                entries.push(open.finish());
            }
            current = Some(OpenEntry {
                raw_path: raw_path.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(open) = current.as_mut() {
            open.lines.push(line);
        }
    }

    if let Some(open) = current.take() {
        entries.push(open.finish());
    }

    tracing::debug!("decoded {} bundle entries", entries.len());
    entries
}
