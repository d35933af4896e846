// stats.rs - Aggregate statistics reported alongside an encoded bundle.

use serde::{Deserialize, Serialize};

/// Characters counted as extra tokens on top of whitespace-separated words.
const STRUCTURAL_PUNCTUATION: &[char] = &[';', '{', '}', '(', ')', '[', ']', ','];

/// A file the encoder passed over, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Counters and text measurements for one encode run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleStats {
    /// Files whose content was written into the bundle.
    pub file_count: usize,
    /// Files emitted as a header plus size-skip marker.
    pub skipped_by_size_count: usize,
    /// Files silently left out because they look binary.
    pub skipped_binary_count: usize,
    /// Files left out for any other reason (unreadable, missing).
    pub skipped: Vec<SkippedFile>,
    /// Traversal stopped early at `max_file_count`.
    pub limit_reached: bool,
    pub total_chars: usize,
    pub total_lines: usize,
    pub total_words: usize,
    /// Words plus structural punctuation. A rough proxy, not a tokenizer.
    pub estimated_tokens: usize,
}

impl BundleStats {
    /// Fill in the text measurements from the finished bundle.
    pub fn measure(&mut self, text: &str) {
        self.total_chars = text.chars().count();
        self.total_lines = text.lines().count();
        self.total_words = text.split_whitespace().count();
        self.estimated_tokens = estimate_tokens(text);
    }

    /// One-line summary for status bars and notifications.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} file(s), {} lines, {} chars, ~{} tokens",
            self.file_count, self.total_lines, self.total_chars, self.estimated_tokens
        );
        if self.skipped_by_size_count > 0 {
            summary.push_str(&format!(
                "; {} skipped (size limit)",
                self.skipped_by_size_count
            ));
        }
        if !self.skipped.is_empty() {
            summary.push_str(&format!("; {} unreadable", self.skipped.len()));
        }
        if self.limit_reached {
            summary.push_str("; file limit reached");
        }
        summary
    }
}

/// Word count plus the count of `;{}()[],` characters.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let punctuation = text
        .chars()
        .filter(|c| STRUCTURAL_PUNCTUATION.contains(c))
        .count();
    words + punctuation
}
