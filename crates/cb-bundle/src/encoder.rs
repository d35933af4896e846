// encoder.rs - Walks a selection and serializes eligible files into a bundle.
//
// Output layout (lines joined with "\n"):
//
//   <pre_text>
//   <header for file 1>
//   <content of file 1>
//   <blank separator>
//   ...
//   <post_text>
//
// Traversal is depth-first in selection order, directory entries sorted by
// name. Running counters live in an explicit `Accumulator` threaded through
// the walk; nothing is stored on the request. Oversized, binary, and
// unreadable files never abort the run.

use std::collections::HashSet;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::config::Limits;
use crate::filter::{FilterConfig, FilterEngine};
use crate::label::{labelled_path, ChangeLabel};
use crate::path::normalize_path;
use crate::source::{
    classify_bytes, BinaryClassifier, ChangeStatusLookup, DefaultClassifier, FileContent,
    FileRecord, Selection,
};
use crate::stats::{BundleStats, SkippedFile};
use crate::template::HeaderTemplate;

/// Leading text of the line emitted in place of an oversized file's content.
pub const SIZE_SKIP_MARKER: &str = "[skipped: size exceeds limit";

/// The one-line marker written for a file over the size limit.
pub fn size_skip_marker(size_bytes: u64, max_bytes: u64) -> String {
    format!(
        "{} ({} bytes > {} bytes)]",
        SIZE_SKIP_MARKER, size_bytes, max_bytes
    )
}

/// Whether a decoded body is exactly a size-skip marker.
pub fn is_size_skip_marker(content: &str) -> bool {
    let trimmed = content.trim();
    !trimmed.contains('\n') && trimmed.starts_with(SIZE_SKIP_MARKER) && trimmed.ends_with(']')
}

/// Everything one encode run needs. Borrowed from the caller's config.
pub struct EncodeRequest<'a> {
    pub project_root: &'a Path,
    pub selection: &'a [Selection],
    pub filters: &'a FilterConfig,
    pub template: &'a HeaderTemplate,
    pub pre_text: &'a str,
    pub post_text: &'a str,
    pub limits: Limits,
    /// Emit a blank line after every file block.
    pub separate_files: bool,
    /// Labels plain files and supplies content for deleted records.
    pub lookup: Option<&'a dyn ChangeStatusLookup>,
    pub classifier: &'a dyn BinaryClassifier,
}

impl<'a> EncodeRequest<'a> {
    pub fn new(
        project_root: &'a Path,
        selection: &'a [Selection],
        filters: &'a FilterConfig,
        template: &'a HeaderTemplate,
    ) -> Self {
        Self {
            project_root,
            selection,
            filters,
            template,
            pre_text: "",
            post_text: "",
            limits: Limits::default(),
            separate_files: true,
            lookup: None,
            classifier: &DefaultClassifier,
        }
    }

    pub fn with_texts(mut self, pre_text: &'a str, post_text: &'a str) -> Self {
        self.pre_text = pre_text;
        self.post_text = post_text;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_separator(mut self, separate_files: bool) -> Self {
        self.separate_files = separate_files;
        self
    }

    pub fn with_lookup(mut self, lookup: &'a dyn ChangeStatusLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_classifier(mut self, classifier: &'a dyn BinaryClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// The bundle text plus its statistics.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    pub text: String,
    pub stats: BundleStats,
}

impl EncodeOutput {
    /// Nothing eligible was found. A valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.stats.file_count == 0 && self.stats.skipped_by_size_count == 0
    }
}

#[derive(Default)]
struct Accumulator {
    seen_files: HashSet<PathBuf>,
    seen_dirs: HashSet<PathBuf>,
    lines: Vec<String>,
    stats: BundleStats,
}

struct Walker<'r, 'a> {
    request: &'r EncodeRequest<'a>,
    engine: FilterEngine,
    root: PathBuf,
}

/// Encode the request's selection into one text bundle.
pub fn encode(request: &EncodeRequest<'_>) -> EncodeOutput {
    let walker = Walker {
        request,
        engine: FilterEngine::new(request.filters),
        root: fs::canonicalize(request.project_root)
            .unwrap_or_else(|_| request.project_root.to_path_buf()),
    };
    let mut acc = Accumulator::default();

    for item in request.selection {
        if walker.visit_selection(item, &mut acc).is_break() {
            break;
        }
    }

    let mut parts: Vec<String> = Vec::with_capacity(acc.lines.len() + 2);
    if !request.pre_text.is_empty() {
        parts.push(request.pre_text.to_string());
    }
    parts.append(&mut acc.lines);
    if !request.post_text.is_empty() {
        parts.push(request.post_text.to_string());
    }

    let text = parts.join("\n");
    let mut stats = acc.stats;
    stats.measure(&text);

    tracing::info!(
        files = stats.file_count,
        skipped_by_size = stats.skipped_by_size_count,
        skipped_binary = stats.skipped_binary_count,
        limit_reached = stats.limit_reached,
        "encoded bundle"
    );

    EncodeOutput { text, stats }
}

impl Walker<'_, '_> {
    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Slash-separated path relative to the project root. Paths outside the
    /// root fall back to their normalized absolute form.
    fn logical_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).map(Path::to_path_buf).ok().or_else(|| {
            fs::canonicalize(path)
                .ok()
                .and_then(|canonical| canonical.strip_prefix(&self.root).ok().map(Path::to_path_buf))
        });
        match relative {
            Some(rel) => normalize_path(&rel.to_string_lossy()),
            None => normalize_path(&path.to_string_lossy()),
        }
    }

    fn visit_selection(&self, item: &Selection, acc: &mut Accumulator) -> ControlFlow<()> {
        let path = self.absolute(item.path());
        let label = item.label();

        if path.is_dir() {
            let rel = self.logical_path(&path);
            if !rel.is_empty() && !self.engine.is_eligible(&rel, Some(&path), true) {
                tracing::debug!("selected directory {} is filtered out", rel);
                return ControlFlow::Continue(());
            }
            self.walk_dir(&path, label, acc)
        } else if path.is_file() {
            self.visit_file(&path, label, acc)
        } else if label == Some(ChangeLabel::Deleted) {
            self.visit_deleted(&path, acc)
        } else {
            acc.stats.skipped.push(SkippedFile {
                path: self.logical_path(&path),
                reason: "not found".to_string(),
            });
            ControlFlow::Continue(())
        }
    }

    fn walk_dir(
        &self,
        dir: &Path,
        label: Option<ChangeLabel>,
        acc: &mut Accumulator,
    ) -> ControlFlow<()> {
        let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if !acc.seen_dirs.insert(key) {
            return ControlFlow::Continue(());
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                acc.stats.skipped.push(SkippedFile {
                    path: self.logical_path(dir),
                    reason: format!("cannot read directory: {}", e),
                });
                return ControlFlow::Continue(());
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            let flow = if path.is_dir() {
                let rel = self.logical_path(&path);
                if !self.engine.is_eligible(&rel, Some(&path), true) {
                    tracing::debug!("pruned directory {}", rel);
                    continue;
                }
                self.walk_dir(&path, label, acc)
            } else {
                self.visit_file(&path, label, acc)
            };
            if flow.is_break() {
                return flow;
            }
        }

        ControlFlow::Continue(())
    }

    /// Shared gate for every candidate file: de-duplication, filtering, and
    /// the file count limit. `Ok(())` means the candidate should be emitted.
    fn admit(
        &self,
        rel: &str,
        path: &Path,
        key: PathBuf,
        acc: &mut Accumulator,
    ) -> Result<(), ControlFlow<()>> {
        if !acc.seen_files.insert(key) {
            return Err(ControlFlow::Continue(()));
        }
        if !self.engine.is_eligible(rel, Some(path), false) {
            tracing::debug!("filtered out {}", rel);
            return Err(ControlFlow::Continue(()));
        }
        if self.request.classifier.is_binary_path(path) {
            tracing::debug!("skipping binary file {}", rel);
            acc.stats.skipped_binary_count += 1;
            return Err(ControlFlow::Continue(()));
        }
        if let Some(max) = self.request.limits.max_file_count {
            if acc.stats.file_count >= max {
                tracing::info!("file count limit {} reached at {}", max, rel);
                acc.stats.limit_reached = true;
                return Err(ControlFlow::Break(()));
            }
        }
        Ok(())
    }

    fn visit_file(
        &self,
        path: &Path,
        label: Option<ChangeLabel>,
        acc: &mut Accumulator,
    ) -> ControlFlow<()> {
        let rel = self.logical_path(path);
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Err(flow) = self.admit(&rel, path, key, acc) {
            return flow;
        }

        let label = label.or_else(|| self.request.lookup.and_then(|l| l.label_for(&rel)));
        let record = self.read_record(path, rel, label);
        self.emit(record, acc);
        ControlFlow::Continue(())
    }

    /// A deleted change record: nothing on disk, content comes from history.
    fn visit_deleted(&self, path: &Path, acc: &mut Accumulator) -> ControlFlow<()> {
        let rel = self.logical_path(path);
        if let Err(flow) = self.admit(&rel, path, path.to_path_buf(), acc) {
            return flow;
        }

        let historical = self
            .request
            .lookup
            .and_then(|lookup| lookup.historical_content(&rel));
        let size_bytes = historical.as_ref().map_or(0, |bytes| bytes.len() as u64);
        let content = match historical {
            _ if self.exceeds_size(size_bytes) => FileContent::TooLarge,
            Some(bytes) => classify_bytes(bytes, self.request.classifier),
            None => FileContent::Text(String::new()),
        };

        self.emit(
            FileRecord {
                logical_path: rel,
                label: Some(ChangeLabel::Deleted),
                size_bytes,
                content,
            },
            acc,
        );
        ControlFlow::Continue(())
    }

    fn exceeds_size(&self, size_bytes: u64) -> bool {
        self.request
            .limits
            .max_size()
            .is_some_and(|max| size_bytes > max)
    }

    fn read_record(
        &self,
        path: &Path,
        logical_path: String,
        label: Option<ChangeLabel>,
    ) -> FileRecord {
        let (size_bytes, content) = match fs::metadata(path) {
            Err(e) => (0, FileContent::Unavailable(e.to_string())),
            Ok(meta) if self.exceeds_size(meta.len()) => (meta.len(), FileContent::TooLarge),
            Ok(meta) => match fs::read(path) {
                Ok(bytes) => (meta.len(), classify_bytes(bytes, self.request.classifier)),
                Err(e) => (meta.len(), FileContent::Unavailable(e.to_string())),
            },
        };
        FileRecord {
            logical_path,
            label,
            size_bytes,
            content,
        }
    }

    fn emit(&self, record: FileRecord, acc: &mut Accumulator) {
        let header = self
            .request
            .template
            .render(&labelled_path(record.label, &record.logical_path));

        match record.content {
            FileContent::Text(text) => {
                acc.lines.push(header);
                let body = strip_final_newline(&text);
                if !body.is_empty() {
                    acc.lines.push(body.to_string());
                }
                acc.stats.file_count += 1;
            }
            FileContent::TooLarge => {
                let max = self.request.limits.max_size().unwrap_or_default();
                tracing::debug!(
                    "{} exceeds size limit ({} > {} bytes)",
                    record.logical_path,
                    record.size_bytes,
                    max
                );
                acc.lines.push(header);
                acc.lines.push(size_skip_marker(record.size_bytes, max));
                acc.stats.skipped_by_size_count += 1;
            }
            FileContent::Binary => {
                tracing::debug!("skipping binary content in {}", record.logical_path);
                acc.stats.skipped_binary_count += 1;
                return;
            }
            FileContent::Unavailable(reason) => {
                tracing::warn!("cannot read {}: {}", record.logical_path, reason);
                acc.stats.skipped.push(SkippedFile {
                    path: record.logical_path,
                    reason,
                });
                return;
            }
        }

        if self.request.separate_files {
            acc.lines.push(String::new());
        }
    }
}

/// Drop the final `\n` only. A preceding `\r` stays in the body so CRLF
/// files come back byte for byte once the restorer re-appends the `\n`.
fn strip_final_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterRule;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &[u8]) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn run(dir: &Path, selection: &[Selection], limits: Limits) -> EncodeOutput {
        let filters = FilterConfig::disabled();
        let template = HeaderTemplate::default();
        let request = EncodeRequest::new(dir, selection, &filters, &template).with_limits(limits);
        encode(&request)
    }

    #[test]
    fn encodes_single_file_with_header() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/main.rs", b"fn main() {}\n");

        let out = run(
            dir.path(),
            &[Selection::Path("src/main.rs".into())],
            Limits::unlimited(),
        );
        assert_eq!(out.text, "// file: src/main.rs\nfn main() {}\n");
        assert_eq!(out.stats.file_count, 1);
        assert_eq!(out.stats.total_lines, 2);
    }

    #[test]
    fn pre_and_post_text_wrap_the_blocks() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", b"alpha");
        let filters = FilterConfig::disabled();
        let template = HeaderTemplate::new("=== {path} ===");
        let selection = [Selection::Path("a.txt".into())];
        let request = EncodeRequest::new(dir.path(), &selection, &filters, &template)
            .with_texts("BEGIN", "END")
            .with_separator(false);
        let out = encode(&request);
        assert_eq!(out.text, "BEGIN\n=== a.txt ===\nalpha\nEND");
    }

    #[test]
    fn directories_are_walked_depth_first_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", b"b");
        write(dir.path(), "a/z.txt", b"z");
        write(dir.path(), "a/y/x.txt", b"x");

        let out = run(dir.path(), &[Selection::Path(".".into())], Limits::unlimited());
        let headers: Vec<&str> = out
            .text
            .lines()
            .filter(|l| l.starts_with("// file:"))
            .collect();
        assert_eq!(
            headers,
            vec!["// file: a/y/x.txt", "// file: a/z.txt", "// file: b.txt"]
        );
    }

    #[test]
    fn files_reachable_twice_are_emitted_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/lib.rs", b"pub fn f() {}");

        let out = run(
            dir.path(),
            &[
                Selection::Path("src".into()),
                Selection::Path("src/lib.rs".into()),
                Selection::Path(dir.path().join("src/lib.rs")),
            ],
            Limits::unlimited(),
        );
        assert_eq!(out.stats.file_count, 1);
        assert_eq!(out.text.matches("// file: src/lib.rs").count(), 1);
    }

    #[test]
    fn oversized_file_is_marked_not_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1.txt", b"small");
        write(dir.path(), "2.txt", &[b'x'; 100]);
        write(dir.path(), "3.txt", b"tiny");

        let out = run(
            dir.path(),
            &[Selection::Path(".".into())],
            Limits {
                max_file_count: None,
                max_file_size_bytes: Some(50),
            },
        );
        assert_eq!(out.stats.file_count, 2);
        assert_eq!(out.stats.skipped_by_size_count, 1);
        for name in ["1.txt", "2.txt", "3.txt"] {
            assert!(out.text.contains(&format!("// file: {}", name)));
        }
        assert!(out.text.contains("[skipped: size exceeds limit (100 bytes > 50 bytes)]"));
        assert!(!out.text.contains("xxxx"));
    }

    #[test]
    fn zero_size_limit_means_unlimited() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", b"hello\n");

        let out = run(
            dir.path(),
            &[Selection::Path("a.txt".into())],
            Limits {
                max_file_count: None,
                max_file_size_bytes: Some(0),
            },
        );
        assert_eq!(out.stats.file_count, 1);
        assert_eq!(out.stats.skipped_by_size_count, 0);
        assert_eq!(out.text, "// file: a.txt\nhello\n");
    }

    #[test]
    fn count_limit_stops_traversal() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("f{}.txt", i), b"content");
        }

        let out = run(
            dir.path(),
            &[Selection::Path(".".into())],
            Limits {
                max_file_count: Some(2),
                max_file_size_bytes: None,
            },
        );
        assert_eq!(out.stats.file_count, 2);
        assert!(out.stats.limit_reached);
        assert!(out.text.contains("f0.txt"));
        assert!(out.text.contains("f1.txt"));
        assert!(!out.text.contains("f2.txt"));
    }

    #[test]
    fn binary_files_are_silently_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "logo.png", b"not really a png");
        write(dir.path(), "blob.txt", &[1, 0, 2, 3]);
        write(dir.path(), "ok.txt", b"fine");

        let out = run(dir.path(), &[Selection::Path(".".into())], Limits::unlimited());
        assert_eq!(out.stats.file_count, 1);
        assert_eq!(out.stats.skipped_binary_count, 2);
        assert!(out.stats.skipped.is_empty());
        assert!(!out.text.contains("logo.png"));
        assert!(!out.text.contains("blob.txt"));
    }

    #[test]
    fn filtered_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/lib.rs", b"lib");
        write(dir.path(), "target/debug/out.rs", b"generated");
        write(dir.path(), "src/notes.md", b"notes");

        let filters = FilterConfig::with_rules(vec![
            FilterRule::exclude_path("target"),
            FilterRule::exclude_pattern("*.md"),
        ]);
        let template = HeaderTemplate::default();
        let selection = [Selection::Path(".".into())];
        let out = encode(&EncodeRequest::new(
            dir.path(),
            &selection,
            &filters,
            &template,
        ));
        assert_eq!(out.stats.file_count, 1);
        assert!(out.text.contains("src/lib.rs"));
        assert!(!out.text.contains("target"));
        assert!(!out.text.contains("notes.md"));
    }

    #[test]
    fn default_filters_prune_nested_dependency_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/src/app.js", b"app");
        write(dir.path(), "web/node_modules/left-pad/index.js", b"pad");
        write(dir.path(), "crates/x/target/debug/build.rs", b"generated");
        write(dir.path(), "crates/x/src/lib.rs", b"lib");

        let filters = FilterConfig::default();
        let template = HeaderTemplate::default();
        let selection = [Selection::Path(".".into())];
        let out = encode(&EncodeRequest::new(
            dir.path(),
            &selection,
            &filters,
            &template,
        ));
        assert_eq!(out.stats.file_count, 2);
        assert!(out.text.contains("// file: web/src/app.js"));
        assert!(out.text.contains("// file: crates/x/src/lib.rs"));
        assert!(!out.text.contains("node_modules"));
        assert!(!out.text.contains("target"));
    }

    #[test]
    fn change_records_carry_labels() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "new.rs", b"fresh");
        write(dir.path(), "old.rs", b"changed");

        let out = run(
            dir.path(),
            &[
                Selection::Untracked("new.rs".into()),
                Selection::Change {
                    path: "old.rs".into(),
                    label: ChangeLabel::Modified,
                },
            ],
            Limits::unlimited(),
        );
        assert!(out.text.contains("// file: [NEW] new.rs\nfresh"));
        assert!(out.text.contains("// file: [MODIFIED] old.rs\nchanged"));
    }

    #[test]
    fn lookup_labels_plain_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", b"a");
        write(dir.path(), "b.rs", b"b");
        let mut lookup = HashMap::new();
        lookup.insert("b.rs".to_string(), ChangeLabel::Modified);

        let filters = FilterConfig::disabled();
        let template = HeaderTemplate::default();
        let selection = [Selection::Path(".".into())];
        let request =
            EncodeRequest::new(dir.path(), &selection, &filters, &template).with_lookup(&lookup);
        let out = encode(&request);
        assert!(out.text.contains("// file: a.rs\n"));
        assert!(out.text.contains("// file: [MODIFIED] b.rs\n"));
    }

    struct History;

    impl ChangeStatusLookup for History {
        fn label_for(&self, _relative_path: &str) -> Option<ChangeLabel> {
            None
        }

        fn historical_content(&self, relative_path: &str) -> Option<Vec<u8>> {
            (relative_path == "gone.rs").then(|| b"fn old() {}\n".to_vec())
        }
    }

    #[test]
    fn deleted_records_use_historical_content() {
        let dir = TempDir::new().unwrap();
        let filters = FilterConfig::disabled();
        let template = HeaderTemplate::default();
        let selection = [
            Selection::Change {
                path: "gone.rs".into(),
                label: ChangeLabel::Deleted,
            },
            Selection::Change {
                path: "never.rs".into(),
                label: ChangeLabel::Deleted,
            },
        ];
        let request =
            EncodeRequest::new(dir.path(), &selection, &filters, &template).with_lookup(&History);
        let out = encode(&request);
        assert_eq!(out.stats.file_count, 2);
        assert!(out.text.contains("// file: [DELETED] gone.rs\nfn old() {}"));
        assert!(out.text.contains("// file: [DELETED] never.rs\n"));
    }

    #[test]
    fn missing_plain_selection_is_reported() {
        let dir = TempDir::new().unwrap();
        let out = run(
            dir.path(),
            &[Selection::Path("nope.txt".into())],
            Limits::unlimited(),
        );
        assert!(out.is_empty());
        assert_eq!(out.stats.skipped.len(), 1);
        assert_eq!(out.stats.skipped[0].reason, "not found");
    }

    #[test]
    fn marker_detection() {
        assert!(is_size_skip_marker(&size_skip_marker(10, 5)));
        assert!(is_size_skip_marker("  [skipped: size exceeds limit (1 bytes > 0 bytes)]\n"));
        assert!(!is_size_skip_marker("[skipped: size exceeds limit]\nmore"));
        assert!(!is_size_skip_marker("regular content"));
    }
}
