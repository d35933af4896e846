// round_trip.rs - End-to-end tests for the encode → decode → restore pipeline.
//
// Flow:
//   1. Build a small project in a temp dir
//   2. Encode a selection of it into a bundle
//   3. Decode the bundle
//   4. Restore into a second temp dir and compare file by file

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use cb_bundle::restore::{self, ConflictPolicy};
use cb_bundle::{
    decode, encode, normalize_path, ChangeLabel, EncodeRequest, FilterConfig, FilterEngine,
    FilterRule, HeaderTemplate, Limits, Selection,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Every regular file under `root`, keyed by slash-separated relative path.
fn snapshot(root: &Path) -> BTreeMap<String, String> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                out.insert(rel, fs::read_to_string(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn sample_project() -> TempDir {
    let project = TempDir::new().unwrap();
    write(project.path(), "README.md", "# Sample\n\nA small project.\n");
    write(
        project.path(),
        "src/main.rs",
        "fn main() {\n\n    println!(\"hi\");\n}\n",
    );
    write(project.path(), "src/empty.rs", "");
    write(project.path(), "src/nested/deep/config.json", "{\"a\": 1}\n");
    write(project.path(), "app/[id]/page.tsx", "export default function Page() {}\n");
    project
}

#[test]
fn encode_decode_restore_reproduces_the_project() {
    let source = sample_project();
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection = [Selection::Path(source.path().to_path_buf())];

    let output = encode(&EncodeRequest::new(source.path(), &selection, &filters, &template));
    assert_eq!(output.stats.file_count, 5);
    assert!(!output.stats.limit_reached);

    let entries = decode(&output.text, &template);
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|e| !e.is_deleted && !e.is_placeholder));

    let target = TempDir::new().unwrap();
    let plan = restore::plan(&entries, target.path());
    assert!(plan.conflicts().is_empty());
    let result = restore::execute(&plan, &ConflictPolicy::Abort);
    assert_eq!(result.created_count, 5);
    assert!(result.failures.is_empty(), "{:?}", result.failures);

    assert_eq!(snapshot(target.path()), snapshot(source.path()));
}

#[test]
fn round_trip_survives_a_custom_template() {
    let source = sample_project();
    let filters = FilterConfig::disabled();
    let template = HeaderTemplate::new("### FILE {path} ###");
    let selection = [Selection::Path(source.path().join("src"))];

    let output = encode(&EncodeRequest::new(source.path(), &selection, &filters, &template));
    assert!(output.text.starts_with("### FILE src/"));

    let decoded: BTreeMap<String, String> = decode(&output.text, &template)
        .into_iter()
        .map(|e| (e.path, e.content))
        .collect();
    assert_eq!(decoded["src/main.rs"], "fn main() {\n\n    println!(\"hi\");\n}");
    assert_eq!(decoded["src/empty.rs"], "");
    assert_eq!(decoded["src/nested/deep/config.json"], "{\"a\": 1}");
}

#[test]
fn crlf_files_round_trip_byte_for_byte() {
    let source = TempDir::new().unwrap();
    write(source.path(), "win.txt", "a\r\nb\r\n");
    write(source.path(), "mixed.txt", "unix\nwindows\r\nlast");
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection = [Selection::Path(source.path().to_path_buf())];

    let output = encode(&EncodeRequest::new(source.path(), &selection, &filters, &template));
    let entries = decode(&output.text, &template);
    assert_eq!(entries.len(), 2);

    let target = TempDir::new().unwrap();
    let result = restore::execute(&restore::plan(&entries, target.path()), &ConflictPolicy::Abort);
    assert_eq!(result.created_count, 2);
    assert_eq!(
        fs::read(target.path().join("win.txt")).unwrap(),
        b"a\r\nb\r\n".to_vec()
    );
    assert_eq!(
        fs::read_to_string(target.path().join("mixed.txt")).unwrap(),
        "unix\nwindows\r\nlast\n"
    );
}

#[test]
fn zero_byte_file_survives_as_an_empty_entry() {
    let source = TempDir::new().unwrap();
    write(source.path(), "empty.txt", "");
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection = [Selection::Path(source.path().join("empty.txt"))];

    let output = encode(&EncodeRequest::new(source.path(), &selection, &filters, &template));
    let entries = decode(&output.text, &template);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "empty.txt");
    assert_eq!(entries[0].content, "");
}

#[test]
fn oversized_file_is_skipped_not_fatal() {
    let source = TempDir::new().unwrap();
    write(source.path(), "one.txt", "small\n");
    write(source.path(), "two.txt", &"x".repeat(500));
    write(source.path(), "three.txt", "also small\n");
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection: Vec<Selection> = ["one.txt", "two.txt", "three.txt"]
        .iter()
        .map(|name| Selection::Path(source.path().join(name)))
        .collect();
    let limits = Limits {
        max_file_count: None,
        max_file_size_bytes: Some(100),
    };

    let output = encode(
        &EncodeRequest::new(source.path(), &selection, &filters, &template).with_limits(limits),
    );
    assert_eq!(output.stats.file_count, 2);
    assert_eq!(output.stats.skipped_by_size_count, 1);
    for name in ["one.txt", "two.txt", "three.txt"] {
        assert!(output.text.contains(&format!("// file: {}", name)));
    }

    // The placeholder never clobbers the real file on restore.
    let entries = decode(&output.text, &template);
    assert!(entries[1].is_placeholder);
    let plan = restore::plan(&entries, source.path());
    let result = restore::execute(&plan, &ConflictPolicy::OverwriteAll);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(
        fs::read_to_string(source.path().join("two.txt")).unwrap(),
        "x".repeat(500)
    );
}

#[test]
fn count_limit_stops_early() {
    let source = TempDir::new().unwrap();
    for i in 1..=5 {
        write(source.path(), &format!("f{}.txt", i), "content\n");
    }
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection = [Selection::Path(source.path().to_path_buf())];
    let limits = Limits {
        max_file_count: Some(2),
        ..Limits::default()
    };

    let output = encode(
        &EncodeRequest::new(source.path(), &selection, &filters, &template).with_limits(limits),
    );
    assert_eq!(output.stats.file_count, 2);
    assert!(output.stats.limit_reached);
    assert_eq!(decode(&output.text, &template).len(), 2);
}

#[test]
fn exclude_wins_over_include() {
    let config = FilterConfig::with_rules(vec![
        FilterRule::include_path("src"),
        FilterRule::exclude_pattern("*.log"),
    ]);
    let engine = FilterEngine::new(&config);
    assert!(engine.is_eligible("src/lib.rs", None, false));
    assert!(!engine.is_eligible("src/debug.log", None, false));
    assert!(!engine.is_eligible("docs/guide.md", None, false));
}

#[test]
fn normalization_is_idempotent_and_contained() {
    let inputs = [
        "../../etc/passwd",
        "C:\\Users\\dev\\repo\\main.rs",
        "/abs/./path//x.txt",
        "a/<bad>/b.txt",
        "app/[slug]/page.tsx",
        "",
        "..",
    ];
    for input in inputs {
        let once = normalize_path(input);
        assert_eq!(normalize_path(&once), once, "input {:?}", input);
        assert!(!once.starts_with('/'));
        assert!(!once.split('/').any(|segment| segment == ".."));
    }
    assert_eq!(normalize_path("../../etc/passwd"), "etc/passwd");
}

#[test]
fn labelled_bundle_drives_creates_and_deletes() {
    let project = TempDir::new().unwrap();
    write(project.path(), "src/old.rs", "fn old() {}\n");
    write(project.path(), "src/keep.rs", "fn keep() {}\n");

    let bundle = "\
Please apply:
// file: [NEW] src/new.rs
fn new() {}

// file: [MODIFIED] [DELETED] src/old.rs
fn old() {}

// file: [MODIFIED] src/keep.rs
fn keep() { changed() }
";
    let entries = decode(bundle, &HeaderTemplate::default());
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].label, Some(ChangeLabel::New));
    assert!(entries[1].is_deleted);
    assert_eq!(entries[1].path, "src/old.rs");

    let plan = restore::plan(&entries, project.path());
    assert_eq!(plan.conflicts(), vec!["src/keep.rs"]);

    let approved: BTreeSet<String> = ["src/keep.rs".to_string()].into_iter().collect();
    let result = restore::execute(&plan, &ConflictPolicy::PerFile(approved));
    assert_eq!(result.created_count, 1);
    assert_eq!(result.overwritten_count, 1);
    assert_eq!(result.deleted_count, 1);
    assert!(!project.path().join("src/old.rs").exists());
    assert_eq!(
        fs::read_to_string(project.path().join("src/keep.rs")).unwrap(),
        "fn keep() { changed() }\n"
    );
}

#[test]
fn skip_existing_never_writes_conflicts() {
    let project = TempDir::new().unwrap();
    write(project.path(), "a.txt", "original a\n");
    write(project.path(), "b.txt", "original b\n");

    let entries = decode(
        "// file: a.txt\nnew a\n// file: b.txt\nnew b\n",
        &HeaderTemplate::default(),
    );
    let plan = restore::plan(&entries, project.path());
    let result = restore::execute(&plan, &ConflictPolicy::SkipExisting);
    assert_eq!(result.skipped_count, 2);
    assert_eq!(result.created_count, 0);
    assert_eq!(fs::read_to_string(project.path().join("a.txt")).unwrap(), "original a\n");
    assert_eq!(fs::read_to_string(project.path().join("b.txt")).unwrap(), "original b\n");
}

#[test]
fn stats_and_results_serialize_for_json_output() {
    let source = sample_project();
    let filters = FilterConfig::default();
    let template = HeaderTemplate::default();
    let selection = [Selection::Path(source.path().join("README.md"))];
    let output = encode(&EncodeRequest::new(source.path(), &selection, &filters, &template));

    let stats = serde_json::to_value(&output.stats).unwrap();
    assert_eq!(stats["file_count"], 1);
    assert_eq!(stats["limit_reached"], false);

    let plan = restore::plan(&decode(&output.text, &template), source.path());
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["writes"][0]["path"], "README.md");
    assert_eq!(json["writes"][0]["exists"], true);
}
