// template.rs - Header line templates and header recognition.
//
// A header template is a line with exactly one `{path}` placeholder, e.g.
// `// file: {path}`. It is compiled once into a matcher and reused for every
// line of a bundle. When the exact template fails to match (the bundle was
// hand-edited, or produced under a different template) the generic
// `file: <path>` recognizer takes over.

use std::sync::OnceLock;

use regex::Regex;

/// Placeholder token substituted with the (optionally labelled) path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Template used when none is configured or the configured one is unusable.
pub const DEFAULT_HEADER_TEMPLATE: &str = "// file: {path}";

/// Optional `//`, `#` or `/*` prefix, literal `file:`, the path, optional `*/`.
fn generic_header() -> &'static Regex {
    static GENERIC: OnceLock<Regex> = OnceLock::new();
    GENERIC.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?://|#|/\*)?\s*file:\s*(.+?)\s*(?:\*/)?\s*$")
            .expect("generic header regex is valid")
    })
}

/// A compiled header template.
#[derive(Debug, Clone)]
pub struct HeaderTemplate {
    template: String,
    exact: Regex,
}

impl HeaderTemplate {
    /// Compile `template`. A template without a `{path}` placeholder, or
    /// with nothing but whitespace around it, cannot tell headers from body
    /// lines, so it is replaced by [`DEFAULT_HEADER_TEMPLATE`].
    pub fn new(template: &str) -> Self {
        let template = if is_usable(template) {
            template
        } else {
            tracing::warn!(
                "header template {:?} needs literal text around one {} placeholder; using {:?}",
                template,
                PATH_PLACEHOLDER,
                DEFAULT_HEADER_TEMPLATE
            );
            DEFAULT_HEADER_TEMPLATE
        };
        let exact = compile_exact(template);
        Self {
            template: template.to_string(),
            exact,
        }
    }

    /// The effective template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Render a header line for `header_path` (already labelled if needed).
    pub fn render(&self, header_path: &str) -> String {
        self.template.replacen(PATH_PLACEHOLDER, header_path, 1)
    }

    /// Match `line` against this template only.
    pub fn match_exact<'a>(&self, line: &'a str) -> Option<&'a str> {
        captured_path(&self.exact, line)
    }

    /// Match `line` against this template, then the generic recognizer.
    pub fn match_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.match_exact(line)
            .or_else(|| captured_path(generic_header(), line))
    }
}

impl Default for HeaderTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_TEMPLATE)
    }
}

fn is_usable(template: &str) -> bool {
    template
        .split_once(PATH_PLACEHOLDER)
        .is_some_and(|(prefix, suffix)| !prefix.trim().is_empty() || !suffix.trim().is_empty())
}

fn captured_path<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    let path = regex.captures(line)?.get(1)?.as_str().trim();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Escape the literal parts of the template. Whitespace runs become `\s*` so
/// clipboard reflow (collapsed or widened spaces) does not break matching.
fn compile_exact(template: &str) -> Regex {
    let (prefix, suffix) = template
        .split_once(PATH_PLACEHOLDER)
        .unwrap_or((template, ""));
    let pattern = format!(
        r"^\s*{}(.+?){}\s*$",
        escape_flexible(prefix.trim()),
        escape_flexible(suffix.trim())
    );
    // Every literal is escaped, so the only way this fails is the size limit.
    Regex::new(&pattern).unwrap_or_else(|_| generic_header().clone())
}

fn escape_flexible(literal: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for c in literal.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push_str(r"\s*");
                in_space = true;
            }
        } else {
            in_space = false;
            out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4])));
        }
    }
    out
}
