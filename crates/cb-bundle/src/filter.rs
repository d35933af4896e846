// filter.rs - Include/exclude rules deciding which files enter a bundle.
//
// Rules come from configuration as plain data (`FilterConfig`) and are
// compiled once into a `FilterEngine` per encode run. Excludes always win
// over includes. Directories are checked against PATH and NAME rules only,
// and a rejected directory prunes its whole subtree during traversal.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::path::{is_absolute_like, normalize_path};

/// What a rule's value is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Exact-or-prefix match on the relative path (or absolute path prefix
    /// when the value itself is absolute).
    Path,
    /// Glob-or-regex match on the file name only.
    Pattern,
    /// Exact match on any single segment of the relative path, so `target`
    /// also catches `crates/x/target` and everything below it.
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Include,
    Exclude,
}

/// A single user-configured filter rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub kind: RuleKind,
    pub action: RuleAction,
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FilterRule {
    pub fn new(kind: RuleKind, action: RuleAction, value: impl Into<String>) -> Self {
        Self {
            kind,
            action,
            value: value.into(),
            enabled: true,
        }
    }

    pub fn exclude_path(value: impl Into<String>) -> Self {
        Self::new(RuleKind::Path, RuleAction::Exclude, value)
    }

    pub fn exclude_pattern(value: impl Into<String>) -> Self {
        Self::new(RuleKind::Pattern, RuleAction::Exclude, value)
    }

    pub fn include_path(value: impl Into<String>) -> Self {
        Self::new(RuleKind::Path, RuleAction::Include, value)
    }

    pub fn include_pattern(value: impl Into<String>) -> Self {
        Self::new(RuleKind::Pattern, RuleAction::Include, value)
    }

    pub fn exclude_name(value: impl Into<String>) -> Self {
        Self::new(RuleKind::Name, RuleAction::Exclude, value)
    }
}

/// Filter settings supplied by the settings store on every call.
///
/// `use_filters` is the master switch: when it is off every file is eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_true")]
    pub use_filters: bool,
    #[serde(default = "default_true")]
    pub use_include_filters: bool,
    #[serde(default = "default_true")]
    pub use_exclude_filters: bool,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

/// Directory names that are almost never wanted in a pasted bundle, at any depth.
const DEFAULT_EXCLUDE_NAMES: &[&str] = &[".git", "node_modules", "target", "dist", "build"];

const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".DS_Store", "*.pyc"];

impl Default for FilterConfig {
    fn default() -> Self {
        let rules = DEFAULT_EXCLUDE_NAMES
            .iter()
            .map(|value| FilterRule::exclude_name(*value))
            .chain(
                DEFAULT_EXCLUDE_PATTERNS
                    .iter()
                    .map(|value| FilterRule::exclude_pattern(*value)),
            )
            .collect();
        Self {
            use_filters: true,
            use_include_filters: true,
            use_exclude_filters: true,
            rules,
        }
    }
}

impl FilterConfig {
    /// A config with the master switch off: everything is eligible.
    pub fn disabled() -> Self {
        Self {
            use_filters: false,
            use_include_filters: false,
            use_exclude_filters: false,
            rules: Vec::new(),
        }
    }

    /// A config with all switches on and exactly the given rules.
    pub fn with_rules(rules: Vec<FilterRule>) -> Self {
        Self {
            use_filters: true,
            use_include_filters: true,
            use_exclude_filters: true,
            rules,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
enum PathMatcher {
    Relative(String),
    Absolute(PathBuf),
}

impl PathMatcher {
    fn compile(value: &str) -> Option<Self> {
        if is_absolute_like(value) {
            return Some(Self::Absolute(PathBuf::from(value)));
        }
        let normalized = normalize_path(value);
        if normalized.is_empty() {
            tracing::warn!("ignoring path rule '{}': no usable segments", value);
            return None;
        }
        Some(Self::Relative(normalized))
    }

    /// Exact or prefix match against the candidate itself.
    fn matches(&self, relative: &str, absolute: Option<&Path>) -> bool {
        match self {
            Self::Relative(rule) => is_same_or_under(relative, rule),
            Self::Absolute(rule) => absolute.is_some_and(|abs| abs.starts_with(rule)),
        }
    }

    /// Whether a directory can contain something this rule matches: the
    /// directory is the rule target, lies under it, or is one of its ancestors.
    fn covers_dir(&self, relative: &str, absolute: Option<&Path>) -> bool {
        match self {
            Self::Relative(rule) => {
                relative.is_empty()
                    || is_same_or_under(relative, rule)
                    || is_same_or_under(rule, relative)
            }
            Self::Absolute(rule) => absolute
                .is_some_and(|abs| abs.starts_with(rule) || rule.starts_with(abs)),
        }
    }
}

/// A NAME rule value, reduced to one segment. Values with a separator or no
/// usable segment are rejected.
fn compile_name(value: &str) -> Option<String> {
    let normalized = normalize_path(value);
    if normalized.is_empty() || normalized.contains('/') {
        tracing::warn!("ignoring name rule '{}': expected a single path segment", value);
        return None;
    }
    Some(normalized)
}

fn has_segment(relative: &str, name: &str) -> bool {
    relative.split('/').any(|segment| segment == name)
}

fn is_same_or_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Clone)]
enum PatternMatcher {
    Regex(Regex),
    /// Fallback for values that fail to compile.
    Contains(String),
}

impl PatternMatcher {
    fn compile(value: &str) -> Self {
        let source = if value.contains(['*', '?']) {
            glob_to_regex(value)
        } else {
            value.to_string()
        };
        match Regex::new(&format!("^(?:{})$", source)) {
            Ok(regex) => Self::Regex(regex),
            Err(e) => {
                tracing::warn!(
                    "pattern rule '{}' is not a valid pattern ({}); using substring match",
                    value,
                    e
                );
                Self::Contains(value.to_string())
            }
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(file_name),
            Self::Contains(needle) => file_name.contains(needle.as_str()),
        }
    }
}

/// `*` becomes `.*`, `?` becomes `.`, a literal `.` is escaped. Everything
/// else passes through, so regex alternations like `*.(rs|toml)` still work.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' => out.push_str("\\."),
            other => out.push(other),
        }
    }
    out
}

/// A compiled rule set. Cheap to query; build once per run.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    enabled: bool,
    use_include: bool,
    use_exclude: bool,
    exclude_paths: Vec<PathMatcher>,
    exclude_patterns: Vec<PatternMatcher>,
    exclude_names: Vec<String>,
    include_paths: Vec<PathMatcher>,
    include_patterns: Vec<PatternMatcher>,
    include_names: Vec<String>,
}

impl FilterEngine {
    /// Compile the enabled rules of `config`. Malformed patterns degrade to
    /// substring matches; nothing here fails.
    pub fn new(config: &FilterConfig) -> Self {
        let mut engine = Self {
            enabled: config.use_filters,
            use_include: config.use_include_filters,
            use_exclude: config.use_exclude_filters,
            exclude_paths: Vec::new(),
            exclude_patterns: Vec::new(),
            exclude_names: Vec::new(),
            include_paths: Vec::new(),
            include_patterns: Vec::new(),
            include_names: Vec::new(),
        };

        for rule in config.rules.iter().filter(|r| r.enabled) {
            match (rule.action, rule.kind) {
                (RuleAction::Exclude, RuleKind::Path) => {
                    engine.exclude_paths.extend(PathMatcher::compile(&rule.value))
                }
                (RuleAction::Exclude, RuleKind::Pattern) => engine
                    .exclude_patterns
                    .push(PatternMatcher::compile(&rule.value)),
                (RuleAction::Include, RuleKind::Path) => {
                    engine.include_paths.extend(PathMatcher::compile(&rule.value))
                }
                (RuleAction::Include, RuleKind::Pattern) => engine
                    .include_patterns
                    .push(PatternMatcher::compile(&rule.value)),
                (RuleAction::Exclude, RuleKind::Name) => {
                    engine.exclude_names.extend(compile_name(&rule.value))
                }
                (RuleAction::Include, RuleKind::Name) => {
                    engine.include_names.extend(compile_name(&rule.value))
                }
            }
        }

        engine
    }

    /// Decide whether a file or directory is eligible.
    ///
    /// `relative` is the slash-separated project-relative path (empty for the
    /// project root itself); `absolute` is the on-disk location when known and
    /// is only consulted by absolute PATH rules.
    pub fn is_eligible(&self, relative: &str, absolute: Option<&Path>, is_directory: bool) -> bool {
        if !self.enabled {
            return true;
        }

        let file_name = relative.rsplit('/').next().unwrap_or(relative);

        if self.use_exclude {
            if self
                .exclude_paths
                .iter()
                .any(|rule| rule.matches(relative, absolute))
            {
                return false;
            }
            if self
                .exclude_names
                .iter()
                .any(|name| has_segment(relative, name))
            {
                return false;
            }
            if !is_directory && self.exclude_patterns.iter().any(|p| p.matches(file_name)) {
                return false;
            }
        }

        if self.use_include {
            if is_directory {
                // Pattern and name includes may match anything below, so only
                // PATH includes can prune a directory.
                if self.include_patterns.is_empty()
                    && self.include_names.is_empty()
                    && !self.include_paths.is_empty()
                    && !self
                        .include_paths
                        .iter()
                        .any(|rule| rule.covers_dir(relative, absolute))
                {
                    return false;
                }
            } else if !self.include_paths.is_empty()
                || !self.include_patterns.is_empty()
                || !self.include_names.is_empty()
            {
                let included = self
                    .include_paths
                    .iter()
                    .any(|rule| rule.matches(relative, absolute))
                    || self.include_patterns.iter().any(|p| p.matches(file_name))
                    || self.include_names.iter().any(|n| has_segment(relative, n));
                if !included {
                    return false;
                }
            }
        }

        true
    }
}

/// One-shot eligibility check. Prefer [`FilterEngine`] when checking many paths.
pub fn is_eligible(
    config: &FilterConfig,
    relative: &str,
    absolute: Option<&Path>,
    is_directory: bool,
) -> bool {
    FilterEngine::new(config).is_eligible(relative, absolute, is_directory)
}
