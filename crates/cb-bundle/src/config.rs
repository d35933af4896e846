// config.rs - Bundle configuration loaded from `.clipbundle.toml`.
//
// Lookup order: `<project>/.clipbundle.toml`, then the user config dir
// (`<config_dir>/clipbundle/config.toml`), then built-in defaults. Every
// field has a serde default so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BundleError;
use crate::filter::FilterConfig;
use crate::template::{HeaderTemplate, DEFAULT_HEADER_TEMPLATE};

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = ".clipbundle.toml";

/// Default per-file size cap (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024;

/// Count and size caps applied while encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Stop the whole traversal once this many files have been included.
    #[serde(default)]
    pub max_file_count: Option<usize>,
    /// Files larger than this are emitted as a header plus skip marker.
    /// `0` means no limit, same as leaving it unset.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_count: None,
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

impl Limits {
    pub fn unlimited() -> Self {
        Self {
            max_file_count: None,
            max_file_size_bytes: None,
        }
    }

    /// The effective size cap, with `0` read as unlimited.
    pub fn max_size(&self) -> Option<u64> {
        self.max_file_size_bytes.filter(|max| *max > 0)
    }
}

fn default_max_file_size() -> Option<u64> {
    Some(DEFAULT_MAX_FILE_SIZE_BYTES)
}

/// Top-level configuration consumed by the encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Header line with a single `{path}` placeholder.
    #[serde(default = "default_header_template")]
    pub header_template: String,

    /// Text placed before the first file block.
    #[serde(default)]
    pub pre_text: String,

    /// Text placed after the last file block.
    #[serde(default)]
    pub post_text: String,

    /// Emit a blank line after each file block.
    #[serde(default = "default_separate_files")]
    pub separate_files: bool,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub filters: FilterConfig,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            header_template: default_header_template(),
            pre_text: String::new(),
            post_text: String::new(),
            separate_files: default_separate_files(),
            limits: Limits::default(),
            filters: FilterConfig::default(),
        }
    }
}

fn default_header_template() -> String {
    DEFAULT_HEADER_TEMPLATE.to_string()
}

fn default_separate_files() -> bool {
    true
}

impl BundleConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let content = fs::read_to_string(path).map_err(|source| BundleError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| BundleError::ConfigError {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Render as TOML (for `config show` / `config init`).
    pub fn to_toml(&self) -> Result<String, BundleError> {
        toml::to_string_pretty(self).map_err(|e| BundleError::ConfigError {
            path: PathBuf::from(PROJECT_CONFIG_FILE),
            message: e.to_string(),
        })
    }

    /// The first existing config file for `project_root`, if any.
    pub fn discover(project_root: &Path) -> Option<PathBuf> {
        let project = project_root.join(PROJECT_CONFIG_FILE);
        if project.is_file() {
            return Some(project);
        }
        let user = user_config_path()?;
        user.is_file().then_some(user)
    }

    /// Load the discovered config, falling back to defaults when there is
    /// none. A file that exists but fails to parse is reported as an error.
    pub fn load_for_project(project_root: &Path) -> Result<(Self, Option<PathBuf>), BundleError> {
        match Self::discover(project_root) {
            Some(path) => {
                let config = Self::load(&path)?;
                tracing::debug!("loaded bundle config from {}", path.display());
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Try to load config, returning defaults on any failure.
    pub fn load_or_default(project_root: &Path) -> Self {
        Self::load_for_project(project_root)
            .map(|(config, _)| config)
            .unwrap_or_else(|e| {
                tracing::warn!("{}; using default configuration", e);
                Self::default()
            })
    }

    /// Compile the header template once for this configuration.
    pub fn template(&self) -> HeaderTemplate {
        HeaderTemplate::new(&self.header_template)
    }
}

/// `<config_dir>/clipbundle/config.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("clipbundle").join("config.toml"))
}
