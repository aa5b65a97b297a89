//! YAML configuration: target file, dependency list, policy, branch table.
//!
//! # Lookup order
//!
//! ```text
//! --config <file>          (must exist)
//! <root>/branchfix.yaml    (if present)
//! built-in default         (embedded at compile time)
//! ```
//!
//! # API pattern
//!
//! Functions take the project root explicitly (`resolve_at(root, …)`) so tests
//! can point them at a `TempDir`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::RuleTable;
use crate::types::{AggregatePolicy, BranchId};

/// File name looked up at the project root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "branchfix.yaml";

const BUILTIN_CONFIG: &str = include_str!("default.yaml");

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One `pattern` → `replacement` entry as written in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub replacement: String,
}

/// One branch entry in the `branches:` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    pub branch: BranchId,
    /// Already canonical: nothing to rewrite.
    #[serde(default)]
    pub canonical: bool,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    /// Representative inputs for the idempotence probe.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

/// Root of a branchfix configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// File rewritten by the rule set, relative to the project root.
    pub target: PathBuf,
    /// Paths whose existence is checked after the rewrite.
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
    #[serde(default)]
    pub policy: AggregatePolicy,
    #[serde(default)]
    pub branches: Vec<BranchSpec>,
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Builtin => write!(f, "built-in"),
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

impl Config {
    /// The embedded default table.
    pub fn builtin() -> Result<Self, ConfigError> {
        serde_yaml::from_str(BUILTIN_CONFIG).map_err(ConfigError::Builtin)
    }

    /// Parse configuration from a YAML string (no path context).
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    /// Load a config file.
    ///
    /// Returns `ConfigError::ConfigNotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve the active configuration for a project rooted at `root`.
    ///
    /// A relative `explicit` path is taken relative to `root`.
    pub fn resolve_at(
        root: &Path,
        explicit: Option<&Path>,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = explicit {
            let path = root.join(path);
            let config = Self::load_at(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        let local = root.join(DEFAULT_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_at(&local)?;
            return Ok((config, ConfigSource::File(local)));
        }

        Ok((Self::builtin()?, ConfigSource::Builtin))
    }

    /// Compile the `branches:` list into a lookup table.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        RuleTable::from_specs(&self.branches)
    }

    /// Target path resolved against `root`.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        root.join(&self.target)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
