//! Error types for branchfix-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BranchId;

/// All errors that can arise while loading configuration or building a rule table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The embedded default configuration failed to parse.
    #[error("built-in config is malformed: {0}")]
    Builtin(#[source] serde_yaml::Error),

    /// An explicitly requested config file did not exist.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A rule pattern is not a valid regular expression.
    #[error("invalid pattern {pattern:?} for branch '{branch}': {source}")]
    InvalidPattern {
        branch: BranchId,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The same branch identifier was registered twice.
    #[error("branch '{branch}' is registered more than once")]
    DuplicateBranch { branch: BranchId },

    /// A branch was marked canonical but also carries rewrite rules.
    #[error("branch '{branch}' is canonical and cannot carry rewrite rules")]
    CanonicalWithRules { branch: BranchId },
}
