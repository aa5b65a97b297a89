//! Existence-only checks over the dependency list.
//!
//! No content or schema is inspected. Relative paths are resolved against
//! `root`; absolute paths are used as-is.

use std::path::{Path, PathBuf};

use crate::types::AggregatePolicy;

/// Existence result for one dependent path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCheck {
    /// Path as listed in the configuration.
    pub path: PathBuf,
    pub exists: bool,
}

/// Per-path results plus the aggregate verdict under `policy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub policy: AggregatePolicy,
    pub checks: Vec<PathCheck>,
    pub passed: bool,
}

impl ConsistencyReport {
    pub fn present_count(&self) -> usize {
        self.checks.iter().filter(|c| c.exists).count()
    }

    pub fn missing(&self) -> Vec<PathBuf> {
        self.checks
            .iter()
            .filter(|c| !c.exists)
            .map(|c| c.path.clone())
            .collect()
    }
}

/// Check every path in order and fold the results with `policy`.
///
/// An empty list passes under [`AggregatePolicy::All`] and fails under
/// [`AggregatePolicy::Any`].
pub fn check_all(root: &Path, paths: &[PathBuf], policy: AggregatePolicy) -> ConsistencyReport {
    let checks: Vec<PathCheck> = paths
        .iter()
        .map(|path| {
            let exists = root.join(path).exists();
            if !exists {
                tracing::debug!(path = %path.display(), "dependency missing");
            }
            PathCheck {
                path: path.clone(),
                exists,
            }
        })
        .collect();

    let passed = match policy {
        AggregatePolicy::All => checks.iter().all(|c| c.exists),
        AggregatePolicy::Any => checks.iter().any(|c| c.exists),
    };

    ConsistencyReport {
        policy,
        checks,
        passed,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
