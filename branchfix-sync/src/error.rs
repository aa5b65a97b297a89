//! Error types for branchfix-sync.

use std::path::PathBuf;

use thiserror::Error;

use branchfix_core::{AggregatePolicy, BranchId};

use crate::pipeline::Stage;

/// Exit code for a branch with no registered rule set.
pub const EXIT_UNKNOWN_RULESET: i32 = 3;
/// Exit code for a rewrite that could not be carried out.
pub const EXIT_REWRITE_FAILED: i32 = 4;
/// Exit code for a failed dependency check.
pub const EXIT_INCONSISTENT: i32 = 5;

/// Failures of a single fix pass. None of them is retried.
#[derive(Debug, Error)]
pub enum FixError {
    /// The branch has no entry in the rule table.
    #[error("no rewrite rules registered for branch '{branch}'")]
    UnknownRuleset { branch: BranchId },

    /// The file to rewrite does not exist.
    #[error("target file not found at {path}")]
    TargetNotFound { path: PathBuf },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dependency check failed under the active policy.
    #[error("dependency check failed (policy '{policy}'): {} of {total} missing", .missing.len())]
    InconsistentDependencies {
        policy: AggregatePolicy,
        missing: Vec<PathBuf>,
        total: usize,
    },
}

impl FixError {
    /// Pipeline stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            FixError::UnknownRuleset { .. } => Stage::LookupRules,
            FixError::TargetNotFound { .. } | FixError::Io { .. } => Stage::Rewrite,
            FixError::InconsistentDependencies { .. } => Stage::CheckConsistency,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Stage::LookupRules => EXIT_UNKNOWN_RULESET,
            Stage::CheckConsistency => EXIT_INCONSISTENT,
            Stage::Rewrite => EXIT_REWRITE_FAILED,
        }
    }
}

/// Convenience constructor for [`FixError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> FixError {
    FixError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_stages() {
        let unknown = FixError::UnknownRuleset {
            branch: BranchId::from("x"),
        };
        let missing = FixError::TargetNotFound {
            path: PathBuf::from("a.cs"),
        };
        let inconsistent = FixError::InconsistentDependencies {
            policy: AggregatePolicy::All,
            missing: vec![PathBuf::from("b.cs")],
            total: 3,
        };
        assert_eq!(unknown.exit_code(), EXIT_UNKNOWN_RULESET);
        assert_eq!(missing.exit_code(), EXIT_REWRITE_FAILED);
        assert_eq!(inconsistent.exit_code(), EXIT_INCONSISTENT);
    }

    #[test]
    fn inconsistent_message_counts_missing() {
        let err = FixError::InconsistentDependencies {
            policy: AggregatePolicy::All,
            missing: vec![PathBuf::from("b.cs"), PathBuf::from("c.cs")],
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "dependency check failed (policy 'all'): 2 of 3 missing"
        );
    }
}
