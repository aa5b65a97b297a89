//! End-to-end fix pipeline used by the CLI.
//!
//! ```text
//! ResolveBranch → LookupRules → { Rewrite | SkipRewrite | Fail(UnknownRuleset) }
//!               → CheckConsistency → { Succeed | Fail(InconsistentDependencies) }
//! ```
//!
//! Every failure short-circuits; the returned [`FixReport`] records what ran.

use std::fmt;
use std::path::PathBuf;

use branchfix_core::{
    check_all, rules::Lookup, AggregatePolicy, BranchId, Config, ConsistencyReport, RuleTable,
};
use branchfix_vcs::{resolve_branch, BranchProvider};

use crate::{rewrite_target, FixError, RewriteOutcome};

/// Pipeline stages that can fail, in execution order.
///
/// Branch resolution is not listed: it falls back to the empty branch,
/// which then fails at [`Stage::LookupRules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LookupRules,
    Rewrite,
    CheckConsistency,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::LookupRules => write!(f, "lookup rules"),
            Stage::Rewrite => write!(f, "rewrite"),
            Stage::CheckConsistency => write!(f, "consistency check"),
        }
    }
}

/// Inputs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Project root; config paths are relative to it.
    pub root: PathBuf,
    /// Explicit branch; when `None` the provider is asked.
    pub branch: Option<String>,
    /// Overrides the configured aggregate policy.
    pub policy: Option<AggregatePolicy>,
    pub dry_run: bool,
}

/// Result of the rewrite stage when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteStage {
    /// Canonical branch: the target file was not touched.
    Skipped,
    Applied(RewriteOutcome),
}

/// Everything a pipeline run produced, up to the first failure.
#[derive(Debug)]
pub struct FixReport {
    pub branch: BranchId,
    pub rewrite: Option<RewriteStage>,
    pub consistency: Option<ConsistencyReport>,
    pub failure: Option<FixError>,
}

impl FixReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// `0` on success, otherwise the failing stage's exit code.
    pub fn exit_code(&self) -> i32 {
        self.failure.as_ref().map_or(0, FixError::exit_code)
    }

    fn new(branch: BranchId) -> Self {
        Self {
            branch,
            rewrite: None,
            consistency: None,
            failure: None,
        }
    }

    fn fail(mut self, err: FixError) -> Self {
        tracing::debug!(stage = %err.stage(), error = %err, "pipeline stopped");
        self.failure = Some(err);
        self
    }
}

/// Run the whole pipeline once.
pub fn run(
    config: &Config,
    table: &RuleTable,
    opts: &FixOptions,
    provider: &dyn BranchProvider,
) -> FixReport {
    let branch = resolve_branch(opts.branch.as_deref(), provider);
    tracing::info!(branch = %branch, "resolved branch");
    let mut report = FixReport::new(branch);

    let rewrite = match table.lookup(&report.branch) {
        Lookup::Unknown => {
            let branch = report.branch.clone();
            return report.fail(FixError::UnknownRuleset { branch });
        }
        Lookup::NoRewriteNeeded => RewriteStage::Skipped,
        Lookup::Rules(rules) => {
            let target = config.target_path(&opts.root);
            match rewrite_target(&target, rules, opts.dry_run) {
                Ok(outcome) => RewriteStage::Applied(outcome),
                Err(err) => return report.fail(err),
            }
        }
    };
    report.rewrite = Some(rewrite);

    let policy = opts.policy.unwrap_or(config.policy);
    let consistency = check_all(&opts.root, &config.dependencies, policy);
    let failure = (!consistency.passed).then(|| FixError::InconsistentDependencies {
        policy,
        missing: consistency.missing(),
        total: consistency.checks.len(),
    });
    report.consistency = Some(consistency);

    match failure {
        Some(err) => report.fail(err),
        None => report,
    }
}
