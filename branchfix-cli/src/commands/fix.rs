//! `branchfix [fix]`: resolve branch, rewrite target, check dependencies.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use branchfix_core::{rules::RuleIssue, AggregatePolicy, Lookup};
use branchfix_sync::{
    diff_target,
    pipeline::{self, FixOptions, FixReport, RewriteStage},
    FixError, RewriteOutcome, WriteResult,
};
use branchfix_vcs::GitCli;

use super::check::{print_status, ConsistencyJson};
use super::rules::{startup_self_check, EXIT_SELF_CHECK_FAILED};
use crate::{CommonArgs, Loaded, PolicyArg};

/// Arguments for `branchfix fix` (also the default command).
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Branch to fix for (default: the branch currently checked out in git).
    pub branch: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Aggregate policy for the dependency check: all | any (default: from config).
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<PolicyArg>,

    /// Show what would be rewritten without writing the target file.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON report.
    #[arg(long)]
    pub json: bool,
}

impl FixArgs {
    pub fn run(self) -> Result<i32> {
        self.common.init_tracing();
        let loaded = self.common.load()?;

        let fatal = startup_self_check(&loaded, !self.json);
        if !fatal.is_empty() {
            if self.json {
                print_self_check_json(&loaded, &fatal)?;
            } else {
                fail(format!(
                    "failed at rule self-check (exit {EXIT_SELF_CHECK_FAILED}); target not touched"
                ));
            }
            return Ok(EXIT_SELF_CHECK_FAILED);
        }

        let opts = FixOptions {
            root: self.common.root.clone(),
            branch: self.branch.clone(),
            policy: self.policy.map(AggregatePolicy::from),
            dry_run: self.dry_run,
        };
        let provider = GitCli::at(&self.common.root);
        let report = pipeline::run(&loaded.config, &loaded.table, &opts, &provider);

        if self.json {
            print_json(&loaded, &report)?;
        } else {
            print_human(&loaded, &report, self.dry_run)?;
        }
        Ok(report.exit_code())
    }
}

// ---------------------------------------------------------------------------
// Human output
// ---------------------------------------------------------------------------

fn ok(line: impl std::fmt::Display) {
    println!("{} {line}", "✓".green().bold());
}

fn fail(line: impl std::fmt::Display) {
    println!("{} {line}", "✗".red().bold());
}

fn print_human(loaded: &Loaded, report: &FixReport, dry_run: bool) -> Result<()> {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let branch = if report.branch.is_empty() {
        "<unresolved>".italic().to_string()
    } else {
        report.branch.to_string().bold().to_string()
    };
    println!("{prefix}branch: {branch} (config: {})", loaded.source);

    match (&report.rewrite, &report.failure) {
        (Some(RewriteStage::Skipped), _) => {
            ok(format!("rewrite: '{}' is canonical, nothing to rewrite", report.branch))
        }
        (Some(RewriteStage::Applied(outcome)), _) => {
            print_rewrite(outcome);
            if matches!(outcome.write, WriteResult::WouldWrite { .. }) {
                print_preview(loaded, report)?;
            }
        }
        (None, Some(err @ FixError::UnknownRuleset { .. })) => {
            fail(format!("rules: {err}"));
            println!("  Add an entry for this branch to branchfix.yaml.");
        }
        (None, Some(err)) => fail(format!("rewrite: {err}")),
        (None, None) => {}
    }

    if let Some(consistency) = &report.consistency {
        print_status(consistency);
        for path in consistency.missing() {
            println!("  ✗  {}", path.display());
        }
    }

    if report.is_success() {
        ok(format!("{prefix}all stages passed"));
    } else if let Some(err) = &report.failure {
        fail(format!("failed at {} (exit {})", err.stage(), err.exit_code()));
    }
    Ok(())
}

fn print_rewrite(outcome: &RewriteOutcome) {
    match &outcome.write {
        WriteResult::Written { path } => ok(format!(
            "rewrite: {} updated ({} replacements)",
            path.display(),
            outcome.total_hits()
        )),
        WriteResult::WouldWrite { path } => ok(format!(
            "rewrite: {} would be updated ({} replacements)",
            path.display(),
            outcome.total_hits()
        )),
        WriteResult::Unchanged { path } => {
            ok(format!("rewrite: {} already up to date", path.display()))
        }
    }
}

fn print_preview(loaded: &Loaded, report: &FixReport) -> Result<()> {
    let branch_rules = match loaded.table.lookup(&report.branch) {
        Lookup::Rules(rules) => rules,
        _ => return Ok(()),
    };
    let RewriteStage::Applied(outcome) = report.rewrite.as_ref().context("no rewrite")? else {
        return Ok(());
    };
    let diff = diff_target(outcome.write.path(), &loaded.config.target, branch_rules)
        .context("failed to render dry-run diff")?;
    print!("{}", diff.unified_diff);
    if !diff.unified_diff.ends_with('\n') {
        println!();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct FixReportJson {
    branch: String,
    config: String,
    status: &'static str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rewrite: Option<RewriteJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    consistency: Option<ConsistencyJson>,
    checked_at: String,
}

#[derive(Serialize)]
struct RewriteJson {
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    replacements: usize,
}

fn status_key(report: &FixReport) -> &'static str {
    match &report.failure {
        None => "success",
        Some(FixError::UnknownRuleset { .. }) => "unknown_ruleset",
        Some(FixError::TargetNotFound { .. }) => "target_not_found",
        Some(FixError::Io { .. }) => "io_error",
        Some(FixError::InconsistentDependencies { .. }) => "inconsistent_dependencies",
    }
}

fn rewrite_json(stage: &RewriteStage) -> RewriteJson {
    let path_of = |p: &Path| Some(p.display().to_string());
    match stage {
        RewriteStage::Skipped => RewriteJson {
            action: "skipped",
            path: None,
            replacements: 0,
        },
        RewriteStage::Applied(outcome) => RewriteJson {
            action: match outcome.write {
                WriteResult::Written { .. } => "written",
                WriteResult::Unchanged { .. } => "unchanged",
                WriteResult::WouldWrite { .. } => "would_write",
            },
            path: path_of(outcome.write.path()),
            replacements: outcome.total_hits(),
        },
    }
}

fn print_json(loaded: &Loaded, report: &FixReport) -> Result<()> {
    let payload = FixReportJson {
        branch: report.branch.to_string(),
        config: loaded.source.to_string(),
        status: status_key(report),
        exit_code: report.exit_code(),
        failed_stage: report.failure.as_ref().map(|e| e.stage().to_string()),
        error: report.failure.as_ref().map(|e| e.to_string()),
        rewrite: report.rewrite.as_ref().map(rewrite_json),
        consistency: report.consistency.as_ref().map(ConsistencyJson::from),
        checked_at: Utc::now().to_rfc3339(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize fix JSON")?
    );
    Ok(())
}

#[derive(Serialize)]
struct SelfCheckFailedJson {
    config: String,
    status: &'static str,
    exit_code: i32,
    failed_stage: &'static str,
    issues: Vec<String>,
    checked_at: String,
}

fn print_self_check_json(loaded: &Loaded, fatal: &[RuleIssue]) -> Result<()> {
    let payload = SelfCheckFailedJson {
        config: loaded.source.to_string(),
        status: "self_check_failed",
        exit_code: EXIT_SELF_CHECK_FAILED,
        failed_stage: "rule self-check",
        issues: fatal.iter().map(ToString::to_string).collect(),
        checked_at: Utc::now().to_rfc3339(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize fix JSON")?
    );
    Ok(())
}
