//! `branchfix rules [--validate]`: list the branch table and self-check it.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use branchfix_core::rules::{BranchEntry, RuleIssue};

use crate::{CommonArgs, Loaded};

/// Exit code when the rule self-check finds problems.
pub const EXIT_SELF_CHECK_FAILED: i32 = 6;

/// Arguments for `branchfix rules`.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Check patterns for boundary anchoring and each rule set for idempotence.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Tabled)]
struct RuleTableRow {
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "#")]
    index: String,
    #[tabled(rename = "pattern")]
    pattern: String,
    #[tabled(rename = "replacement")]
    replacement: String,
}

impl RulesArgs {
    pub fn run(self) -> Result<i32> {
        self.common.init_tracing();
        let loaded = self.common.load()?;

        println!(
            "branchfix v{} | config: {} | target: {} | {} branches",
            env!("CARGO_PKG_VERSION"),
            loaded.source,
            loaded.config.target.display(),
            loaded.table.len(),
        );

        let mut rows = Vec::new();
        for (branch, entry) in loaded.table.branches() {
            match entry {
                BranchEntry::Canonical => rows.push(RuleTableRow {
                    branch: branch.to_string(),
                    index: "-".to_string(),
                    pattern: "(canonical)".to_string(),
                    replacement: "(no rewrite)".to_string(),
                }),
                BranchEntry::Rules(set) => {
                    for (i, rule) in set.iter().enumerate() {
                        rows.push(RuleTableRow {
                            branch: branch.to_string(),
                            index: (i + 1).to_string(),
                            pattern: rule.pattern().to_string(),
                            replacement: rule.replacement().to_string(),
                        });
                    }
                }
            }
        }
        if rows.is_empty() {
            println!("No branches configured.");
        } else {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }

        if !self.validate {
            return Ok(0);
        }

        let issues = loaded.table.self_check();
        if issues.is_empty() {
            println!("{} self-check: all rule sets passed", "✓".green().bold());
            return Ok(0);
        }
        println!(
            "{} self-check: {} issue(s) found",
            "✗".red().bold(),
            issues.len()
        );
        for issue in &issues {
            println!("  ✗  {issue}");
        }
        Ok(EXIT_SELF_CHECK_FAILED)
    }
}

/// Startup self-check for commands that rewrite or preview the target.
///
/// Every issue is logged at `warn`, and also printed as a status line when
/// `show` is set. Returns only the issues that make a rewrite unsafe.
pub fn startup_self_check(loaded: &Loaded, show: bool) -> Vec<RuleIssue> {
    let issues = loaded.table.self_check();
    for issue in &issues {
        tracing::warn!(branch = %issue.branch(), fatal = issue.is_fatal(), "self-check: {issue}");
        if show {
            println!("{} self-check: {issue}", "✗".red().bold());
        }
    }
    issues.into_iter().filter(RuleIssue::is_fatal).collect()
}
