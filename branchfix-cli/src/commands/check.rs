//! `branchfix check`: dependency existence check on its own.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use branchfix_core::{check_all, AggregatePolicy, ConsistencyReport};
use branchfix_sync::error::EXIT_INCONSISTENT;

use crate::{CommonArgs, PolicyArg};

/// Arguments for `branchfix check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Aggregate policy: all | any (default: from config).
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<PolicyArg>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<i32> {
        self.common.init_tracing();
        let loaded = self.common.load()?;
        let policy = self
            .policy
            .map(AggregatePolicy::from)
            .unwrap_or(loaded.config.policy);

        let report = check_all(&self.common.root, &loaded.config.dependencies, policy);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&ConsistencyJson::from(&report))
                    .context("failed to serialize check JSON")?
            );
        } else {
            print_table(&report);
            print_status(&report);
        }

        Ok(if report.passed { 0 } else { EXIT_INCONSISTENT })
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ConsistencyJson {
    policy: String,
    passed: bool,
    present: usize,
    checks: Vec<PathCheckJson>,
}

#[derive(Serialize)]
struct PathCheckJson {
    path: String,
    exists: bool,
}

impl From<&ConsistencyReport> for ConsistencyJson {
    fn from(report: &ConsistencyReport) -> Self {
        Self {
            policy: report.policy.to_string(),
            passed: report.passed,
            present: report.present_count(),
            checks: report
                .checks
                .iter()
                .map(|c| PathCheckJson {
                    path: c.path.display().to_string(),
                    exists: c.exists,
                })
                .collect(),
        }
    }
}

#[derive(Tabled)]
struct CheckTableRow {
    #[tabled(rename = "dependency")]
    path: String,
    #[tabled(rename = "status")]
    status: String,
}

pub fn print_table(report: &ConsistencyReport) {
    if report.checks.is_empty() {
        println!("No dependencies configured.");
        return;
    }
    let rows: Vec<CheckTableRow> = report
        .checks
        .iter()
        .map(|c| CheckTableRow {
            path: c.path.display().to_string(),
            status: if c.exists { "present" } else { "MISSING" }.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn print_status(report: &ConsistencyReport) {
    let line = format!(
        "consistency: {}/{} dependencies present (policy '{}')",
        report.present_count(),
        report.checks.len(),
        report.policy,
    );
    if report.passed {
        println!("{} {line}", "✓".green().bold());
    } else {
        println!("{} {line}", "✗".red().bold());
    }
}
