//! branchfix: branch-aware source rewriting CLI.
//!
//! # Usage
//!
//! ```text
//! branchfix [BRANCH] [--root DIR] [--config FILE] [--policy all|any] [--dry-run] [--json]
//! branchfix fix [BRANCH] ...
//! branchfix check [--policy all|any] [--json]
//! branchfix rules [--validate]
//! branchfix diff [BRANCH]
//! ```
//!
//! # Exit codes
//!
//! `0` success, `1` internal or config error, `2` usage error,
//! `3` unknown rule set, `4` rewrite failed, `5` inconsistent dependencies,
//! `6` rule self-check failed.

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use branchfix_core::{config::ConfigSource, AggregatePolicy, Config, RuleTable};
use commands::{check::CheckArgs, diff::DiffArgs, fix::FixArgs, rules::RulesArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "branchfix",
    version,
    about = "Rewrite source files to match the data structures of the current branch",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // Without a subcommand, run the full fix pipeline.
    #[command(flatten)]
    fix: FixArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite the target file for a branch, then check dependencies.
    Fix(FixArgs),

    /// Only check that the dependent files exist.
    Check(CheckArgs),

    /// List the branch rule table and optionally self-check it.
    Rules(RulesArgs),

    /// Show the unified diff a rewrite would produce.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

/// Options every command accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Project root; target and dependency paths are relative to it.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Config file (default: <root>/branchfix.yaml, else built-in table).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Configuration and compiled rule table for one invocation.
pub struct Loaded {
    pub config: Config,
    pub source: ConfigSource,
    pub table: RuleTable,
}

impl CommonArgs {
    pub fn init_tracing(&self) {
        use tracing_subscriber::{fmt, EnvFilter};

        let default = match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub fn load(&self) -> Result<Loaded> {
        let (config, source) = Config::resolve_at(&self.root, self.config.as_deref())
            .context("failed to load configuration")?;
        let table = config
            .rule_table()
            .with_context(|| format!("invalid rule table in {source} config"))?;
        tracing::debug!(config = %source, branches = table.len(), "loaded rule table");
        Ok(Loaded {
            config,
            source,
            table,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared AggregatePolicy argument, parsed from CLI strings, converts to core type
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `AggregatePolicy` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyArg(pub AggregatePolicy);

impl FromStr for PolicyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self(AggregatePolicy::All)),
            "any" => Ok(Self(AggregatePolicy::Any)),
            other => Err(format!("unknown policy '{other}'; expected: all, any")),
        }
    }
}

impl fmt::Display for PolicyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<PolicyArg> for AggregatePolicy {
    fn from(p: PolicyArg) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        None => cli.fix.run(),
        Some(Commands::Fix(args)) => args.run(),
        Some(Commands::Check(args)) => args.run(),
        Some(Commands::Rules(args)) => args.run(),
        Some(Commands::Diff(args)) => args.run(),
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
