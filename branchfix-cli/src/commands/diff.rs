//! `branchfix diff [BRANCH]`: show the unified diff a rewrite would produce.

use anyhow::Result;
use clap::Args;

use branchfix_core::Lookup;
use branchfix_sync::{diff_target, FixError};
use branchfix_vcs::{resolve_branch, GitCli};

use super::rules::startup_self_check;
use crate::CommonArgs;

/// Arguments for `branchfix diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Branch whose rules to preview (default: the branch checked out in git).
    pub branch: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<i32> {
        self.common.init_tracing();
        let loaded = self.common.load()?;
        // Preview only: issues are logged, never fatal here.
        startup_self_check(&loaded, false);
        let branch = resolve_branch(self.branch.as_deref(), &GitCli::at(&self.common.root));

        let rules = match loaded.table.lookup(&branch) {
            Lookup::Rules(rules) => rules,
            Lookup::NoRewriteNeeded => {
                println!("'{branch}' is canonical; nothing to rewrite.");
                return Ok(0);
            }
            Lookup::Unknown => {
                let err = FixError::UnknownRuleset { branch };
                eprintln!("error: {err}");
                return Ok(err.exit_code());
            }
        };

        let target = loaded.config.target_path(&self.common.root);
        let diff = match diff_target(&target, &loaded.config.target, rules) {
            Ok(diff) => diff,
            Err(err) => {
                eprintln!("error: {err}");
                return Ok(err.exit_code());
            }
        };

        if diff.is_empty() {
            println!("No differences for '{}'.", loaded.config.target.display());
            return Ok(0);
        }
        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(0)
    }
}
