//! Version-control adapter for resolving the active branch.
//!
//! This crate is intentionally thin: it shells out to `git` for the branch
//! name and treats the answer as an opaque string.

use std::path::{Path, PathBuf};
use std::process::Command;

use branchfix_core::BranchId;

/// Errors from interacting with a git repository.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("git executable is not available in PATH")]
    NotInstalled,

    #[error("git command failed: git {args} ({message})")]
    CommandFailed { args: String, message: String },
}

/// Anything that can report the currently checked-out branch.
pub trait BranchProvider {
    /// Current branch name. A detached HEAD yields an empty identifier.
    fn current_branch(&self) -> Result<BranchId, VcsError>;
}

/// Thin client around the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    /// Returns true if `git` is available in PATH.
    pub fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Client that runs `git` inside `path`.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            repo_root: path.as_ref().to_path_buf(),
        }
    }
}

impl BranchProvider for GitCli {
    fn current_branch(&self) -> Result<BranchId, VcsError> {
        let stdout = run_git(&self.repo_root, &["branch", "--show-current"])?;
        Ok(BranchId::from(first_nonempty_line(&stdout).unwrap_or_default()))
    }
}

/// Provider that always answers with the same branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBranch(pub BranchId);

impl BranchProvider for FixedBranch {
    fn current_branch(&self) -> Result<BranchId, VcsError> {
        Ok(self.0.clone())
    }
}

/// Pick the branch to work on.
///
/// An explicit value wins. Otherwise the provider is asked; if it fails the
/// empty identifier is returned so lookup reports it as an unknown branch.
pub fn resolve_branch(explicit: Option<&str>, provider: &dyn BranchProvider) -> BranchId {
    if let Some(branch) = explicit {
        return BranchId::from(branch);
    }
    match provider.current_branch() {
        Ok(branch) => branch,
        Err(err) => {
            tracing::warn!(error = %err, "could not resolve current branch");
            BranchId::from("")
        }
    }
}

fn run_git(cwd: &Path, args: &[&str]) -> Result<String, VcsError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                VcsError::NotInstalled
            } else {
                VcsError::CommandFailed {
                    args: args.join(" "),
                    message: err.to_string(),
                }
            }
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            "unknown error".to_string()
        } else {
            stderr
        };
        Err(VcsError::CommandFailed {
            args: args.join(" "),
            message,
        })
    }
}

fn first_nonempty_line(input: &str) -> Option<&str> {
    input.lines().map(str::trim).find(|line| !line.is_empty())
}
