//! Target-file rewrite with atomic write-back.
//!
//! ## `rewrite_target` protocol
//!
//! 1. Fail with `TargetNotFound` if the target is absent.
//! 2. Read the whole file into memory.
//! 3. Apply the rule set (pure).
//! 4. Skip the write if the content is unchanged.
//! 5. Resolve symlinks, then write `<resolved>.branchfix.tmp` with the
//!    target's permissions.
//! 6. Rename over the resolved target (atomic on POSIX).
//!
//! Content is written back byte-for-byte as produced; line endings are left alone.
//! A symlinked target keeps its link; the file it points at is replaced.

use std::path::{Path, PathBuf};

use branchfix_core::{apply, RuleSet};

use crate::error::{io_err, FixError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was rewritten.
    Written { path: PathBuf },
    /// No rule changed the content; the file was not touched.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been rewritten.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// What a rewrite pass did to the target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub write: WriteResult,
    /// Matches replaced per rule, in rule order.
    pub hits: Vec<usize>,
}

impl RewriteOutcome {
    pub fn total_hits(&self) -> usize {
        self.hits.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// read_target
// ---------------------------------------------------------------------------

/// Read the whole target file, distinguishing "absent" from other I/O errors.
pub fn read_target(path: &Path) -> Result<String, FixError> {
    if !path.is_file() {
        return Err(FixError::TargetNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| io_err(path, e))
}

// ---------------------------------------------------------------------------
// atomic_write
// ---------------------------------------------------------------------------

pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), FixError> {
    let dest = std::fs::canonicalize(path).map_err(|e| io_err(path, e))?;
    let tmp = PathBuf::from(format!("{}.branchfix.tmp", dest.display()));
    atomic_write_with_tmp(&dest, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), FixError> {
    let permissions = std::fs::metadata(path)
        .map_err(|e| io_err(path, e))?
        .permissions();
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    let placed = std::fs::set_permissions(tmp, permissions)
        .map_err(|e| io_err(tmp, e))
        .and_then(|()| std::fs::rename(tmp, path).map_err(|e| io_err(path, e)));
    if let Err(err) = placed {
        let _ = std::fs::remove_file(tmp);
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// rewrite_target
// ---------------------------------------------------------------------------

/// Apply `rules` to the file at `path`, writing it back only when it changed.
pub fn rewrite_target(
    path: &Path,
    rules: &RuleSet,
    dry_run: bool,
) -> Result<RewriteOutcome, FixError> {
    let original = read_target(path)?;
    let outcome = apply(&original, rules);

    let write = if !outcome.changed {
        tracing::debug!("unchanged: {}", path.display());
        WriteResult::Unchanged {
            path: path.to_path_buf(),
        }
    } else if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        WriteResult::WouldWrite {
            path: path.to_path_buf(),
        }
    } else {
        atomic_write(path, &outcome.content)?;
        tracing::info!("wrote: {}", path.display());
        WriteResult::Written {
            path: path.to_path_buf(),
        }
    };

    Ok(RewriteOutcome {
        write,
        hits: outcome.hits,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
