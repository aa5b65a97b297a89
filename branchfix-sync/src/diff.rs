//! Unified diff preview for `branchfix diff` and `--dry-run`.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use branchfix_core::{apply, RuleSet};

use crate::{writer::read_target, FixError};

/// What a rewrite of one file would change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    /// Empty when the rule set leaves the file unchanged.
    pub unified_diff: String,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Apply `rules` to the file at `path` in memory and diff the result.
///
/// No files are written. `label` is the path shown in the diff headers.
pub fn diff_target(path: &Path, label: &Path, rules: &RuleSet) -> Result<FileDiff, FixError> {
    let existing = read_target(path)?;
    let outcome = apply(&existing, rules);
    let unified_diff = if outcome.changed {
        unified(label, &existing, &outcome.content)
    } else {
        String::new()
    };
    Ok(FileDiff {
        path: path.to_path_buf(),
        unified_diff,
    })
}

fn unified(label: &Path, old: &str, new: &str) -> String {
    let old_header = format!("a/{}", label.display());
    let new_header = format!("b/{}", label.display());
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}
