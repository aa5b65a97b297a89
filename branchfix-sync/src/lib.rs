//! # branchfix-sync
//!
//! Target-file rewriting with atomic write-back, and the end-to-end pipeline.
//!
//! Call [`pipeline::run`] to resolve the branch, rewrite the target file and
//! check dependencies in one pass, or [`diff_target`] to preview a rewrite.

pub mod diff;
pub mod error;
pub mod pipeline;
pub mod writer;

pub use diff::{diff_target, FileDiff};
pub use error::FixError;
pub use pipeline::{FixOptions, FixReport, RewriteStage, Stage};
pub use writer::{rewrite_target, RewriteOutcome, WriteResult};
