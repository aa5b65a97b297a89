//! branchfix core library: rule table, rewrite engine, consistency checks.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`ConfigError`]
//! - [`config`]: YAML configuration load / embedded default
//! - [`rules`]: [`RuleTable`] lookup and startup self-check
//! - [`engine`]: pure, ordered rule application
//! - [`consistency`]: existence checks with an explicit aggregate policy

pub mod config;
pub mod consistency;
pub mod engine;
pub mod error;
pub mod rules;
pub mod types;

pub use config::Config;
pub use consistency::{check_all, ConsistencyReport, PathCheck};
pub use engine::{apply, ApplyOutcome};
pub use error::ConfigError;
pub use rules::{Lookup, RuleTable};
pub use types::{AggregatePolicy, BranchId, Rule, RuleSet};
