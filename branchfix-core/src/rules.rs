//! Branch → rule set lookup table and its startup self-check.
//!
//! The table is built once from configuration data and is read-only
//! afterwards. Branch identifiers without an entry resolve to
//! [`Lookup::Unknown`]; callers report that as a failure.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::BranchSpec;
use crate::engine;
use crate::error::ConfigError;
use crate::types::{BranchId, Rule, RuleSet};

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A registered branch: either already canonical or rewritten by a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchEntry {
    Canonical,
    Rules(RuleSet),
}

/// Outcome of [`RuleTable::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Rules(&'a RuleSet),
    NoRewriteNeeded,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: BTreeMap<BranchId, BranchEntry>,
}

impl RuleTable {
    pub fn builder() -> RuleTableBuilder {
        RuleTableBuilder::default()
    }

    /// Compile configuration entries, rejecting bad patterns and duplicates.
    pub fn from_specs(specs: &[BranchSpec]) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        for spec in specs {
            if spec.canonical {
                if !spec.rules.is_empty() {
                    return Err(ConfigError::CanonicalWithRules {
                        branch: spec.branch.clone(),
                    });
                }
                builder = builder.canonical(spec.branch.clone());
                continue;
            }

            let rules = spec
                .rules
                .iter()
                .map(|r| {
                    Rule::new(&r.pattern, r.replacement.clone()).map_err(|e| {
                        ConfigError::InvalidPattern {
                            branch: spec.branch.clone(),
                            pattern: r.pattern.clone(),
                            source: e,
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.rules(
                spec.branch.clone(),
                RuleSet::new(rules).with_samples(spec.samples.clone()),
            );
        }
        builder.build()
    }

    pub fn lookup(&self, branch: &BranchId) -> Lookup<'_> {
        match self.entries.get(branch) {
            Some(BranchEntry::Canonical) => Lookup::NoRewriteNeeded,
            Some(BranchEntry::Rules(set)) => Lookup::Rules(set),
            None => Lookup::Unknown,
        }
    }

    /// Registered branches in sorted order.
    pub fn branches(&self) -> impl Iterator<Item = (&BranchId, &BranchEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run [`check_rule_set`] over every registered rule set.
    pub fn self_check(&self) -> Vec<RuleIssue> {
        self.entries
            .iter()
            .filter_map(|(branch, entry)| match entry {
                BranchEntry::Rules(set) => Some(check_rule_set(branch, set)),
                BranchEntry::Canonical => None,
            })
            .flatten()
            .collect()
    }
}

/// Incremental constructor, mainly for injecting tables in tests.
#[derive(Debug, Default)]
pub struct RuleTableBuilder {
    entries: Vec<(BranchId, BranchEntry)>,
}

impl RuleTableBuilder {
    pub fn canonical(mut self, branch: impl Into<BranchId>) -> Self {
        self.entries.push((branch.into(), BranchEntry::Canonical));
        self
    }

    pub fn rules(mut self, branch: impl Into<BranchId>, set: RuleSet) -> Self {
        self.entries.push((branch.into(), BranchEntry::Rules(set)));
        self
    }

    pub fn build(self) -> Result<RuleTable, ConfigError> {
        let mut entries = BTreeMap::new();
        for (branch, entry) in self.entries {
            if entries.contains_key(&branch) {
                return Err(ConfigError::DuplicateBranch { branch });
            }
            entries.insert(branch, entry);
        }
        Ok(RuleTable { entries })
    }
}

// ---------------------------------------------------------------------------
// Self-check
// ---------------------------------------------------------------------------

/// A problem found by the startup self-check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleIssue {
    /// The pattern matches the empty string and would insert text everywhere.
    #[error("[{branch}] pattern {pattern:?} matches the empty string")]
    MatchesEmpty { branch: BranchId, pattern: String },

    /// The pattern starts with an identifier character but no `\b`.
    #[error("[{branch}] pattern {pattern:?} can match inside a longer identifier (no leading \\b)")]
    UnanchoredStart { branch: BranchId, pattern: String },

    /// The pattern ends with an identifier character but no `\b`.
    #[error("[{branch}] pattern {pattern:?} can match inside a longer identifier (no trailing \\b)")]
    UnanchoredEnd { branch: BranchId, pattern: String },

    /// A second application still changed the probe input.
    #[error("[{branch}] rule set is not idempotent on {input:?}: {once:?} became {twice:?}")]
    NotIdempotent {
        branch: BranchId,
        input: String,
        once: String,
        twice: String,
    },
}

impl RuleIssue {
    /// Issues that make a rewrite unsafe to run, as opposed to style warnings.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuleIssue::MatchesEmpty { .. } | RuleIssue::NotIdempotent { .. }
        )
    }

    pub fn branch(&self) -> &BranchId {
        match self {
            RuleIssue::MatchesEmpty { branch, .. }
            | RuleIssue::UnanchoredStart { branch, .. }
            | RuleIssue::UnanchoredEnd { branch, .. }
            | RuleIssue::NotIdempotent { branch, .. } => branch,
        }
    }
}

/// Check one rule set: pattern boundary conventions plus an idempotence probe.
///
/// The probe input is every configured sample plus each rule's replacement
/// text with group references filled in.
pub fn check_rule_set(branch: &BranchId, set: &RuleSet) -> Vec<RuleIssue> {
    let mut issues = Vec::new();

    for rule in set {
        let pattern = rule.pattern().to_owned();
        if rule.regex().is_match("") {
            issues.push(RuleIssue::MatchesEmpty {
                branch: branch.clone(),
                pattern: pattern.clone(),
            });
        }
        if !start_is_anchored(&pattern) {
            issues.push(RuleIssue::UnanchoredStart {
                branch: branch.clone(),
                pattern: pattern.clone(),
            });
        }
        if !end_is_anchored(&pattern) {
            issues.push(RuleIssue::UnanchoredEnd {
                branch: branch.clone(),
                pattern,
            });
        }
    }

    // Skip the probe when a pattern matches "": it never converges and is already reported.
    if issues
        .iter()
        .any(|i| matches!(i, RuleIssue::MatchesEmpty { .. }))
    {
        return issues;
    }

    for input in probe_inputs(set) {
        let once = engine::apply(&input, set);
        let twice = engine::apply(&once.content, set);
        if twice.changed {
            issues.push(RuleIssue::NotIdempotent {
                branch: branch.clone(),
                input,
                once: once.content,
                twice: twice.content,
            });
        }
    }

    issues
}

fn group_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `$$` is a literal dollar; any other `$name` / `${name}` is a group reference.
    RE.get_or_init(|| {
        Regex::new(r"\$\$|\$\{[^}]*\}|\$[A-Za-z0-9_]+")
            .expect("group reference regex must compile")
    })
}

fn probe_inputs(set: &RuleSet) -> Vec<String> {
    let mut inputs: Vec<String> = set.samples().to_vec();
    for rule in set {
        let filled = group_ref_re().replace_all(rule.replacement(), |caps: &Captures<'_>| {
            if &caps[0] == "$$" {
                "$".to_string()
            } else {
                "Probe".to_string()
            }
        });
        inputs.push(filled.into_owned());
    }
    inputs
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn group_opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `(`, `(?:`, `(?P<name>`, `(?<name>`, `(?i:` and bare flag groups like `(?i)`.
    RE.get_or_init(|| {
        Regex::new(r"^(?:\(\?[a-zA-Z-]*\)|\(\?P?<[A-Za-z0-9_]+>|\(\?[a-zA-Z-]*:|\()")
            .expect("group opener regex must compile")
    })
}

/// The pattern with leading group openers removed, so the first atom is visible.
fn strip_group_openers(pattern: &str) -> &str {
    let mut rest = pattern;
    while let Some(m) = group_opener_re().find(rest) {
        rest = &rest[m.end()..];
    }
    rest
}

/// The pattern with trailing unescaped `)` removed.
fn strip_group_closers(pattern: &str) -> &str {
    let mut rest = pattern;
    while let Some(inner) = rest.strip_suffix(')') {
        let backslashes = inner.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 1 {
            break;
        }
        rest = inner;
    }
    rest
}

fn start_is_anchored(pattern: &str) -> bool {
    let head = strip_group_openers(pattern);
    if head.starts_with(r"\b") || head.starts_with('^') {
        return true;
    }
    if head.starts_with(r"\w") || head.starts_with(r"\d") {
        return false;
    }
    !head.chars().next().is_some_and(is_word_char)
}

fn end_is_anchored(pattern: &str) -> bool {
    let tail = strip_group_closers(pattern);
    if tail.ends_with(r"\b") || tail.ends_with('$') {
        return true;
    }
    !tail.chars().last().is_some_and(is_word_char)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleSpec;

    fn set(pairs: &[(&str, &str)]) -> RuleSet {
        RuleSet::new(
            pairs
                .iter()
                .map(|(p, r)| Rule::new(p, *r).expect("valid pattern"))
                .collect(),
        )
    }

    fn table() -> RuleTable {
        RuleTable::builder()
            .canonical("trunk")
            .rules("feature/x", set(&[(r"\bfoo\b", "bar")]))
            .build()
            .expect("table")
    }

    #[test]
    fn canonical_branch_needs_no_rewrite() {
        assert_eq!(table().lookup(&BranchId::from("trunk")), Lookup::NoRewriteNeeded);
    }

    #[test]
    fn unknown_branch_is_unknown() {
        assert_eq!(
            table().lookup(&BranchId::from("nonexistent-branch")),
            Lookup::Unknown
        );
        assert_eq!(table().lookup(&BranchId::from("")), Lookup::Unknown);
    }

    #[test]
    fn registered_branch_returns_its_rules() {
        let t = table();
        match t.lookup(&BranchId::from("feature/x")) {
            Lookup::Rules(rules) => assert_eq!(rules.len(), 1),
            other => panic!("expected rules, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_branch_is_rejected() {
        let err = RuleTable::builder()
            .canonical("main")
            .canonical("main")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBranch { .. }));
    }

    #[test]
    fn canonical_with_rules_is_rejected() {
        let specs = vec![BranchSpec {
            branch: BranchId::from("main"),
            canonical: true,
            rules: vec![RuleSpec {
                pattern: r"\ba\b".into(),
                replacement: "b".into(),
            }],
            samples: vec![],
        }];
        let err = RuleTable::from_specs(&specs).unwrap_err();
        assert!(matches!(err, ConfigError::CanonicalWithRules { .. }));
    }

    #[test]
    fn invalid_pattern_names_branch() {
        let specs = vec![BranchSpec {
            branch: BranchId::from("feature/bad"),
            canonical: false,
            rules: vec![RuleSpec {
                pattern: "weapon\\.(".into(),
                replacement: "x".into(),
            }],
            samples: vec![],
        }];
        let err = RuleTable::from_specs(&specs).unwrap_err();
        assert!(err.to_string().contains("feature/bad"), "got: {err}");
    }

    #[test]
    fn branches_are_sorted() {
        let names: Vec<_> = table().branches().map(|(b, _)| b.0.clone()).collect();
        assert_eq!(names, vec!["feature/x", "trunk"]);
    }

    #[test]
    fn anchored_patterns_pass_self_check() {
        let issues = check_rule_set(
            &BranchId::from("b"),
            &set(&[
                (r"\bWeaponAttribute\.(\w+)", "WeaponType.${1}"),
                (r"\bScriptableObject\.CreateInstance<WeaponData>\(\)", "new WeaponData()"),
            ]),
        );
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn unanchored_identifier_is_flagged() {
        let issues = check_rule_set(&BranchId::from("b"), &set(&[(r"attachment\.id", "x.y")]));
        assert!(issues
            .iter()
            .any(|i| matches!(i, RuleIssue::UnanchoredStart { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, RuleIssue::UnanchoredEnd { .. })));
    }

    #[test]
    fn grouped_unanchored_pattern_is_flagged() {
        let issues = check_rule_set(
            &BranchId::from("b"),
            &set(&[(r"(attachment)\.id\b", "${1}.attachmentId")]),
        );
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, RuleIssue::UnanchoredStart { .. })),
            "{issues:?}"
        );
    }

    #[test]
    fn grouped_and_flagged_patterns_see_first_and_last_atom() {
        assert!(!start_is_anchored(r"(?i)(?:weapon)\.x\b"));
        assert!(!start_is_anchored(r"(?P<obj>attachment)\.id\b"));
        assert!(start_is_anchored(r"(\battachment)\.id\b"));
        assert!(!end_is_anchored(r"\battachment\.(id)"));
        assert!(end_is_anchored(r"\battachment\.(id\b)"));
        assert!(end_is_anchored(r"\bcall\(\)"));
    }

    #[test]
    fn fatal_issues_are_empty_match_and_idempotence() {
        let issues = check_rule_set(&BranchId::from("b"), &set(&[(r"\bid\b", "id.id")]));
        assert!(issues.iter().any(RuleIssue::is_fatal));
        let style_only = check_rule_set(
            &BranchId::from("b"),
            &set(&[(r"attachment\.idx", "attachment.key")]),
        );
        assert!(!style_only.is_empty());
        assert!(style_only.iter().all(|i| !i.is_fatal()), "{style_only:?}");
        assert_eq!(style_only[0].branch(), &BranchId::from("b"));
    }

    #[test]
    fn empty_match_is_flagged() {
        let issues = check_rule_set(&BranchId::from("b"), &set(&[(r"(foo)?", "x")]));
        assert!(issues
            .iter()
            .any(|i| matches!(i, RuleIssue::MatchesEmpty { .. })));
    }

    #[test]
    fn growing_replacement_fails_idempotence_probe() {
        // `\bid\b` -> `id.id` re-matches its own output.
        let issues = check_rule_set(&BranchId::from("b"), &set(&[(r"\bid\b", "id.id")]));
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, RuleIssue::NotIdempotent { .. })),
            "{issues:?}"
        );
    }

    #[test]
    fn probe_fills_group_references() {
        let inputs = probe_inputs(&set(&[(r"\bA\.(\w+)", "B.${1} $$ $2")]));
        assert_eq!(inputs, vec!["B.Probe $ Probe".to_string()]);
    }
}
