//! Ordered, pure rule application.
//!
//! Each rule is a global substitution over the output of the previous rule.
//! No file I/O happens here; callers read the target before and write it back
//! after, only when [`ApplyOutcome::changed`] is set.

use crate::types::RuleSet;

/// Result of running a [`RuleSet`] over some content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Content after every rule has run.
    pub content: String,
    /// `true` iff `content` differs from the input.
    pub changed: bool,
    /// Number of matches each rule replaced, in rule order.
    pub hits: Vec<usize>,
}

impl ApplyOutcome {
    pub fn total_hits(&self) -> usize {
        self.hits.iter().sum()
    }
}

/// Apply `rules` to `content` in declared order.
pub fn apply(content: &str, rules: &RuleSet) -> ApplyOutcome {
    let mut current = content.to_owned();
    let mut hits = Vec::with_capacity(rules.len());

    for rule in rules {
        let count = rule.regex().find_iter(&current).count();
        if count > 0 {
            tracing::debug!(
                pattern = rule.pattern(),
                replacement = rule.replacement(),
                count,
                "rule matched"
            );
            current = rule
                .regex()
                .replace_all(&current, rule.replacement())
                .into_owned();
        }
        hits.push(count);
    }

    // A rule can match and still reproduce its input, so compare the whole text.
    let changed = current != content;
    ApplyOutcome {
        content: current,
        changed,
        hits,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
