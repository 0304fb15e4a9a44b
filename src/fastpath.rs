//! Regex fast path: render a non-recursive rule's node tree into an
//! equivalent anchored pattern.
//!
//! A pure optimization over the tree matcher for boolean conformance
//! checks; it produces no sub-match tree. Rules that reach themselves
//! through any chain of references cannot be rendered and fail with
//! [`Error::CircularRuleReference`].

use crate::error::Error;
use crate::node::{MaxRepeats, Node, NodeKind};
use crate::rule::Rule;
use crate::rule_list::RuleList;

/// Anchored pattern equivalent to `rule` within `grammar`.
pub fn rule_pattern(rule: &Rule, grammar: &RuleList) -> Result<String, Error> {
    let mut visiting = vec![rule.name().to_string()];
    let fragment = node_pattern(rule.root(), grammar, &mut visiting)?;
    Ok(format!("^(?:{fragment})$"))
}

fn node_pattern(
    node: &Node,
    grammar: &RuleList,
    visiting: &mut Vec<String>,
) -> Result<String, Error> {
    let inner = match node.kind() {
        NodeKind::Literal(text) => literal_pattern(text),
        NodeKind::NumericRange { start, end } => {
            if start == end {
                format!("\\x{{{start:X}}}")
            } else {
                format!("[\\x{{{start:X}}}-\\x{{{end:X}}}]")
            }
        }
        NodeKind::NumericSet(codes) => codes
            .iter()
            .map(|code| format!("\\x{{{code:X}}}"))
            .collect::<String>(),
        NodeKind::RuleRef(name) => {
            let resolved = grammar.resolve(name)?;
            let key = resolved.rule.name().to_string();
            if visiting.contains(&key) {
                return Err(Error::CircularRuleReference { name: key });
            }
            visiting.push(key);
            let pattern = node_pattern(resolved.rule.root(), resolved.grammar, visiting)?;
            visiting.pop();
            format!("(?:{pattern})")
        }
        NodeKind::Sequence(children) => {
            let mut out = String::new();
            for child in children {
                out.push_str(&node_pattern(child, grammar, visiting)?);
            }
            out
        }
        NodeKind::Alternation(children) => {
            let parts = children
                .iter()
                .map(|child| node_pattern(child, grammar, visiting))
                .collect::<Result<Vec<_>, _>>()?;
            format!("(?:{})", parts.join("|"))
        }
    };
    Ok(apply_quantifier(node, inner))
}

fn apply_quantifier(node: &Node, inner: String) -> String {
    if node.has_default_repeats() {
        return inner;
    }
    let grouped = format!("(?:{inner})");
    match (node.min_repeats(), node.max_repeats()) {
        (0, MaxRepeats::Finite(1)) => format!("{grouped}?"),
        (0, MaxRepeats::Unbounded) => format!("{grouped}*"),
        (1, MaxRepeats::Unbounded) => format!("{grouped}+"),
        (min, MaxRepeats::Unbounded) => format!("{grouped}{{{min},}}"),
        (min, MaxRepeats::Finite(max)) if min == max => format!("{grouped}{{{min}}}"),
        (min, MaxRepeats::Finite(max)) => format!("{grouped}{{{min},{max}}}"),
    }
}

/// ABNF literals match ASCII case-insensitively.
fn literal_pattern(text: &str) -> String {
    let escaped = regex::escape(text);
    if text.chars().any(|c| c.is_ascii_alphabetic()) {
        format!("(?i:{escaped})")
    } else {
        escaped
    }
}
