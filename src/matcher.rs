//! Backtracking matcher: walk a rule's node tree against an input string.
//!
//! Alternations collect every viable candidate and keep the longest
//! (declaration order breaks ties); repetitions consume greedily; when a
//! later sequence element fails, the walk backs up to the nearest earlier
//! element with another candidate or spare repeat capacity and retries from
//! there. All of that state lives in this invocation's call frames — the
//! node tree is never written to, so matches against one grammar can run
//! concurrently.

use crate::error::Error;
use crate::match_result::{MatchResult, RuleMatch};
use crate::node::{Node, NodeKind};
use crate::rule::{standardize_rule_name, Rule};
use crate::rule_list::RuleList;

/// Intermediate match: matched text, the rule name when the node was a rule
/// reference, and the named sub-matches collected below it.
#[derive(Debug, Clone)]
pub(crate) struct RawMatch {
    pub(crate) text: String,
    pub(crate) rule_name: Option<String>,
    pub(crate) rules: Vec<RuleMatch>,
}

/// Fold a raw match into parent-level rule entries.
pub(crate) fn entry_rules(raw: RawMatch) -> Vec<RuleMatch> {
    match raw.rule_name {
        Some(name) => vec![RuleMatch::new(name, raw.text, raw.rules)],
        None => raw.rules,
    }
}

fn combine(parts: Vec<RawMatch>) -> RawMatch {
    let mut text = String::new();
    let mut rules = Vec::new();
    for part in parts {
        text.push_str(&part.text);
        rules.extend(entry_rules(part));
    }
    RawMatch {
        text,
        rule_name: None,
        rules,
    }
}

/// One settled sequence element, with what it would take to revisit it.
enum Attempt {
    Plain(RawMatch),
    Alt {
        candidates: Vec<RawMatch>,
        chosen: usize,
    },
    Rep {
        raw: RawMatch,
        count: u64,
    },
}

impl Attempt {
    fn text_len(&self) -> usize {
        match self {
            Attempt::Plain(raw) | Attempt::Rep { raw, .. } => raw.text.len(),
            Attempt::Alt { candidates, chosen } => candidates[*chosen].text.len(),
        }
    }

    fn into_raw(self) -> RawMatch {
        match self {
            Attempt::Plain(raw) | Attempt::Rep { raw, .. } => raw,
            Attempt::Alt {
                mut candidates,
                chosen,
            } => candidates.swap_remove(chosen),
        }
    }
}

/// How to re-enter a sequence element when backtracking lands on it.
enum Retry {
    /// Rematch a repetition with a lowered occurrence cap.
    Cap(u64),
    /// Take the next-ranked alternative from an already-computed candidate
    /// list.
    Alt {
        candidates: Vec<RawMatch>,
        index: usize,
    },
}

/// Matches input against rules of one grammar. Stateless between calls.
pub struct Matcher<'g> {
    grammar: &'g RuleList,
}

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g RuleList) -> Matcher<'g> {
        Matcher { grammar }
    }

    /// Match `input` against `rule`. Unless `allow_partial`, the rule must
    /// consume the whole input.
    pub fn match_rule(
        &self,
        rule: &Rule,
        input: &str,
        allow_partial: bool,
    ) -> Result<MatchResult, Error> {
        let raw = self.match_node(rule.root(), input)?;
        if !allow_partial && raw.text.len() != input.len() {
            return Err(Error::InputTooLong {
                matched: raw.text,
                value: input.to_string(),
                span: Some(rule.root().span()),
            });
        }
        Ok(MatchResult::from_raw(raw))
    }

    pub(crate) fn match_node(&self, node: &Node, input: &str) -> Result<RawMatch, Error> {
        if node.has_default_repeats() {
            self.match_inner(node, input)
        } else {
            self.match_repetition(node, input, None).map(|(raw, _)| raw)
        }
    }

    /// Match the node's content once, ignoring its repeat range.
    fn match_inner(&self, node: &Node, input: &str) -> Result<RawMatch, Error> {
        match node.kind() {
            NodeKind::Literal(text) => self.match_literal(node, text, input),
            NodeKind::NumericRange { start, end } => {
                self.match_numeric_range(node, *start, *end, input)
            }
            NodeKind::NumericSet(codes) => self.match_numeric_set(node, codes, input),
            NodeKind::RuleRef(name) => self.match_rule_ref(node, name, input),
            NodeKind::Sequence(children) => self.match_sequence(children, input),
            NodeKind::Alternation(_) => {
                let mut candidates = self.match_alternatives(node, input)?;
                Ok(candidates.swap_remove(0))
            }
        }
    }

    fn match_literal(&self, node: &Node, literal: &str, input: &str) -> Result<RawMatch, Error> {
        match input.get(..literal.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(literal) => Ok(RawMatch {
                text: prefix.to_string(),
                rule_name: None,
                rules: Vec::new(),
            }),
            _ => Err(Error::InvalidQuotedString {
                expected: literal.to_string(),
                actual: input.to_string(),
                span: Some(node.span()),
            }),
        }
    }

    fn match_numeric_range(
        &self,
        node: &Node,
        start: u32,
        end: u32,
        input: &str,
    ) -> Result<RawMatch, Error> {
        match input.chars().next() {
            Some(c) if (start..=end).contains(&(c as u32)) => Ok(RawMatch {
                text: input[..c.len_utf8()].to_string(),
                rule_name: None,
                rules: Vec::new(),
            }),
            _ => Err(Error::NumericValueOutOfRange {
                start,
                end,
                actual: input.to_string(),
                span: Some(node.span()),
            }),
        }
    }

    fn match_numeric_set(
        &self,
        node: &Node,
        codes: &[u32],
        input: &str,
    ) -> Result<RawMatch, Error> {
        let mut len = 0;
        let mut chars = input.chars();
        for &code in codes {
            match chars.next() {
                Some(c) if c as u32 == code => len += c.len_utf8(),
                _ => {
                    return Err(Error::NumericValueMismatch {
                        expected: codes.to_vec(),
                        actual: input.to_string(),
                        span: Some(node.span()),
                    })
                }
            }
        }
        Ok(RawMatch {
            text: input[..len].to_string(),
            rule_name: None,
            rules: Vec::new(),
        })
    }

    fn match_rule_ref(&self, node: &Node, name: &str, input: &str) -> Result<RawMatch, Error> {
        let resolved = self.grammar.resolve(name).map_err(|e| match e {
            Error::RuleNotFound { name, .. } => Error::RuleNotFound {
                name,
                span: Some(node.span()),
            },
            other => other,
        })?;
        // The reference itself may consume a prefix; the enclosing context
        // decides whether the whole input must be used.
        let sub = match Matcher::new(resolved.grammar).match_node(resolved.rule.root(), input) {
            Ok(raw) => raw,
            Err(e @ Error::RuleNotFound { .. }) => return Err(e),
            Err(e) => {
                return Err(Error::InvalidRuleValue {
                    rule: resolved.rule.name().to_string(),
                    value: input.to_string(),
                    span: Some(node.span()),
                    source: Box::new(e),
                })
            }
        };
        let text = sub.text.clone();
        if resolved.from_core {
            // Core primitives contribute matched text but no result entry.
            Ok(RawMatch {
                text,
                rule_name: None,
                rules: Vec::new(),
            })
        } else {
            let rules = entry_rules(sub);
            Ok(RawMatch {
                text,
                rule_name: Some(resolved.rule.name().to_string()),
                rules,
            })
        }
    }

    /// Greedily match the node's content up to `cap` (or its own maximum)
    /// times. Returns the combined match and the occurrence count.
    fn match_repetition(
        &self,
        node: &Node,
        input: &str,
        cap: Option<u64>,
    ) -> Result<(RawMatch, u64), Error> {
        let limit = cap.unwrap_or_else(|| node.max_repeats().limit());
        let mut parts = Vec::new();
        let mut consumed = 0;
        let mut count = 0;
        while count < limit {
            match self.match_inner(node, &input[consumed..]) {
                Ok(raw) => {
                    let advanced = raw.text.len();
                    consumed += advanced;
                    count += 1;
                    parts.push(raw);
                    // A zero-width sub-match would repeat forever.
                    if advanced == 0 || consumed == input.len() {
                        break;
                    }
                }
                Err(e @ Error::RuleNotFound { .. }) => return Err(e),
                Err(_) => break,
            }
        }
        if count < node.min_repeats() {
            return Err(Error::NotEnoughOccurrences {
                expected: node.min_repeats(),
                actual: count,
                value: input[consumed..].to_string(),
                span: Some(node.span()),
            });
        }
        Ok((combine(parts), count))
    }

    /// Every alternative that matches at this position, longest first,
    /// declaration order breaking ties.
    fn match_alternatives(&self, node: &Node, input: &str) -> Result<Vec<RawMatch>, Error> {
        let mut candidates = Vec::new();
        for child in node.children() {
            match self.match_node(child, input) {
                Ok(raw) => candidates.push(raw),
                // An undefined rule is an authoring error, not a
                // non-matching alternative.
                Err(e @ Error::RuleNotFound { .. }) => return Err(e),
                Err(_) => {}
            }
        }
        if candidates.is_empty() {
            return Err(Error::NoMatchingAlternative {
                value: input.to_string(),
                span: Some(node.span()),
            });
        }
        candidates.sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        Ok(candidates)
    }

    fn match_sequence(&self, children: &[Node], input: &str) -> Result<RawMatch, Error> {
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut consumed = 0;
        let mut pending: Option<Retry> = None;

        while attempts.len() < children.len() {
            let child = &children[attempts.len()];
            let rest = &input[consumed..];
            let retry = pending.take();

            let outcome = if !child.has_default_repeats() {
                let cap = match retry {
                    Some(Retry::Cap(cap)) => Some(cap),
                    _ => None,
                };
                self.match_repetition(child, rest, cap)
                    .map(|(raw, count)| Attempt::Rep { raw, count })
            } else if matches!(child.kind(), NodeKind::Alternation(_)) {
                match retry {
                    Some(Retry::Alt { candidates, index }) => Ok(Attempt::Alt {
                        candidates,
                        chosen: index,
                    }),
                    _ => self.match_alternatives(child, rest).map(|candidates| {
                        Attempt::Alt {
                            candidates,
                            chosen: 0,
                        }
                    }),
                }
            } else {
                self.match_inner(child, rest).map(Attempt::Plain)
            };

            match outcome {
                Ok(attempt) => {
                    consumed += attempt.text_len();
                    attempts.push(attempt);
                }
                Err(e @ Error::RuleNotFound { .. }) => return Err(e),
                Err(e) => match backtrack_point(&attempts, children) {
                    Some((index, retry)) => {
                        attempts.truncate(index);
                        consumed = attempts.iter().map(Attempt::text_len).sum();
                        pending = Some(retry);
                    }
                    None => {
                        return Err(if rest.is_empty() {
                            exhausted_input_error(child, e)
                        } else {
                            e
                        });
                    }
                },
            }
        }

        Ok(combine(
            attempts.into_iter().map(Attempt::into_raw).collect(),
        ))
    }
}

/// Nearest prior element that can be revisited: an alternation with a
/// lower-ranked candidate left, or a repetition still above its minimum.
fn backtrack_point(attempts: &[Attempt], children: &[Node]) -> Option<(usize, Retry)> {
    for index in (0..attempts.len()).rev() {
        match &attempts[index] {
            Attempt::Alt { candidates, chosen } if chosen + 1 < candidates.len() => {
                return Some((
                    index,
                    Retry::Alt {
                        candidates: candidates.clone(),
                        index: chosen + 1,
                    },
                ));
            }
            Attempt::Rep { count, .. } if *count > children[index].min_repeats() => {
                return Some((index, Retry::Cap(count - 1)));
            }
            _ => {}
        }
    }
    None
}

/// The sequence ran out of input before a required element and no backtrack
/// point remains.
fn exhausted_input_error(child: &Node, error: Error) -> Error {
    match child.kind() {
        NodeKind::RuleRef(name) => Error::MissingRuleValue {
            rule: Some(standardize_rule_name(name)),
            suppressible: true,
            span: Some(child.span()),
        },
        _ => match error {
            e @ (Error::NotEnoughOccurrences { .. }
            | Error::MissingRuleValue { .. }
            | Error::InputTooShort { .. }) => e,
            _ => Error::InputTooShort {
                value: String::new(),
                span: Some(child.span()),
            },
        },
    }
}
