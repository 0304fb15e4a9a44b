//! Unparsing: walk a rule's node tree and synthesize a conforming string
//! from caller-supplied rule values. The structural dual of the matcher.

use std::collections::HashMap;

use crate::error::Error;
use crate::matcher::Matcher;
use crate::node::{Node, NodeKind};
use crate::rule::{standardize_rule_name, Rule};
use crate::rule_list::RuleList;

/// Source of values for named rules during unparsing.
///
/// `occurrence` counts, per normalized rule name, how many values have been
/// requested within one unparse call. Returning `Ok(None)` marks the value
/// absent: the unparser falls back to the rule's fixed value or raises a
/// suppressible [`Error::MissingRuleValue`]. Returning an error aborts the
/// walk; a `MissingRuleValue` error surfaced this way (e.g. from a nested
/// unparse composed inside the source) is re-marked non-suppressible so an
/// enclosing optional slot can never silently swallow it.
pub trait ValueSource {
    fn value_for(&mut self, rule_name: &str, occurrence: usize) -> Result<Option<String>, Error>;
}

impl<F> ValueSource for F
where
    F: FnMut(&str, usize) -> Option<String>,
{
    fn value_for(&mut self, rule_name: &str, occurrence: usize) -> Result<Option<String>, Error> {
        Ok(self(rule_name, occurrence))
    }
}

/// Static rule-name → values mapping. A value set with
/// [`set`](ValueMap::set) is a one-element list: it satisfies occurrence 0
/// and nothing after it.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    values: HashMap<String, Vec<String>>,
}

impl ValueMap {
    pub fn new() -> ValueMap {
        ValueMap::default()
    }

    /// Set a single value for `name`, replacing any previous values.
    pub fn set(&mut self, name: &str, value: impl ToString) -> &mut ValueMap {
        self.values
            .insert(standardize_rule_name(name), vec![value.to_string()]);
        self
    }

    /// Set one value per expected occurrence of `name`.
    pub fn set_all<I, V>(&mut self, name: &str, values: I) -> &mut ValueMap
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.values.insert(
            standardize_rule_name(name),
            values.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }
}

impl ValueSource for ValueMap {
    fn value_for(&mut self, rule_name: &str, occurrence: usize) -> Result<Option<String>, Error> {
        Ok(self
            .values
            .get(&standardize_rule_name(rule_name))
            .and_then(|values| values.get(occurrence))
            .cloned())
    }
}

/// Per-invocation unparse state: the value source, the per-rule occurrence
/// counters, and a flag recording whether the source came up empty during
/// the current repetition chunk.
struct UnparseCall<'s> {
    source: &'s mut dyn ValueSource,
    counts: HashMap<String, usize>,
    missed: bool,
}

impl UnparseCall<'_> {
    fn next_value(&mut self, rule_name: &str) -> Result<Option<String>, Error> {
        let occurrence = {
            let count = self.counts.entry(rule_name.to_string()).or_insert(0);
            let current = *count;
            *count += 1;
            current
        };
        match self.source.value_for(rule_name, occurrence) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                self.missed = true;
                Ok(None)
            }
            Err(Error::MissingRuleValue { rule, span, .. }) => Err(Error::MissingRuleValue {
                rule,
                suppressible: false,
                span,
            }),
            Err(e) => Err(e),
        }
    }
}

/// Unparses rules of one grammar. Stateless between calls.
pub struct Unparser<'g> {
    grammar: &'g RuleList,
}

impl<'g> Unparser<'g> {
    pub fn new(grammar: &'g RuleList) -> Unparser<'g> {
        Unparser { grammar }
    }

    /// Produce a string conforming to `rule`, pulling values from `source`.
    pub fn unparse(&self, rule: &Rule, source: &mut dyn ValueSource) -> Result<String, Error> {
        let mut call = UnparseCall {
            source,
            counts: HashMap::new(),
            missed: false,
        };
        self.unparse_node(rule.root(), &mut call)
    }

    fn unparse_node(&self, node: &Node, call: &mut UnparseCall<'_>) -> Result<String, Error> {
        if node.has_default_repeats() {
            self.unparse_inner(node, call)
        } else {
            self.unparse_repetition(node, call)
        }
    }

    fn unparse_inner(&self, node: &Node, call: &mut UnparseCall<'_>) -> Result<String, Error> {
        match node.kind() {
            NodeKind::Literal(text) => Ok(text.clone()),
            NodeKind::NumericRange { start, end } if start == end => text_for_codes(&[*start]),
            // Nothing decides which code point to emit for a multi-valued
            // range; the caller has to cover it through a named rule.
            NodeKind::NumericRange { .. } => Err(Error::MissingRuleValue {
                rule: None,
                suppressible: true,
                span: Some(node.span()),
            }),
            NodeKind::NumericSet(codes) => text_for_codes(codes),
            NodeKind::RuleRef(name) => self.unparse_rule_ref(node, name, call),
            NodeKind::Sequence(children) => {
                let mut out = String::new();
                for child in children {
                    out.push_str(&self.unparse_node(child, call)?);
                }
                Ok(out)
            }
            NodeKind::Alternation(children) => self.unparse_alternation(children, call),
        }
    }

    fn unparse_rule_ref(
        &self,
        node: &Node,
        name: &str,
        call: &mut UnparseCall<'_>,
    ) -> Result<String, Error> {
        let resolved = self.grammar.resolve(name).map_err(|e| match e {
            Error::RuleNotFound { name, .. } => Error::RuleNotFound {
                name,
                span: Some(node.span()),
            },
            other => other,
        })?;
        let value = match call.next_value(resolved.rule.name())? {
            Some(value) => value,
            None => {
                if let Some(fixed) = resolved.rule.fixed_value() {
                    return Ok(fixed);
                }
                return Err(Error::MissingRuleValue {
                    rule: Some(resolved.rule.name().to_string()),
                    suppressible: true,
                    span: Some(node.span()),
                });
            }
        };
        // Round-trip check: whatever the caller supplied must itself
        // conform to the referenced rule.
        match Matcher::new(resolved.grammar).match_rule(resolved.rule, &value, false) {
            Ok(_) => Ok(value),
            Err(e @ Error::RuleNotFound { .. }) => Err(e),
            Err(e) => Err(Error::InvalidRuleValue {
                rule: resolved.rule.name().to_string(),
                value,
                span: Some(node.span()),
                source: Box::new(e),
            }),
        }
    }

    fn unparse_repetition(&self, node: &Node, call: &mut UnparseCall<'_>) -> Result<String, Error> {
        let min = node.min_repeats();
        let limit = node.max_repeats().limit();
        let mut out = String::new();
        let mut produced = 0;
        let mut misses = 0;
        let mut last_error = None;
        while produced < limit {
            let outer_missed = call.missed;
            call.missed = false;
            let attempt = self.unparse_inner(node, call);
            let chunk_missed = call.missed;
            call.missed = outer_missed || chunk_missed;
            match attempt {
                Ok(chunk) => {
                    if chunk_missed {
                        misses += 1;
                        // Fixed-value fallbacks keep "succeeding" with no
                        // caller input; stop once the misses pass the
                        // minimum or an unbounded repetition never ends.
                        if misses > min {
                            break;
                        }
                    }
                    out.push_str(&chunk);
                    produced += 1;
                }
                Err(e) if e.is_suppressible_missing_value() => {
                    last_error = Some(e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if produced < min {
            return Err(last_error.unwrap_or(Error::MissingRuleValue {
                rule: None,
                suppressible: true,
                span: Some(node.span()),
            }));
        }
        Ok(out)
    }

    fn unparse_alternation(
        &self,
        children: &[Node],
        call: &mut UnparseCall<'_>,
    ) -> Result<String, Error> {
        let mut last_error = None;
        for child in children {
            match self.unparse_node(child, call) {
                Ok(out) => return Ok(out),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(Error::MissingRuleValue {
            rule: None,
            suppressible: true,
            span: None,
        }))
    }
}

fn text_for_codes(codes: &[u32]) -> Result<String, Error> {
    codes
        .iter()
        .map(|&code| {
            char::from_u32(code).ok_or_else(|| Error::Grammar {
                message: format!("code point %x{code:X} is not a valid character"),
            })
        })
        .collect()
}
