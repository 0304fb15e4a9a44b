//! Match results: the nested tree of rule values a successful match
//! produces, plus a cursor-style value source for feeding a result back
//! through the unparser.

use std::collections::HashMap;

use crate::error::Error;
use crate::matcher::{entry_rules, RawMatch};
use crate::rule::standardize_rule_name;
use crate::unparser::ValueSource;

/// One named rule's contribution to a match: the text it consumed and the
/// named sub-matches inside it. Core-rule matches never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    name: String,
    text: String,
    rules: Vec<RuleMatch>,
}

impl RuleMatch {
    pub(crate) fn new(name: String, text: String, rules: Vec<RuleMatch>) -> RuleMatch {
        RuleMatch { name, text, rules }
    }

    /// Normalized name of the matched rule.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matched_text(&self) -> &str {
        &self.text
    }

    pub fn sub_matches(&self) -> &[RuleMatch] {
        &self.rules
    }
}

/// The outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    text: String,
    rules: Vec<RuleMatch>,
}

impl MatchResult {
    pub(crate) fn from_raw(raw: RawMatch) -> MatchResult {
        let text = raw.text.clone();
        let rules = entry_rules(raw);
        MatchResult { text, rules }
    }

    /// The input text the rule consumed.
    pub fn matched_text(&self) -> &str {
        &self.text
    }

    /// Top-level named sub-matches, in input order.
    pub fn sub_matches(&self) -> &[RuleMatch] {
        &self.rules
    }

    /// The first value captured for `name` anywhere in the result tree.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = standardize_rule_name(name);
        fn walk<'a>(rules: &'a [RuleMatch], key: &str) -> Option<&'a str> {
            for rule in rules {
                if rule.name == key {
                    return Some(&rule.text);
                }
                if let Some(found) = walk(&rule.rules, key) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.rules, &key)
    }

    /// Every value captured for `name`, in match order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let key = standardize_rule_name(name);
        let mut out = Vec::new();
        fn walk<'a>(rules: &'a [RuleMatch], key: &str, out: &mut Vec<&'a str>) {
            for rule in rules {
                if rule.name == key {
                    out.push(&rule.text);
                }
                walk(&rule.rules, key, out);
            }
        }
        walk(&self.rules, &key, &mut out);
        out
    }

    /// A value source that replays this result's rule values in match
    /// order, so a match can be unparsed straight back into text.
    pub fn value_source(&self) -> MatchValueSource {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        fn walk(rules: &[RuleMatch], values: &mut HashMap<String, Vec<String>>) {
            for rule in rules {
                values
                    .entry(rule.name.clone())
                    .or_default()
                    .push(rule.text.clone());
                walk(&rule.rules, values);
            }
        }
        walk(&self.rules, &mut values);
        MatchValueSource {
            values,
            cursors: HashMap::new(),
        }
    }
}

/// Sequential value source over a match result: each request for a rule
/// name yields that rule's next captured value, regardless of the supplied
/// occurrence index.
#[derive(Debug, Clone)]
pub struct MatchValueSource {
    values: HashMap<String, Vec<String>>,
    cursors: HashMap<String, usize>,
}

impl ValueSource for MatchValueSource {
    fn value_for(&mut self, rule_name: &str, _occurrence: usize) -> Result<Option<String>, Error> {
        let key = standardize_rule_name(rule_name);
        let cursor = self.cursors.entry(key.clone()).or_insert(0);
        let value = self
            .values
            .get(&key)
            .and_then(|values| values.get(*cursor))
            .cloned();
        if value.is_some() {
            *cursor += 1;
        }
        Ok(value)
    }
}
