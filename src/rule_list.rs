//! An ordered collection of rules compiled from one ABNF grammar.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core_rules;
use crate::error::Error;
use crate::match_result::MatchResult;
use crate::matcher::Matcher;
use crate::rule::{standardize_rule_name, Rule};
use crate::unparser::{Unparser, ValueSource};

/// A rule together with the grammar that owns it. References inside the
/// rule resolve against `grammar`, which may differ from the list the
/// lookup started at (external delegation, reserved core rules).
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRule<'a> {
    pub grammar: &'a RuleList,
    pub rule: &'a Rule,
    pub from_core: bool,
}

/// A compiled grammar: rules in definition order, unique by normalized
/// name, with optional delegation to an externally supplied list for names
/// not defined locally.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
    external: Option<Arc<RuleList>>,
}

impl RuleList {
    /// Compile an ABNF grammar.
    pub fn compile(abnf: &str) -> Result<RuleList, Error> {
        Self::build(abnf, None)
    }

    /// Compile an ABNF grammar that may reference rules from `external`.
    pub fn compile_with_external(abnf: &str, external: Arc<RuleList>) -> Result<RuleList, Error> {
        Self::build(abnf, Some(external))
    }

    fn build(abnf: &str, external: Option<Arc<RuleList>>) -> Result<RuleList, Error> {
        let mut list = RuleList {
            rules: Vec::new(),
            by_name: HashMap::new(),
            external,
        };
        for group in line_groups(abnf) {
            let rule = Rule::from_lines(&group)?;
            if rule.is_incremental() {
                list.merge_incremental(rule)?;
            } else {
                list.insert(rule)?;
            }
        }
        Ok(list)
    }

    fn insert(&mut self, rule: Rule) -> Result<(), Error> {
        if self.by_name.contains_key(rule.name()) {
            return Err(Error::DuplicateRule {
                name: rule.name().to_string(),
            });
        }
        self.by_name
            .insert(rule.name().to_string(), self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    fn merge_incremental(&mut self, rule: Rule) -> Result<(), Error> {
        let index =
            self.by_name
                .get(rule.name())
                .copied()
                .ok_or_else(|| Error::MissingAlternativeBase {
                    name: rule.name().to_string(),
                })?;
        self.rules[index].merge_alternative(rule);
        Ok(())
    }

    /// Locally defined rule, if any. Lookup is case- and
    /// hyphen/underscore-insensitive.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        let key = standardize_rule_name(name);
        self.by_name.get(&key).map(|&index| &self.rules[index])
    }

    /// Look the name up locally, then through the external chain.
    pub fn rule(&self, name: &str) -> Result<&Rule, Error> {
        self.find(name).ok_or_else(|| Error::RuleNotFound {
            name: standardize_rule_name(name),
            span: None,
        })
    }

    fn find(&self, name: &str) -> Option<&Rule> {
        self.get(name)
            .or_else(|| self.external.as_ref().and_then(|e| e.find(name)))
    }

    /// Resolve a rule reference the way the matcher and unparser see one:
    /// all-uppercase core names are reserved and resolve against the
    /// process-wide core rules, then the local list, then the external
    /// chain.
    pub fn resolve(&self, name: &str) -> Result<ResolvedRule<'_>, Error> {
        if let Some(resolved) = core_rules::reserved(name) {
            return Ok(resolved);
        }
        self.resolve_chain(name)
            .ok_or_else(|| Error::RuleNotFound {
                name: standardize_rule_name(name),
                span: None,
            })
    }

    fn resolve_chain(&self, name: &str) -> Option<ResolvedRule<'_>> {
        if let Some(rule) = self.get(name) {
            return Some(ResolvedRule {
                grammar: self,
                rule,
                from_core: false,
            });
        }
        self.external.as_ref().and_then(|e| e.resolve_chain(name))
    }

    /// The first rule defined in the grammar text.
    pub fn first_rule(&self) -> Option<&Rule> {
        self.rules.first()
    }

    /// Rules in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Match `input` against the named rule; the whole input must conform.
    pub fn match_rule(&self, name: &str, input: &str) -> Result<MatchResult, Error> {
        let resolved = self.resolve(name)?;
        Matcher::new(resolved.grammar).match_rule(resolved.rule, input, false)
    }

    /// Longest-prefix variant of [`match_rule`](RuleList::match_rule).
    pub fn match_rule_partial(&self, name: &str, input: &str) -> Result<MatchResult, Error> {
        let resolved = self.resolve(name)?;
        Matcher::new(resolved.grammar).match_rule(resolved.rule, input, true)
    }

    /// Safe entry point: `None` on any match failure instead of an error.
    pub fn try_match_rule(&self, name: &str, input: &str) -> Option<MatchResult> {
        self.match_rule(name, input).ok()
    }

    /// Unparse the named rule, pulling rule values from `source`.
    pub fn unparse_rule(&self, name: &str, source: &mut dyn ValueSource) -> Result<String, Error> {
        let resolved = self.resolve(name)?;
        Unparser::new(resolved.grammar).unparse(resolved.rule, source)
    }
}

/// Group grammar lines into one group per rule: a line at the same or
/// lesser indentation than the current rule's first line starts a new rule,
/// deeper lines continue it. Blank lines and comment-only lines between
/// rules are skipped.
fn line_groups(abnf: &str) -> Vec<Vec<&str>> {
    let mut groups = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut base_indent = None;
    for line in abnf.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        match base_indent {
            Some(base) if indent > base => current.push(line),
            _ => {
                if line.trim_start().starts_with(';') {
                    continue;
                }
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current.push(line);
                base_indent = Some(indent);
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
