//! A named, compiled ABNF rule: one `name = elements` statement.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::{Error, Span};
use crate::fastpath;
use crate::node::Node;
use crate::parser;
use crate::rule_list::RuleList;

/// Normalize a rule name for lookups: ASCII lowercase, hyphens to
/// underscores. ABNF names are case-insensitive and hyphenated; value
/// sources and result accessors see the normalized form.
pub fn standardize_rule_name(name: &str) -> String {
    name.trim().replace('-', "_").to_ascii_lowercase()
}

#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    root: Node,
    definition: String,
    comment: Option<String>,
    incremental: bool,
    regex: OnceCell<Regex>,
}

impl Rule {
    /// Compile one rule from its line group: the defining line plus any
    /// more-indented continuation lines.
    pub fn from_lines(lines: &[&str]) -> Result<Rule, Error> {
        let mut comments = Vec::new();
        let mut stripped = Vec::new();
        for line in lines {
            let (text, comment) = split_comment(line);
            if let Some(comment) = comment {
                if !comment.is_empty() {
                    comments.push(comment);
                }
            }
            stripped.push(text);
        }
        let text = stripped.join(" ");
        let statement = text.trim();
        let equals = statement.find('=').ok_or_else(|| Error::Grammar {
            message: format!("invalid ABNF definition: {statement}"),
        })?;
        let name = statement[..equals].trim();
        validate_rule_name(name)?;
        let rest = &statement[equals + 1..];
        let (incremental, definition) = match rest.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let definition = definition.trim().to_string();
        if definition.is_empty() {
            return Err(Error::Grammar {
                message: format!("invalid ABNF definition: {statement}"),
            });
        }
        let root = parser::parse_definition(&definition)?;
        Ok(Rule {
            name: standardize_rule_name(name),
            root,
            definition,
            comment: if comments.is_empty() {
                None
            } else {
                Some(comments.join(" "))
            },
            incremental,
            regex: OnceCell::new(),
        })
    }

    /// Compile a single standalone `name = elements` string.
    pub fn from_definition(statement: &str) -> Result<Rule, Error> {
        let lines: Vec<&str> = statement.lines().collect();
        Rule::from_lines(&lines)
    }

    /// Normalized rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the compiled node tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Definition text the node spans index into (comments stripped,
    /// continuations joined; incremental alternatives appended).
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Text gathered from `;` comments on the defining lines.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub(crate) fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// The one string this rule can produce, when fully determined at
    /// compile time (e.g. `SP = %x20`). The unparser substitutes it when the
    /// caller supplies no value.
    pub fn fixed_value(&self) -> Option<String> {
        self.root.fixed_value()
    }

    /// Merge a `rule =/ alternative` definition into this rule.
    pub(crate) fn merge_alternative(&mut self, other: Rule) {
        let offset = self.definition.len() + 3;
        let mut alternative = other.root;
        alternative.shift_spans(offset);
        self.definition.push_str(" / ");
        self.definition.push_str(&other.definition);
        if let Some(comment) = other.comment {
            match &mut self.comment {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(&comment);
                }
                None => self.comment = Some(comment),
            }
        }
        let span = Span::new(0, self.definition.len());
        self.root.push_alternative(alternative, span);
        self.regex = OnceCell::new();
    }

    /// Render a caret pointer for `span` against this rule's definition.
    pub fn annotate(&self, span: Span) -> String {
        crate::error::annotate(&self.definition, span)
    }

    /// The compiled regex equivalent of this rule (anchored, built once and
    /// cached). Fails with [`Error::CircularRuleReference`] for recursive
    /// rules, which only the tree matcher can handle.
    pub fn regex(&self, grammar: &RuleList) -> Result<&Regex, Error> {
        self.regex.get_or_try_init(|| {
            let pattern = fastpath::rule_pattern(self, grammar)?;
            Regex::new(&pattern).map_err(|e| Error::Grammar {
                message: format!(
                    "generated pattern for rule <{}> failed to compile: {e}",
                    self.name
                ),
            })
        })
    }

    /// The regex pattern for this rule without compiling or caching it.
    pub fn regex_pattern(&self, grammar: &RuleList) -> Result<String, Error> {
        fastpath::rule_pattern(self, grammar)
    }

    /// Fast boolean conformance check through the regex path. Use the tree
    /// matcher when sub-rule values are needed.
    pub fn quick_match(&self, grammar: &RuleList, input: &str) -> Result<bool, Error> {
        Ok(self.regex(grammar)?.is_match(input))
    }
}

fn validate_rule_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::Grammar {
            message: format!(
                "invalid rule name: {name:?} (must start with a letter and contain only letters, digits, and hyphens)"
            ),
        })
    }
}

/// Split a line at the first `;` outside quoted strings.
fn split_comment(line: &str) -> (String, Option<String>) {
    let mut in_quotes = false;
    for (index, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                return (
                    line[..index].to_string(),
                    Some(line[index + 1..].trim().to_string()),
                );
            }
            _ => {}
        }
    }
    (line.to_string(), None)
}
