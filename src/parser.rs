//! Parse an ABNF rule definition body into a node tree using PEST.
//!
//! The grammar in `grammar.pest` covers the right-hand side of one rule
//! (`name = <this part>`); rule headers, comments, and line continuations
//! are handled by [`crate::rule`] before the text reaches this module.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::error::{Error, Span};
use crate::node::{MaxRepeats, Node, NodeKind};

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DefinitionParser;

/// Parse one rule definition body (the text after `=`) into a node tree.
pub(crate) fn parse_definition(definition: &str) -> Result<Node, Error> {
    let mut pairs = DefinitionParser::parse(Rule::definition, definition)
        .map_err(|e| Error::Grammar {
            message: e.to_string(),
        })?;
    let root = pairs.next().ok_or_else(|| Error::Grammar {
        message: format!("empty definition: {definition:?}"),
    })?;
    let alternation = root
        .into_inner()
        .find(|p| p.as_rule() == Rule::alternation)
        .ok_or_else(|| Error::Grammar {
            message: format!("empty definition: {definition:?}"),
        })?;
    build_alternation(alternation)
}

fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let span = pair.as_span();
    Span::new(span.start(), span.end() - span.start())
}

fn build_alternation(pair: Pair<'_, Rule>) -> Result<Node, Error> {
    let span = span_of(&pair);
    let mut children = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::concatenation {
            children.push(build_concatenation(inner)?);
        }
    }
    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Ok(Node::new(NodeKind::Alternation(children), span))
    }
}

fn build_concatenation(pair: Pair<'_, Rule>) -> Result<Node, Error> {
    let span = span_of(&pair);
    let mut children = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::repetition {
            children.push(build_repetition(inner)?);
        }
    }
    // A lone element needs no sequence wrapper around it.
    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Ok(Node::new(NodeKind::Sequence(children), span))
    }
}

fn build_repetition(pair: Pair<'_, Rule>) -> Result<Node, Error> {
    let span = span_of(&pair);
    let mut prefix = None;
    let mut element = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::repeat_prefix => prefix = Some(inner),
            Rule::element => element = Some(inner),
            _ => {}
        }
    }
    let element = element.ok_or_else(|| Error::Grammar {
        message: "repetition without an element".to_string(),
    })?;
    let node = build_element(element)?;
    match prefix {
        None => Ok(node),
        Some(prefix) => {
            let (min, max) = parse_repeat(prefix.as_str())?;
            Ok(apply_repeats(node, min, max, span))
        }
    }
}

/// `N`, `*`, `N*`, `*M`, or `N*M`.
fn parse_repeat(text: &str) -> Result<(u64, MaxRepeats), Error> {
    let parse = |digits: &str| {
        digits.parse::<u64>().map_err(|_| Error::Grammar {
            message: format!("invalid repeat count: {text}"),
        })
    };
    match text.find('*') {
        Some(star) => {
            let min = if star == 0 { 0 } else { parse(&text[..star])? };
            let max = if star + 1 == text.len() {
                MaxRepeats::Unbounded
            } else {
                MaxRepeats::Finite(parse(&text[star + 1..])?)
            };
            if let MaxRepeats::Finite(max) = max {
                if min > max {
                    return Err(Error::Grammar {
                        message: format!("invalid repeat range: {text}"),
                    });
                }
            }
            Ok((min, max))
        }
        None => {
            let count = parse(text)?;
            Ok((count, MaxRepeats::Finite(count)))
        }
    }
}

/// Put a repeat range on `node`. Only sequence nodes carry ranges, so
/// anything else gets a single-child wrapper.
fn apply_repeats(node: Node, min: u64, max: MaxRepeats, span: Span) -> Node {
    if matches!(node.kind(), NodeKind::Sequence(_)) && node.has_default_repeats() {
        let mut node = node;
        node.set_repeats(min, max);
        node
    } else {
        let mut wrapper = Node::new(NodeKind::Sequence(vec![node]), span);
        wrapper.set_repeats(min, max);
        wrapper
    }
}

fn build_element(pair: Pair<'_, Rule>) -> Result<Node, Error> {
    let inner = pair.into_inner().next().ok_or_else(|| Error::Grammar {
        message: "empty element".to_string(),
    })?;
    match inner.as_rule() {
        Rule::group => {
            let alternation = expect_inner(inner, Rule::alternation)?;
            build_alternation(alternation)
        }
        Rule::option => {
            let span = span_of(&inner);
            let alternation = expect_inner(inner, Rule::alternation)?;
            let node = build_alternation(alternation)?;
            Ok(make_optional(node, span))
        }
        Rule::char_val => {
            let span = span_of(&inner);
            let text = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::char_val_inner)
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(Node::new(NodeKind::Literal(text), span))
        }
        Rule::num_val => build_numeric(inner),
        Rule::rule_ref => {
            let span = span_of(&inner);
            let name = expect_inner(inner, Rule::rule_name)?;
            Ok(Node::new(
                NodeKind::RuleRef(name.as_str().replace('-', "_")),
                span,
            ))
        }
        other => Err(Error::Grammar {
            message: format!("unhandled element: {other:?}"),
        }),
    }
}

/// `[...]` content matches zero or one time.
fn make_optional(node: Node, span: Span) -> Node {
    if matches!(node.kind(), NodeKind::Sequence(_)) && node.has_default_repeats() {
        let mut node = node;
        node.set_repeats(0, MaxRepeats::Finite(1));
        node
    } else {
        let mut wrapper = Node::new(NodeKind::Sequence(vec![node]), span);
        wrapper.set_repeats(0, MaxRepeats::Finite(1));
        wrapper
    }
}

fn build_numeric(pair: Pair<'_, Rule>) -> Result<Node, Error> {
    let span = span_of(&pair);
    let value = pair.into_inner().next().ok_or_else(|| Error::Grammar {
        message: "empty numeric value".to_string(),
    })?;
    let radix = match value.as_rule() {
        Rule::bin_val => 2,
        Rule::dec_val => 10,
        Rule::hex_val => 16,
        other => {
            return Err(Error::Grammar {
                message: format!("unhandled numeric base: {other:?}"),
            })
        }
    };
    let is_range = value.as_str().contains('-');
    let raw = value.as_str().to_string();
    let mut codes = Vec::new();
    for digits in value.into_inner() {
        if matches!(
            digits.as_rule(),
            Rule::bin_num | Rule::dec_num | Rule::hex_num
        ) {
            let code = u32::from_str_radix(digits.as_str(), radix).map_err(|_| Error::Grammar {
                message: format!("numeric value out of range: %{raw}"),
            })?;
            codes.push(code);
        }
    }
    let kind = if is_range {
        match codes.as_slice() {
            [start, end] if start <= end => NodeKind::NumericRange {
                start: *start,
                end: *end,
            },
            _ => {
                return Err(Error::Grammar {
                    message: format!("invalid numeric range: %{raw}"),
                })
            }
        }
    } else if codes.is_empty() {
        return Err(Error::Grammar {
            message: format!("invalid numeric value: %{raw}"),
        });
    } else if codes.len() == 1 {
        NodeKind::NumericRange {
            start: codes[0],
            end: codes[0],
        }
    } else {
        NodeKind::NumericSet(codes)
    };
    Ok(Node::new(kind, span))
}

fn expect_inner(pair: Pair<'_, Rule>, rule: Rule) -> Result<Pair<'_, Rule>, Error> {
    let description = format!("{:?}", pair.as_rule());
    pair.into_inner()
        .find(|p| p.as_rule() == rule)
        .ok_or_else(|| Error::Grammar {
            message: format!("malformed {description}"),
        })
}
