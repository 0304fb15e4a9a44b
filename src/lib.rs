//! # ruleweave — ABNF grammar engine
//!
//! Compiles ABNF (RFC 5234) grammar text into rule lists of typed node
//! trees, then offers the two dual operations over them:
//!
//! - **matching**: decide whether (and how) an input string conforms to a
//!   named rule, producing a nested result annotated with sub-rule values;
//! - **unparsing**: synthesize a conforming string from caller-supplied
//!   values for the rule's named sub-rules.
//!
//! ## Example
//!
//! ```
//! use ruleweave::ValueMap;
//!
//! let grammar = ruleweave::compile(
//!     "greeting = \"hello\" SP name\n\
//!      name = 1*ALPHA",
//! )?;
//!
//! let m = grammar.match_rule("greeting", "hello world")?;
//! assert_eq!(m.get("name"), Some("world"));
//!
//! let mut values = ValueMap::new();
//! values.set("name", "rust");
//! assert_eq!(grammar.unparse_rule("greeting", &mut values)?, "hello rust");
//! # Ok::<(), ruleweave::Error>(())
//! ```
//!
//! ## Core rules
//!
//! References to the RFC 5234 primitives (ALPHA, DIGIT, SP, CRLF, ...) are
//! resolved through a process-wide rule list that must be initialized once
//! before matching; [`compile`] does so with the built-in core rules.
//! Embedders with their own primitives call
//! [`core_rules::set_core_rule_list`] first instead. Core-rule matches are
//! folded into their parent's matched text but never appear as entries in
//! the result tree.
//!
//! ## Concurrency
//!
//! Compiled grammars are immutable and all matcher/unparser traversal state
//! is call-scoped, so any number of match/unparse calls may run against the
//! same grammar concurrently.

pub mod core_rules;
pub mod error;
pub mod fastpath;
pub mod match_result;
pub mod matcher;
pub mod node;
mod parser;
pub mod rule;
pub mod rule_list;
pub mod unparser;

pub use error::{Error, Span};
pub use match_result::{MatchResult, MatchValueSource, RuleMatch};
pub use matcher::Matcher;
pub use node::{MaxRepeats, Node, NodeKind};
pub use rule::Rule;
pub use rule_list::{ResolvedRule, RuleList};
pub use unparser::{Unparser, ValueMap, ValueSource};

use std::sync::Arc;

/// Compile an ABNF grammar, bootstrapping the built-in core rules first.
pub fn compile(abnf: &str) -> Result<RuleList, Error> {
    core_rules::bootstrap()?;
    RuleList::compile(abnf)
}

/// Compile an ABNF grammar that may reference rules from `external`.
pub fn compile_with_external(abnf: &str, external: Arc<RuleList>) -> Result<RuleList, Error> {
    core_rules::bootstrap()?;
    RuleList::compile_with_external(abnf, external)
}
