//! The process-wide core-rule grammar (RFC 5234 appendix B.1).
//!
//! ABNF's primitives (ALPHA, DIGIT, CRLF, ...) are themselves written in
//! ABNF — a bootstrap cycle the engine breaks with a write-once,
//! read-afterwards rule list held outside any particular grammar.
//! Initialization is an explicit step: call [`bootstrap`] (or install a
//! custom list with [`set_core_rule_list`]) once, before matching grammars
//! that reference core rules. [`crate::compile`] bootstraps for you.
//!
//! All-uppercase references to names defined here are reserved: they
//! resolve against this list even when a grammar defines the same name
//! locally, and they are elided from match result trees.

use once_cell::sync::OnceCell;

use crate::error::Error;
use crate::rule_list::{ResolvedRule, RuleList};

/// The core rules as distributed in RFC 5234 appendix B.1.
pub const CORE_RULES_ABNF: &str = "\
ALPHA = %x41-5A / %x61-7A ; A-Z / a-z
BIT = \"0\" / \"1\"
CHAR = %x01-7F ; any 7-bit US-ASCII character, excluding NUL
CR = %x0D ; carriage return
CRLF = CR LF ; Internet standard newline
CTL = %x00-1F / %x7F ; controls
DIGIT = %x30-39 ; 0-9
DQUOTE = %x22 ; double quote
HEXDIG = DIGIT / \"A\" / \"B\" / \"C\" / \"D\" / \"E\" / \"F\"
HTAB = %x09 ; horizontal tab
LF = %x0A ; linefeed
LWSP = *(WSP / CRLF WSP) ; linear white space past newline
OCTET = %x00-FF ; 8 bits of data
SP = %x20 ; space
VCHAR = %x21-7E ; visible printing characters
WSP = SP / HTAB ; white space
";

static CORE: OnceCell<RuleList> = OnceCell::new();

/// Install the core rule list. Must happen at most once per process;
/// errors if a list is already installed.
pub fn set_core_rule_list(rule_list: RuleList) -> Result<(), Error> {
    CORE.set(rule_list).map_err(|_| Error::CoreAlreadyInitialized)
}

/// The installed core rule list, if any.
pub fn core_rule_list() -> Option<&'static RuleList> {
    CORE.get()
}

/// Compile the built-in core rules into the singleton if none is installed
/// yet, and return it.
pub fn bootstrap() -> Result<&'static RuleList, Error> {
    CORE.get_or_try_init(|| RuleList::compile(CORE_RULES_ABNF))
}

/// Whether `name`, as written in a grammar, is reserved for a core rule:
/// all-uppercase and defined by the installed core rule list.
pub fn is_core_rule_name(name: &str) -> bool {
    reserved(name).is_some()
}

pub(crate) fn reserved(name: &str) -> Option<ResolvedRule<'static>> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return None;
    }
    let grammar = CORE.get()?;
    let rule = grammar.get(name)?;
    Some(ResolvedRule {
        grammar,
        rule,
        from_core: true,
    })
}
