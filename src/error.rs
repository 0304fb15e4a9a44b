//! Error taxonomy shared by grammar compilation, matching, and unparsing.
//!
//! Every match/unparse failure carries the offending value and, when it
//! originated at a specific point in a rule definition, a [`Span`] into that
//! rule's source text; [`annotate`] renders the usual line + caret pointer.

use std::fmt;

/// Byte range into the owning rule's definition text. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rule <{name}> not found")]
    RuleNotFound { name: String, span: Option<Span> },

    #[error("invalid value for quoted string (expected \"{expected}\" but got \"{actual}\")")]
    InvalidQuotedString {
        expected: String,
        actual: String,
        span: Option<Span>,
    },

    #[error("numeric value out of range (expected {}-{}, got \"{}\")", FmtCode(.start), FmtCode(.end), .actual)]
    NumericValueOutOfRange {
        start: u32,
        end: u32,
        actual: String,
        span: Option<Span>,
    },

    #[error("numeric value mismatch (expected {}, got \"{}\")", FmtCodes(.expected), .actual)]
    NumericValueMismatch {
        expected: Vec<u32>,
        actual: String,
        span: Option<Span>,
    },

    #[error("input ended before the grammar was satisfied (remaining \"{value}\")")]
    InputTooShort { value: String, span: Option<Span> },

    #[error("input continues past the end of the grammar (matched \"{matched}\" of \"{value}\")")]
    InputTooLong {
        matched: String,
        value: String,
        span: Option<Span>,
    },

    #[error("not enough occurrences of repeating clause (expected {expected}, got {actual}, using value \"{value}\")")]
    NotEnoughOccurrences {
        expected: u64,
        actual: u64,
        value: String,
        span: Option<Span>,
    },

    #[error("no matching alternative for value \"{value}\"")]
    NoMatchingAlternative { value: String, span: Option<Span> },

    #[error("invalid value \"{value}\" for rule <{rule}>")]
    InvalidRuleValue {
        rule: String,
        value: String,
        span: Option<Span>,
        #[source]
        source: Box<Error>,
    },

    #[error("must supply a value for rule <{}>", .rule.as_deref().unwrap_or("(anonymous)"))]
    MissingRuleValue {
        rule: Option<String>,
        /// Whether an enclosing optional slot may swallow this error.
        /// False once the error has crossed a caller's value-source boundary.
        suppressible: bool,
        span: Option<Span>,
    },

    #[error("circular reference to rule <{name}>")]
    CircularRuleReference { name: String },

    #[error("invalid ABNF grammar: {message}")]
    Grammar { message: String },

    #[error("duplicate definition of rule <{name}>")]
    DuplicateRule { name: String },

    #[error("incremental alternative for rule <{name}> has no prior definition")]
    MissingAlternativeBase { name: String },

    #[error("core rule list already initialized")]
    CoreAlreadyInitialized,
}

impl Error {
    /// The definition span this error points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::RuleNotFound { span, .. }
            | Error::InvalidQuotedString { span, .. }
            | Error::NumericValueOutOfRange { span, .. }
            | Error::NumericValueMismatch { span, .. }
            | Error::InputTooShort { span, .. }
            | Error::InputTooLong { span, .. }
            | Error::NotEnoughOccurrences { span, .. }
            | Error::NoMatchingAlternative { span, .. }
            | Error::InvalidRuleValue { span, .. }
            | Error::MissingRuleValue { span, .. } => *span,
            _ => None,
        }
    }

    pub fn is_suppressible_missing_value(&self) -> bool {
        matches!(
            self,
            Error::MissingRuleValue {
                suppressible: true,
                ..
            }
        )
    }

    /// Render this error against the rule source it points into:
    /// the offending line followed by a caret marker.
    pub fn annotate(&self, source: &str) -> String {
        match self.span() {
            Some(span) => format!("{}\n{}", self, annotate(source, span)),
            None => self.to_string(),
        }
    }
}

/// Point at `span` within `source`: the containing line, then a caret line.
pub fn annotate(source: &str, span: Span) -> String {
    let mut line_start = 0;
    for line in source.split_inclusive('\n') {
        let line_end = line_start + line.len();
        if span.start < line_end || line_end == source.len() {
            let text = line.trim_end_matches(['\r', '\n']);
            let col = span.start.saturating_sub(line_start).min(text.len());
            let width = span.len.max(1).min(text.len().saturating_sub(col).max(1));
            return format!("{}\n{}{}", text, " ".repeat(col), "^".repeat(width));
        }
        line_start = line_end;
    }
    String::new()
}

struct FmtCode<'a>(&'a u32);

impl fmt::Display for FmtCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%x{:02X}", self.0)
    }
}

struct FmtCodes<'a>(&'a [u32]);

impl fmt::Display for FmtCodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "%x{:02X}", code)?;
        }
        Ok(())
    }
}
