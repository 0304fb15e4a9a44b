//! Grammar compilation tests: syntax (compile success/failure) and the
//! shape of the node trees the compiler produces.

use ruleweave::{compile, Error, MaxRepeats, NodeKind, RuleList};

// ==================== Syntax: valid grammars ====================

#[test]
fn compile_minimal_rule() {
    let grammar = compile("foo = \"bar\"").expect("compile");
    assert_eq!(grammar.len(), 1);
    let rule = grammar.rule("foo").expect("rule");
    assert_eq!(rule.name(), "foo");
    assert!(matches!(rule.root().kind(), NodeKind::Literal(text) if text == "bar"));
}

#[test]
fn compile_multiple_rules_in_order() {
    let grammar = compile(
        "first = \"a\"\n\
         second = \"b\"\n\
         third = \"c\"",
    )
    .expect("compile");
    let names: Vec<&str> = grammar.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert_eq!(grammar.first_rule().expect("first").name(), "first");
}

#[test]
fn compile_continuation_lines() {
    // More-indented lines continue the rule started above them.
    let grammar = compile(
        "foo = \"bar\"\n\
         \t/ \"baz\"\n\
         qux = \"qux\"",
    )
    .expect("compile");
    assert_eq!(grammar.len(), 2);
    let foo = grammar.rule("foo").expect("rule");
    assert!(matches!(foo.root().kind(), NodeKind::Alternation(children) if children.len() == 2));
}

#[test]
fn compile_skips_blank_and_comment_lines() {
    let grammar = compile(
        "; leading comment\n\
         \n\
         foo = \"bar\"\n\
         ; trailing comment\n\
         baz = \"baz\"",
    )
    .expect("compile");
    assert_eq!(grammar.len(), 2);
}

#[test]
fn compile_collects_rule_comments() {
    let grammar = compile("foo = \"bar\" ; the foo rule").expect("compile");
    let rule = grammar.rule("foo").expect("rule");
    assert_eq!(rule.comment(), Some("the foo rule"));
    assert_eq!(rule.definition(), "\"bar\"");
}

#[test]
fn semicolon_inside_quotes_is_not_a_comment() {
    let grammar = compile("foo = \"a;b\"").expect("compile");
    let rule = grammar.rule("foo").expect("rule");
    assert!(matches!(rule.root().kind(), NodeKind::Literal(text) if text == "a;b"));
    assert_eq!(rule.comment(), None);
}

#[test]
fn rule_names_normalize_case_and_hyphens() {
    let grammar = compile("Foo-Bar = \"x\"").expect("compile");
    assert_eq!(grammar.rule("foo_bar").expect("rule").name(), "foo_bar");
    assert!(grammar.get("FOO-BAR").is_some());
    assert!(grammar.get("foo_bar").is_some());
}

#[test]
fn angle_bracket_rule_references() {
    let grammar = compile(
        "foo = <bar>\n\
         bar = \"bar\"",
    )
    .expect("compile");
    let foo = grammar.rule("foo").expect("rule");
    assert!(matches!(foo.root().kind(), NodeKind::RuleRef(name) if name == "bar"));
}

#[test]
fn empty_quoted_string_is_allowed() {
    let grammar = compile("foo = \"\"").expect("compile");
    let rule = grammar.rule("foo").expect("rule");
    assert!(matches!(rule.root().kind(), NodeKind::Literal(text) if text.is_empty()));
}

// ==================== Node shapes: repeats and options ====================

#[test]
fn repeat_prefix_forms() {
    let cases: &[(&str, u64, MaxRepeats)] = &[
        ("foo = 3\"x\"", 3, MaxRepeats::Finite(3)),
        ("foo = *\"x\"", 0, MaxRepeats::Unbounded),
        ("foo = 1*\"x\"", 1, MaxRepeats::Unbounded),
        ("foo = *5\"x\"", 0, MaxRepeats::Finite(5)),
        ("foo = 2*4\"x\"", 2, MaxRepeats::Finite(4)),
    ];
    for (abnf, min, max) in cases {
        let grammar = compile(abnf).expect("compile");
        let root = grammar.rule("foo").expect("rule").root();
        assert_eq!(root.min_repeats(), *min, "{abnf}");
        assert_eq!(root.max_repeats(), *max, "{abnf}");
        assert!(matches!(root.kind(), NodeKind::Sequence(children) if children.len() == 1));
    }
}

#[test]
fn optional_marks_zero_min() {
    let grammar = compile("foo = [\"x\"]").expect("compile");
    let root = grammar.rule("foo").expect("rule").root();
    assert!(root.is_optional());
    assert_eq!(root.max_repeats(), MaxRepeats::Finite(1));
}

#[test]
fn repeat_applies_to_group() {
    let grammar = compile("foo = 2(\"a\" \"b\")").expect("compile");
    let root = grammar.rule("foo").expect("rule").root();
    assert_eq!(root.min_repeats(), 2);
    assert!(matches!(root.kind(), NodeKind::Sequence(children) if children.len() == 2));
}

#[test]
fn single_element_group_is_elided() {
    let grammar = compile("foo = (\"a\")").expect("compile");
    let root = grammar.rule("foo").expect("rule").root();
    assert!(matches!(root.kind(), NodeKind::Literal(text) if text == "a"));
}

#[test]
fn alternation_inside_group() {
    let grammar = compile("foo = (\"a\" / \"b\") \"c\"").expect("compile");
    let root = grammar.rule("foo").expect("rule").root();
    let children = root.children();
    assert_eq!(children.len(), 2);
    assert!(matches!(children[0].kind(), NodeKind::Alternation(alts) if alts.len() == 2));
}

// ==================== Node shapes: numerics ====================

#[test]
fn numeric_single_value() {
    let grammar = compile("sp = %x20").expect("compile");
    let root = grammar.rule("sp").expect("rule").root();
    assert!(matches!(
        root.kind(),
        NodeKind::NumericRange { start: 0x20, end: 0x20 }
    ));
}

#[test]
fn numeric_range_per_base() {
    for (abnf, start, end) in [
        ("r = %b0-1", 0, 1),
        ("r = %d48-57", 48, 57),
        ("r = %x41-5A", 0x41, 0x5A),
    ] {
        let grammar = compile(abnf).expect("compile");
        let root = grammar.rule("r").expect("rule").root();
        match root.kind() {
            NodeKind::NumericRange { start: s, end: e } => {
                assert_eq!((*s, *e), (start, end), "{abnf}");
            }
            other => panic!("expected range for {abnf}, got {other:?}"),
        }
    }
}

#[test]
fn numeric_dot_set() {
    let grammar = compile("crlf = %x0D.0A").expect("compile");
    let root = grammar.rule("crlf").expect("rule").root();
    assert!(matches!(root.kind(), NodeKind::NumericSet(codes) if codes == &[0x0D, 0x0A]));
}

#[test]
fn numeric_base_letter_is_case_insensitive() {
    let grammar = compile("sp = %X20").expect("compile");
    assert!(matches!(
        grammar.rule("sp").expect("rule").root().kind(),
        NodeKind::NumericRange { start: 0x20, .. }
    ));
}

#[test]
fn lowercase_hex_digits_accepted() {
    let grammar = compile("del = %x7f").expect("compile");
    assert!(matches!(
        grammar.rule("del").expect("rule").root().kind(),
        NodeKind::NumericRange { start: 0x7F, .. }
    ));
}

// ==================== Incremental alternatives ====================

#[test]
fn incremental_alternative_extends_rule() {
    let grammar = compile(
        "foo = bar\n\
         foo =/ baz\n\
         bar = \"bar\"\n\
         baz = \"baz\"",
    )
    .expect("compile");
    assert_eq!(grammar.len(), 3);
    let foo = grammar.rule("foo").expect("rule");
    match foo.root().kind() {
        NodeKind::Alternation(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[0].kind(), NodeKind::RuleRef(name) if name == "bar"));
            assert!(matches!(children[1].kind(), NodeKind::RuleRef(name) if name == "baz"));
        }
        other => panic!("expected alternation, got {other:?}"),
    }
    assert_eq!(foo.definition(), "bar / baz");
}

#[test]
fn incremental_alternative_onto_existing_alternation() {
    let grammar = compile(
        "foo = \"a\" / \"b\"\n\
         foo =/ \"c\"",
    )
    .expect("compile");
    let foo = grammar.rule("foo").expect("rule");
    assert!(matches!(foo.root().kind(), NodeKind::Alternation(children) if children.len() == 3));
}

#[test]
fn incremental_alternative_without_base_fails() {
    let err = compile("foo =/ \"a\"").expect_err("must fail");
    assert!(matches!(err, Error::MissingAlternativeBase { name } if name == "foo"));
}

// ==================== Syntax: invalid grammars ====================

#[test]
fn unbalanced_parentheses_fail() {
    assert!(matches!(
        compile("foo = (\"a\"").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn unbalanced_brackets_fail() {
    assert!(matches!(
        compile("foo = [\"a\"").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn unterminated_quote_fails() {
    assert!(matches!(
        compile("foo = \"bar").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn invalid_digit_for_base_fails() {
    assert!(matches!(
        compile("foo = %b012").expect_err("must fail"),
        Error::Grammar { .. }
    ));
    assert!(matches!(
        compile("foo = %d12A").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn unknown_base_fails() {
    assert!(matches!(
        compile("foo = %q12").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn rule_name_must_start_with_letter() {
    assert!(matches!(
        compile("1foo = \"a\"").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn missing_equals_fails() {
    assert!(matches!(
        compile("foo \"a\"").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn empty_definition_fails() {
    assert!(matches!(
        compile("foo =").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn trailing_alternative_separator_fails() {
    assert!(matches!(
        compile("foo = \"a\" /").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn inverted_repeat_range_fails() {
    assert!(matches!(
        compile("foo = 5*2\"a\"").expect_err("must fail"),
        Error::Grammar { .. }
    ));
}

#[test]
fn duplicate_rule_fails() {
    let err = compile(
        "foo = \"a\"\n\
         foo = \"b\"",
    )
    .expect_err("must fail");
    assert!(matches!(err, Error::DuplicateRule { name } if name == "foo"));
}

#[test]
fn empty_grammar_compiles_to_empty_list() {
    let grammar = compile("").expect("compile");
    assert!(grammar.is_empty());
    assert!(grammar.first_rule().is_none());
}

// ==================== Fixed values ====================

#[test]
fn fixed_values() {
    let grammar = compile(
        "lit = \"bar\"\n\
         single = %x20\n\
         set1 = %x41\n\
         range = %x41-5A\n\
         alt = \"a\" / \"b\"\n\
         seq = \"a\" \"b\"\n\
         rep = 2\"a\"",
    )
    .expect("compile");
    assert_eq!(grammar.rule("lit").unwrap().fixed_value().as_deref(), Some("bar"));
    assert_eq!(grammar.rule("single").unwrap().fixed_value().as_deref(), Some(" "));
    assert_eq!(grammar.rule("set1").unwrap().fixed_value().as_deref(), Some("A"));
    assert_eq!(grammar.rule("range").unwrap().fixed_value(), None);
    assert_eq!(grammar.rule("alt").unwrap().fixed_value(), None);
    assert_eq!(grammar.rule("seq").unwrap().fixed_value(), None);
    assert_eq!(grammar.rule("rep").unwrap().fixed_value(), None);
}

// ==================== Lookup and core rules ====================

#[test]
fn rule_lookup_is_insensitive() {
    let grammar = compile("Foo-Bar = \"x\"").expect("compile");
    assert!(grammar.rule("FOO_BAR").is_ok());
    assert!(grammar.rule("foo-bar").is_ok());
    let err = grammar.rule("missing").expect_err("missing");
    assert!(matches!(err, Error::RuleNotFound { name, .. } if name == "missing"));
}

#[test]
fn core_rule_names_are_reserved_when_uppercase() {
    compile("seed = \"x\"").expect("compile bootstraps the core rules");
    assert!(ruleweave::core_rules::is_core_rule_name("ALPHA"));
    assert!(ruleweave::core_rules::is_core_rule_name("CRLF"));
    assert!(!ruleweave::core_rules::is_core_rule_name("alpha"));
    assert!(!ruleweave::core_rules::is_core_rule_name("NOSUCH"));
}

#[test]
fn core_list_cannot_be_replaced_once_set() {
    compile("seed = \"x\"").expect("compile bootstraps the core rules");
    let replacement = RuleList::compile("sp = %x20").expect("compile");
    assert!(matches!(
        ruleweave::core_rules::set_core_rule_list(replacement),
        Err(Error::CoreAlreadyInitialized)
    ));
}
