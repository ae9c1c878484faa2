use expect_test::{expect, Expect};

use super::*;
use crate::error::ErrorCode;

fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|tok| format!("{:?} '{}'\n", tok.kind, tok.literal)).collect()
}

fn check(input: &str, expect: Expect) {
    let (tokens, errors) = scan_source("test.ddp", input, Mode::default());
    assert!(errors.is_empty(), "unerwartete Diagnosen: {:?}", errors.diagnostics());
    expect.assert_eq(&render(&tokens));
}

#[test]
fn scan_integer_literal() {
    check(
        "42",
        expect![[r#"
            Int '42'
            Eof ''
        "#]],
    );
}

#[test]
fn scan_float_literal_with_comma() {
    check(
        "3,14",
        expect![[r#"
            Float '3,14'
            Eof ''
        "#]],
    );
}

#[test]
fn comma_without_digits_stays_a_comma() {
    check(
        "3, dann",
        expect![[r#"
            Int '3'
            Comma ','
            Dann 'dann'
            Eof ''
        "#]],
    );
}

#[test]
fn scan_variable_declaration() {
    check(
        "Die Zahl x ist 42.",
        expect![[r#"
            Die 'Die'
            Zahl 'Zahl'
            Identifier 'x'
            Ist 'ist'
            Int '42'
            Dot '.'
            Eof ''
        "#]],
    );
}

#[test]
fn scan_string_with_escape() {
    check(
        r#""a\nb""#,
        expect![[r#"
            String '"a\nb"'
            Eof ''
        "#]],
    );
}

#[test]
fn scan_char_literal_with_umlaut() {
    check(
        "'ä'",
        expect![[r#"
            Char ''ä''
            Eof ''
        "#]],
    );
}

#[test]
fn scan_nested_comment() {
    check(
        "[ kommentar [verschachtelt] weiter ] 1",
        expect![[r#"
            Comment '[ kommentar [verschachtelt] weiter ]'
            Int '1'
            Eof ''
        "#]],
    );
}

#[test]
fn keywords_are_case_insensitive() {
    check(
        "WENN wahr GLEICH Wahr",
        expect![[r#"
            Wenn 'WENN'
            Wahr 'wahr'
            Gleich 'GLEICH'
            Wahr 'Wahr'
            Eof ''
        "#]],
    );
}

#[test]
fn umlauts_are_identifier_characters() {
    check(
        "zähler größer_als straße",
        expect![[r#"
            Identifier 'zähler'
            Identifier 'größer_als'
            Identifier 'straße'
            Eof ''
        "#]],
    );
}

#[test]
fn alias_mode_scans_parameters() {
    let mut scanner = Scanner::for_alias("Schreibe die Zeile <wert>", "test.ddp");
    let tokens = scanner.scan_all();
    assert!(!scanner.errors.has_errors());
    expect![[r#"
        Identifier 'Schreibe'
        Die 'die'
        Identifier 'Zeile'
        AliasParameter '<wert>'
        Eof ''
    "#]]
    .assert_eq(&render(&tokens));
}

#[test]
fn indent_counts_four_space_groups_and_tabs() {
    let source = "Wenn wahr, dann:\n    Wiederhole 1 Mal:\n\t\tfoo.\n";
    let (tokens, errors) = scan_source("test.ddp", source, Mode::default());
    assert!(errors.is_empty());
    let wenn = tokens.iter().find(|t| t.kind == TokenKind::Wenn).unwrap();
    assert_eq!(wenn.indent, 0);
    let wiederhole = tokens.iter().find(|t| t.kind == TokenKind::Wiederhole).unwrap();
    assert_eq!(wiederhole.indent, 1);
    let foo = tokens.iter().find(|t| t.kind == TokenKind::Identifier).unwrap();
    assert_eq!(foo.indent, 2);
}

#[test]
fn positions_are_one_based() {
    let (tokens, _) = scan_source("test.ddp", "ab\ncd", Mode::default());
    assert_eq!(tokens[0].range.start.line, 1);
    assert_eq!(tokens[0].range.start.column, 1);
    assert_eq!(tokens[1].range.start.line, 2);
    assert_eq!(tokens[1].range.start.column, 1);
}

#[test]
fn unterminated_string_produces_illegal_token() {
    let (tokens, errors) = scan_source("test.ddp", "\"offen", Mode::default());
    assert_eq!(tokens[0].kind, TokenKind::Illegal);
    assert!(errors.has_errors());
    assert_eq!(errors.diagnostics()[0].code, ErrorCode::LexUnterminatedLiteral);
}

#[test]
fn unknown_escape_is_reported() {
    let (_, errors) = scan_source("test.ddp", r#""a\qb""#, Mode::default());
    assert!(errors.has_errors());
    assert_eq!(errors.diagnostics()[0].code, ErrorCode::LexUnknownEscape);
}

#[test]
fn char_literal_with_two_scalars_is_reported() {
    let (_, errors) = scan_source("test.ddp", "'ab'", Mode::default());
    assert!(errors.has_errors());
    assert_eq!(errors.diagnostics()[0].code, ErrorCode::LexCharLiteralTooLong);
}

#[test]
fn strict_mode_reports_lowercase_keyword_after_dot() {
    let mode = Mode { strict_capitalization: true, alias: false };
    let (_, errors) = scan_source("test.ddp", "wenn wahr, dann: foo.", mode);
    let diagnostics = errors.diagnostics();
    assert!(diagnostics.iter().any(|d| d.code == ErrorCode::LexCapitalization));
    // capitalization is a warning, not an error
    assert!(!errors.has_errors());
}

#[test]
fn unescape_string_decodes_escapes() {
    assert_eq!(unescape_string(r#""a\nb""#), "a\nb");
    assert_eq!(unescape_string(r#""\"zitat\"""#), "\"zitat\"");
    assert_eq!(unescape_string(r#""kein \\ problem""#), "kein \\ problem");
}

#[test]
fn char_literal_value_decodes_escapes() {
    assert_eq!(char_literal_value("'x'"), Some('x'));
    assert_eq!(char_literal_value(r"'\n'"), Some('\n'));
    assert_eq!(char_literal_value(r"'\''"), Some('\''));
    assert_eq!(char_literal_value("'ß'"), Some('ß'));
}
