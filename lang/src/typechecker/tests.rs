use crate::error::{DiagnosticSink, ErrorCode};
use crate::lexer::{scan_source, Mode};
use crate::parser;
use crate::resolver::resolve;
use crate::typechecker::typecheck;

fn typecheck_source(source: &str) -> Vec<ErrorCode> {
    let (tokens, scan_errors) = scan_source("test.ddp", source, Mode::default());
    assert!(scan_errors.is_empty(), "Scanner-Diagnosen: {:?}", scan_errors.diagnostics());
    let (mut ast, parse_errors) = parser::parse(tokens, "test.ddp");
    assert!(!parse_errors.has_errors(), "Parser-Diagnosen: {:?}", parse_errors.diagnostics());

    let mut sink = DiagnosticSink::new();
    resolve(&mut ast, &mut sink);
    assert!(!sink.has_errors(), "Resolver-Diagnosen: {:?}", sink.diagnostics());
    typecheck(&mut ast, &mut sink);
    sink.diagnostics().iter().map(|d| d.code).collect()
}

fn assert_well_typed(source: &str) {
    let codes = typecheck_source(source);
    assert!(codes.is_empty(), "unerwartete Diagnosen: {:?}", codes);
}

#[test]
fn division_always_yields_kommazahl() {
    // assigning the Kommazahl result to a Zahl is the type error
    assert_eq!(typecheck_source("Die Zahl x ist 3 durch 2."), [ErrorCode::TypeMismatch]);
    assert_well_typed("Die Kommazahl x ist 3 durch 2.");
}

#[test]
fn arithmetic_promotes_on_float_involvement() {
    assert_well_typed("Die Zahl x ist 1 plus 2.");
    assert_well_typed("Die Kommazahl x ist 1 plus 2,5.");
    assert_eq!(typecheck_source("Die Zahl x ist 1 plus 2,5."), [ErrorCode::TypeMismatch]);
}

#[test]
fn modulo_requires_zahlen() {
    assert_well_typed("Die Zahl x ist 7 modulo 3.");
    assert_eq!(
        typecheck_source("Die Zahl x ist 7,5 modulo 3."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn logical_operators_require_boolean() {
    assert_well_typed("Der Boolean b ist wahr und falsch.");
    assert_eq!(
        typecheck_source("Der Boolean b ist 1 und falsch."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn bitwise_operators_require_zahlen() {
    assert_well_typed("Die Zahl x ist 6 logisch und 3.");
    assert_well_typed("Die Zahl x ist 1 um 3 Bit nach links verschoben.");
    assert_eq!(
        typecheck_source("Die Zahl x ist wahr logisch oder 3."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn comparison_requires_identical_operand_types() {
    assert_well_typed("Der Boolean b ist 1 gleich 2.");
    assert_well_typed("Der Boolean b ist \"a\" gleich \"b\".");
    assert_eq!(
        typecheck_source("Der Boolean b ist 1 gleich \"a\"."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn relational_operators_require_numbers() {
    assert_well_typed("Der Boolean b ist 1 kleiner als 2,5.");
    assert_eq!(
        typecheck_source("Der Boolean b ist \"a\" kleiner als \"b\"."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn verkettet_combines_text_and_buchstaben_to_text() {
    assert_well_typed("Der Text t ist \"ab\" verkettet mit \"cd\".");
    assert_well_typed("Der Text t ist \"ab\" verkettet mit 'c'.");
    assert_well_typed("Die Buchstaben Liste l ist 'a' verkettet mit 'b'.");
    assert_eq!(
        typecheck_source("Der Text t ist \"ab\" verkettet mit 1."),
        [ErrorCode::TypeInvalidOperator]
    );
}

#[test]
fn verkettet_joins_lists_of_the_same_element_type() {
    let source = "\
Die Zahlen Liste a ist eine Liste, die aus 1 und 2 besteht.
Die Zahlen Liste b ist a verkettet mit 3.
Die Zahlen Liste c ist a verkettet mit b.
";
    assert_well_typed(source);
}

#[test]
fn indexing_types() {
    assert_well_typed("Der Buchstabe b ist die 2. Stelle von \"abc\".");
    let source = "\
Die Zahlen Liste l ist eine Liste, die aus 1 und 2 besteht.
Die Zahl x ist die 1. Stelle von l.
";
    assert_well_typed(source);
    assert_eq!(
        typecheck_source("Der Buchstabe b ist die 2. Stelle von 5."),
        [ErrorCode::TypeInvalidOperator]
    );
    assert_eq!(
        typecheck_source("Der Buchstabe b ist die wahr. Stelle von \"abc\"."),
        [ErrorCode::TypeMismatch]
    );
}

#[test]
fn slice_requires_text_or_list_and_zahlen_bounds() {
    assert_well_typed("Der Text t ist \"abcdef\" von 2 bis 4.");
    assert_eq!(
        typecheck_source("Der Text t ist \"abcdef\" von wahr bis 4."),
        [ErrorCode::TypeMismatch]
    );
    assert_eq!(typecheck_source("Die Zahl x ist 5 von 1 bis 2."), [ErrorCode::TypeInvalidOperator]);
}

#[test]
fn cast_rules() {
    assert_well_typed("Die Zahl x ist \"123\" als Zahl.");
    assert_well_typed("Der Text t ist 42 als Text.");
    assert_well_typed("Die Zahl x ist 'a' als Zahl.");
    assert_well_typed("Die Zahlen Liste l ist 1 als Zahlen Liste.");
    assert_eq!(typecheck_source("Der Buchstabe b ist wahr als Buchstabe."), [ErrorCode::TypeInvalidCast]);
    assert_eq!(typecheck_source("Der Boolean b ist \"wahr\" als Boolean."), [ErrorCode::TypeInvalidCast]);
}

#[test]
fn conditions_must_be_boolean() {
    assert_eq!(
        typecheck_source("Wenn 1, dann:\n    Schreibe 1.\n"),
        [ErrorCode::TypeMismatch]
    );
    assert_eq!(
        typecheck_source("Solange 1, mache:\n    Schreibe 1.\n"),
        [ErrorCode::TypeMismatch]
    );
}

#[test]
fn repeat_count_must_be_zahl() {
    assert_well_typed("Wiederhole 3 Mal:\n    Schreibe 1.\n");
    assert_eq!(
        typecheck_source("Wiederhole wahr Mal:\n    Schreibe 1.\n"),
        [ErrorCode::TypeMismatch]
    );
}

#[test]
fn for_each_element_type_must_match_the_iterable() {
    assert_well_typed("Für jeden Buchstaben b in \"abc\", mache:\n    Schreibe b.\n");
    let source = "\
Die Zahlen Liste l ist eine Liste, die aus 1 und 2 besteht.
Für jeden Text t in l, mache:
    Schreibe t.
";
    assert_eq!(typecheck_source(source), [ErrorCode::TypeMismatch]);
    assert_eq!(
        typecheck_source("Für jede Zahl z in 5, mache:\n    Schreibe z.\n"),
        [ErrorCode::TypeMismatch]
    );
}

#[test]
fn return_type_must_match_the_declaration() {
    let source = "\
Die Funktion halbiere mit dem Parameter z vom Typ Zahl, gibt eine Kommazahl zurück, macht:
    Gib z durch 2 zurück.
Und kann so benutzt werden:
    \"halbiere <z>\".
";
    assert_well_typed(source);

    let source = "\
Die Funktion kaputt mit dem Parameter z vom Typ Zahl, gibt eine Kommazahl zurück, macht:
    Gib wahr zurück.
Und kann so benutzt werden:
    \"kaputt <z>\".
";
    assert_eq!(typecheck_source(source), [ErrorCode::TypeMismatch]);
}

#[test]
fn call_arguments_are_checked_against_parameter_types() {
    let source = "\
Die Funktion halbiere mit dem Parameter z vom Typ Zahl, gibt eine Kommazahl zurück, macht:
    Gib z durch 2 zurück.
Und kann so benutzt werden:
    \"halbiere <z>\".
Die Kommazahl k ist halbiere \"acht\".
";
    assert_eq!(typecheck_source(source), [ErrorCode::TypeMismatch]);
}

#[test]
fn char_reference_into_a_text_is_rejected() {
    let source = "\
Die Funktion setze mit dem Parameter b vom Typ Buchstaben Referenz, gibt nichts zurück, macht:
    Speichere 'x' in b.
Und kann so benutzt werden:
    \"setze <b>\".
Der Text t ist \"abc\".
setze die 1. Stelle von t.
";
    assert_eq!(typecheck_source(source), [ErrorCode::TypeBadReference]);
}

#[test]
fn assignment_types_are_checked() {
    assert_well_typed("Die Zahl x ist 1.\nSpeichere 2 in x.");
    assert_eq!(
        typecheck_source("Die Zahl x ist 1.\nSpeichere wahr in x."),
        [ErrorCode::TypeMismatch]
    );
    let source = "\
Der Text t ist \"abc\".
Speichere 'x' in die 2. Stelle von t.
";
    assert_well_typed(source);
}

#[test]
fn list_literal_elements_must_agree() {
    assert_eq!(
        typecheck_source("Die Zahlen Liste l ist eine Liste, die aus 1 und wahr besteht."),
        [ErrorCode::TypeMismatch]
    );
}
