use crate::error::{DiagnosticSink, ErrorCode};
use crate::lexer::{scan_source, Mode};
use crate::parser;
use crate::resolver::resolve;

fn resolve_source(source: &str) -> (bool, Vec<ErrorCode>) {
    let (tokens, scan_errors) = scan_source("test.ddp", source, Mode::default());
    assert!(scan_errors.is_empty(), "Scanner-Diagnosen: {:?}", scan_errors.diagnostics());
    let (mut ast, parse_errors) = parser::parse(tokens, "test.ddp");
    assert!(!parse_errors.has_errors(), "Parser-Diagnosen: {:?}", parse_errors.diagnostics());

    let mut sink = DiagnosticSink::new();
    resolve(&mut ast, &mut sink);
    (ast.faulty, sink.diagnostics().iter().map(|d| d.code).collect())
}

#[test]
fn declared_names_resolve() {
    let (faulty, codes) = resolve_source("Die Zahl x ist 1.\nSchreibe x.");
    assert!(!faulty);
    assert!(codes.is_empty());
}

#[test]
fn undeclared_name_is_reported() {
    let (faulty, codes) = resolve_source("Schreibe x.");
    assert!(faulty);
    assert_eq!(codes, [ErrorCode::NameUndeclared]);
}

#[test]
fn duplicate_variable_in_same_scope_is_reported() {
    let (faulty, codes) = resolve_source("Die Zahl x ist 1.\nDie Zahl x ist 2.");
    assert!(faulty);
    assert_eq!(codes, [ErrorCode::NameDuplicate]);
}

#[test]
fn blocks_open_their_own_scope() {
    let source = "\
Wenn wahr, dann:
    Die Zahl x ist 1.
    Schreibe x.
Wenn wahr, dann:
    Die Zahl x ist 2.
";
    let (faulty, codes) = resolve_source(source);
    assert!(!faulty, "Diagnosen: {:?}", codes);
}

#[test]
fn block_locals_do_not_leak_outward() {
    let source = "\
Wenn wahr, dann:
    Die Zahl x ist 1.
Schreibe x.
";
    let (faulty, codes) = resolve_source(source);
    assert!(faulty);
    assert_eq!(codes, [ErrorCode::NameUndeclared]);
}

#[test]
fn loop_counter_is_visible_in_the_body() {
    let source = "\
Für jede Zahl i von 1 bis 3, mache:
    Schreibe i.
";
    let (faulty, codes) = resolve_source(source);
    assert!(!faulty, "Diagnosen: {:?}", codes);
}

#[test]
fn loop_counter_shares_the_body_scope() {
    // the counter lives in the body's scope, so re-declaring it there
    // collides instead of shadowing
    let source = "\
Für jede Zahl i von 1 bis 3, mache:
    Die Zahl i ist 9.
";
    let (faulty, codes) = resolve_source(source);
    assert!(faulty);
    assert_eq!(codes, [ErrorCode::NameDuplicate]);
}

#[test]
fn for_each_variable_is_visible_in_the_body() {
    let source = "\
Für jeden Buchstaben b in \"abc\", mache:
    Schreibe b.
";
    let (faulty, codes) = resolve_source(source);
    assert!(!faulty, "Diagnosen: {:?}", codes);
}

#[test]
fn function_parameters_resolve_in_the_body() {
    let source = "\
Die Funktion addiere mit den Parametern a und b vom Typ Zahl und Zahl, gibt eine Zahl zurück, macht:
    Gib a plus b zurück.
Und kann so benutzt werden:
    \"addiere <a> und <b>\".
";
    let (faulty, codes) = resolve_source(source);
    assert!(!faulty, "Diagnosen: {:?}", codes);
}

#[test]
fn return_outside_a_function_is_reported() {
    let (faulty, codes) = resolve_source("Gib 1 zurück.");
    assert!(faulty);
    assert_eq!(codes, [ErrorCode::NameReturnOutsideFunction]);
}
