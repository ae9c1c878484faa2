use super::ast::*;
use super::*;
use crate::error::ErrorCode;
use crate::lexer::token::Primitive;
use crate::lexer::{scan_source, Mode};

fn parse_source(source: &str) -> (Ast, crate::error::DiagnosticSink) {
    let (tokens, scan_errors) = scan_source("test.ddp", source, Mode::default());
    assert!(scan_errors.is_empty(), "Scanner-Diagnosen: {:?}", scan_errors.diagnostics());
    parse(tokens, "test.ddp")
}

fn parse_clean(source: &str) -> Ast {
    let (ast, errors) = parse_source(source);
    assert!(!errors.has_errors(), "unerwartete Diagnosen: {:?}", errors.diagnostics());
    assert!(!ast.faulty);
    ast
}

#[test]
fn parse_var_declaration() {
    let ast = parse_clean("Die Zahl x ist 42.");
    assert_eq!(ast.statements.len(), 1);
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert_eq!(decl.name, "x");
            assert_eq!(decl.typ, DdpType::ZAHL);
            assert!(matches!(decl.init, Expr::IntLit { value: 42, .. }));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn parse_list_type_declaration() {
    let ast = parse_clean("Die Zahlen Liste l ist eine leere Zahlen Liste.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert_eq!(decl.typ, DdpType::list(Primitive::Zahl));
            assert!(matches!(
                decl.init,
                Expr::ListLit { elem: Some(Primitive::Zahl), values: None, .. }
            ));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn parse_list_literal_with_values() {
    let ast = parse_clean("Die Zahlen Liste l ist eine Liste, die aus 10, 20 und 30 besteht.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => match &decl.init {
            Expr::ListLit { values: Some(values), .. } => {
                assert_eq!(values.len(), 3);
                assert!(matches!(values[2], Expr::IntLit { value: 30, .. }));
            }
            other => panic!("Listen-Literal erwartet, war {:?}", other),
        },
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn parse_repeated_list_literal() {
    let ast = parse_clean("Die Text Liste l ist eine Liste, die 3 Mal \"ab\" enthält.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert!(matches!(
                &decl.init,
                Expr::ListLit { count: Some(_), value: Some(_), values: None, .. }
            ));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn alias_overloads_resolve_by_argument_type() {
    let cases = [
        ("Schreibe 42.", "Schreibe_Zahl"),
        ("Schreibe 1,5.", "Schreibe_Kommazahl"),
        ("Schreibe wahr.", "Schreibe_Boolean"),
        ("Schreibe 'x'.", "Schreibe_Buchstabe"),
        ("Schreibe \"Hallo, Welt!\".", "Schreibe_Text"),
    ];
    for (source, expected) in cases {
        let ast = parse_clean(source);
        match &ast.statements[0] {
            Stmt::Expr { expr: Expr::Call { name, args, .. }, .. } => {
                assert_eq!(name, expected, "für {}", source);
                assert!(args.contains_key("wert"));
            }
            other => panic!("Aufruf erwartet für {}, war {:?}", source, other),
        }
    }
}

#[test]
fn longest_alias_pattern_wins() {
    let ast = parse_clean("Schreibe die Zeile 7.");
    match &ast.statements[0] {
        Stmt::Expr { expr: Expr::Call { name, .. }, .. } => {
            assert_eq!(name, "Schreibe_Zahl_Zeile");
        }
        other => panic!("Aufruf erwartet, war {:?}", other),
    }
}

const ADDIERE: &str = "\
Die Funktion addiere mit den Parametern a und b vom Typ Zahl und Zahl, gibt eine Zahl zurück, macht:
    Gib a plus b zurück.
Und kann so benutzt werden:
    \"addiere <a> und <b>\".
";

#[test]
fn parse_function_declaration() {
    let ast = parse_clean(ADDIERE);
    let decl = ast.functions.get("addiere").expect("Funktion muss deklariert sein");
    assert_eq!(decl.params.len(), 2);
    assert_eq!(decl.params[0].name, "a");
    assert!(!decl.params[0].is_reference);
    assert_eq!(decl.return_type, Some(DdpType::ZAHL));
    assert!(!decl.is_extern());
    let body = decl.body.as_ref().expect("Funktions-Körper muss geparst sein");
    assert!(matches!(body.statements[0], Stmt::Return { value: Some(_), .. }));
}

#[test]
fn alias_calls_resolve_with_sub_expressions() {
    let source = format!("{}Schreibe addiere 1 und 2.", ADDIERE);
    let ast = parse_clean(&source);
    match &ast.statements[1] {
        Stmt::Expr { expr: Expr::Call { name, args, .. }, .. } => {
            assert_eq!(name, "Schreibe_Zahl");
            match args.get("wert") {
                Some(Expr::Call { name, args, .. }) => {
                    assert_eq!(name, "addiere");
                    assert!(matches!(args.get("a"), Some(Expr::IntLit { value: 1, .. })));
                    assert!(matches!(args.get("b"), Some(Expr::IntLit { value: 2, .. })));
                }
                other => panic!("verschachtelter Aufruf erwartet, war {:?}", other),
            }
        }
        other => panic!("Aufruf erwartet, war {:?}", other),
    }
}

#[test]
fn recursive_calls_through_the_own_alias_resolve() {
    let source = "\
Die Funktion fakultät mit dem Parameter n vom Typ Zahl, gibt eine Zahl zurück, macht:
    Wenn n kleiner als 2, dann:
        Gib 1 zurück.
    Gib n mal fakultät von (n minus 1) zurück.
Und kann so benutzt werden:
    \"fakultät von <n>\".
";
    let ast = parse_clean(source);
    let decl = ast.functions.get("fakultät").unwrap();
    let body = decl.body.as_ref().unwrap();
    // the second statement multiplies by a recursive call
    match &body.statements[1] {
        Stmt::Return { value: Some(Expr::Binary { rhs, .. }), .. } => {
            assert!(matches!(&**rhs, Expr::Call { name, .. } if name == "fakultät"));
        }
        other => panic!("Rückgabe erwartet, war {:?}", other),
    }
}

#[test]
fn duplicate_alias_reports_at_declaration() {
    let source = "\
Die Funktion eins, gibt eine Zahl zurück, macht:
    Gib 1 zurück.
Und kann so benutzt werden:
    \"die antwort\".
Die Funktion zwei, gibt eine Zahl zurück, macht:
    Gib 2 zurück.
Und kann so benutzt werden:
    \"die antwort\".
";
    let (_, errors) = parse_source(source);
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::SynDuplicateAlias));
}

#[test]
fn duplicate_alias_ignores_the_hole_parameter_name() {
    // identical shape and hole type, only the declaring functions name
    // their parameter differently: still a duplicate
    let source = "\
Die Funktion eins mit dem Parameter a vom Typ Zahl, gibt eine Zahl zurück, macht:
    Gib a zurück.
Und kann so benutzt werden:
    \"wert von <a>\".
Die Funktion zwei mit dem Parameter b vom Typ Zahl, gibt eine Zahl zurück, macht:
    Gib b zurück.
Und kann so benutzt werden:
    \"wert von <b>\".
";
    let (_, errors) = parse_source(source);
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::SynDuplicateAlias));
}

#[test]
fn same_shape_aliases_with_different_hole_types_coexist() {
    // the Schreibe builtins share one shape and differ only in the hole
    // type; none of them is a duplicate of another
    let (_, errors) = parse_source("Schreibe 1.\nSchreibe \"a\".");
    assert!(!errors.diagnostics().iter().any(|d| d.code == ErrorCode::SynDuplicateAlias));
}

#[test]
fn alias_must_name_every_parameter() {
    let source = "\
Die Funktion addiere mit den Parametern a und b vom Typ Zahl und Zahl, gibt eine Zahl zurück, macht:
    Gib a plus b zurück.
Und kann so benutzt werden:
    \"addiere <a>\".
";
    let (_, errors) = parse_source(source);
    assert!(errors.diagnostics().iter().any(|d| d.code == ErrorCode::SynMalformedAlias));
}

#[test]
fn parse_if_with_else_block() {
    let source = "\
Wenn wahr, dann:
    Schreibe 1.
Sonst:
    Schreibe 2.
";
    let ast = parse_clean(source);
    match &ast.statements[0] {
        Stmt::If { condition, then, els, .. } => {
            assert!(matches!(condition, Expr::BoolLit { value: true, .. }));
            assert!(matches!(**then, Stmt::Block(_)));
            assert!(els.is_some());
        }
        other => panic!("Wenn-Anweisung erwartet, war {:?}", other),
    }
}

#[test]
fn parse_loops() {
    let source = "\
Solange wahr, mache:
    Schreibe 1.
Mache:
    Schreibe 2.
Solange falsch.
Wiederhole 3 Mal:
    Schreibe 3.
";
    let ast = parse_clean(source);
    assert!(matches!(&ast.statements[0], Stmt::While { kind: LoopKind::Solange, .. }));
    assert!(matches!(&ast.statements[1], Stmt::While { kind: LoopKind::MacheSolange, .. }));
    assert!(matches!(&ast.statements[2], Stmt::While { kind: LoopKind::Wiederhole, .. }));
}

#[test]
fn parse_counting_for_loop() {
    let source = "\
Für jede Zahl i von 1 bis 10 mit Schrittgröße 2, mache:
    Schreibe i.
";
    let ast = parse_clean(source);
    match &ast.statements[0] {
        Stmt::For { counter, to, step, .. } => {
            assert_eq!(counter.name, "i");
            assert!(matches!(counter.init, Expr::IntLit { value: 1, .. }));
            assert!(matches!(to, Expr::IntLit { value: 10, .. }));
            assert!(step.is_some());
        }
        other => panic!("Für-Anweisung erwartet, war {:?}", other),
    }
}

#[test]
fn parse_for_each_over_text() {
    let source = "\
Für jeden Buchstaben b in \"abc\", mache:
    Schreibe b.
";
    let ast = parse_clean(source);
    match &ast.statements[0] {
        Stmt::ForEach { elem_type, name, iter, .. } => {
            assert_eq!(*elem_type, DdpType::BUCHSTABE);
            assert_eq!(name, "b");
            assert!(matches!(iter, Expr::StringLit { .. }));
        }
        other => panic!("Für-jeden-Anweisung erwartet, war {:?}", other),
    }
}

#[test]
fn parse_assignment_to_indexing() {
    let source = "\
Die Text Liste l ist eine leere Text Liste.
Speichere \"x\" in die 1. Stelle von l.
";
    let ast = parse_clean(source);
    match &ast.statements[1] {
        Stmt::Assign { target: Assignable::Indexing { lhs, .. }, .. } => {
            assert!(matches!(&**lhs, Assignable::Ident { name, .. } if name == "l"));
        }
        other => panic!("Zuweisung erwartet, war {:?}", other),
    }
}

#[test]
fn parse_slice_and_indexing_expressions() {
    let ast = parse_clean("Der Text t ist \"abcdef\" von 2 bis 4.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => assert!(matches!(decl.init, Expr::Slice { .. })),
        other => panic!("VarDecl erwartet, war {:?}", other),
    }

    let ast = parse_clean("Die Zahl x ist die 2. Stelle von einer Liste, die aus 10, 20 und 30 besteht.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => match &decl.init {
            Expr::Indexing { index, .. } => {
                assert!(matches!(**index, Expr::IntLit { value: 2, .. }));
            }
            other => panic!("Indizierung erwartet, war {:?}", other),
        },
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn parse_cast_and_word_operators() {
    let ast = parse_clean("Die Zahl x ist \"123\" als Zahl.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert!(matches!(decl.init, Expr::Cast { target: DdpType::ZAHL, .. }));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }

    let ast = parse_clean("Die Zahl l ist die Länge von \"abc\".");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert!(matches!(decl.init, Expr::Unary { op: UnaryOp::Laenge, .. }));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn arithmetic_precedence_binds_mal_tighter_than_plus() {
    let ast = parse_clean("Die Zahl x ist 1 plus 2 mal 3.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => match &decl.init {
            Expr::Binary { op: BinaryOp::Plus, rhs, .. } => {
                assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mal, .. }));
            }
            other => panic!("Plus-Ausdruck erwartet, war {:?}", other),
        },
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn comparison_with_oder_gleich_parses_as_one_operator() {
    let ast = parse_clean("Der Boolean b ist 1 kleiner als oder gleich 2.");
    match &ast.statements[0] {
        Stmt::VarDecl(decl) => {
            assert!(matches!(decl.init, Expr::Binary { op: BinaryOp::KleinerOder, .. }));
        }
        other => panic!("VarDecl erwartet, war {:?}", other),
    }
}

#[test]
fn syntax_error_recovers_at_statement_boundary() {
    let (ast, errors) = parse_source("Die Zahl ist 5.\nSchreibe 1.");
    assert!(errors.has_errors());
    assert!(ast.faulty);
    // the second statement still parses after recovery
    assert!(matches!(
        ast.statements.last(),
        Some(Stmt::Expr { expr: Expr::Call { .. }, .. })
    ));
}

#[test]
fn reference_arguments_must_be_assignable() {
    let source = "\
Die Funktion verdopple mit dem Parameter z vom Typ Zahlen Referenz, gibt nichts zurück, macht:
    Speichere z plus z in z.
Und kann so benutzt werden:
    \"verdopple <z>\".
Die Zahl x ist 1.
verdopple x.
verdopple 5.
";
    let (ast, errors) = parse_source(source);
    let decl = ast.functions.get("verdopple").unwrap();
    assert!(decl.params[0].is_reference);
    // `verdopple x.` is fine, `verdopple 5.` is not
    assert!(errors
        .diagnostics()
        .iter()
        .any(|d| d.code == ErrorCode::SynExpectedAssignable));
}
