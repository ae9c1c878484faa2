//! The type checker.
//!
//! Second AST walk after name resolution: synthesizes types bottom-up and
//! validates operators, casts, indexing, list literals, reference
//! arguments and return types. Unknown operand types (from earlier
//! errors) are propagated silently to avoid diagnostic cascades.

#[cfg(test)]
mod tests;

use crate::error::{DdpError, DiagnosticSink, ErrorCode};
use crate::lexer::token::{DdpType, Primitive, Range};
use crate::parser::ast::*;

use std::collections::HashMap;
use std::rc::Rc;

/// Typecheck the AST, reporting into `errors`.
/// Marks the AST faulty when an error was found.
pub fn typecheck(ast: &mut Ast, errors: &mut DiagnosticSink) {
    let mut checker = Typechecker {
        errors,
        file: ast.file.clone(),
        functions: &ast.functions,
        scopes: ScopeStack::new(),
        errored: false,
    };
    for stmt in &ast.statements {
        checker.check_stmt(stmt);
    }
    if checker.errored {
        ast.faulty = true;
    }
}

struct Typechecker<'a> {
    errors: &'a mut DiagnosticSink,
    file: String,
    functions: &'a HashMap<String, Rc<FuncDecl>>,
    scopes: ScopeStack<DdpType>,
    errored: bool,
}

impl Typechecker<'_> {
    fn err(&mut self, code: ErrorCode, range: Range, msg: String) {
        self.errored = true;
        self.errors.report(DdpError::new(code, range, msg, self.file.clone()));
    }

    fn err_binary(&mut self, range: Range, t1: DdpType, t2: DdpType, op: BinaryOp) {
        self.err(
            ErrorCode::TypeInvalidOperator,
            range,
            format!("Die Typen Kombination aus '{}' und '{}' passt nicht zu dem '{}' Operator", t1, t2, op),
        );
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Bad { .. } => self.errored = true,
            Stmt::VarDecl(decl) => self.check_var_decl(decl),
            Stmt::FuncDecl(decl) => self.check_func_decl(decl),
            Stmt::Expr { expr, .. } => {
                self.evaluate(expr);
            }
            Stmt::Assign { target, rhs, .. } => self.check_assign(target, rhs),
            Stmt::Block(block) => {
                self.scopes.push();
                for stmt in &block.statements {
                    self.check_stmt(stmt);
                }
                self.scopes.pop();
            }
            Stmt::If { condition, then, els, .. } => {
                if let Some(cond) = self.evaluate_required(condition) {
                    if cond != DdpType::BOOLEAN {
                        self.err(
                            ErrorCode::TypeMismatch,
                            condition.range(),
                            format!(
                                "Die Bedingung einer WENN Anweisung muss vom Typ Boolean sein, war aber vom Typ {}",
                                cond
                            ),
                        );
                    }
                }
                self.check_stmt(then);
                if let Some(els) = els {
                    self.check_stmt(els);
                }
            }
            Stmt::While { kind, condition, body, .. } => {
                if let Some(cond) = self.evaluate_required(condition) {
                    match kind {
                        LoopKind::Solange | LoopKind::MacheSolange => {
                            if cond != DdpType::BOOLEAN {
                                self.err(
                                    ErrorCode::TypeMismatch,
                                    condition.range(),
                                    format!(
                                        "Die Bedingung einer SOLANGE Anweisung muss vom Typ Boolean sein, war aber vom Typ {}",
                                        cond
                                    ),
                                );
                            }
                        }
                        LoopKind::Wiederhole => {
                            if cond != DdpType::ZAHL {
                                self.err(
                                    ErrorCode::TypeMismatch,
                                    condition.range(),
                                    format!(
                                        "Die Anzahl an Wiederholungen einer WIEDERHOLE Anweisung muss vom Typ Zahl sein, war aber vom Typ {}",
                                        cond
                                    ),
                                );
                            }
                        }
                    }
                }
                self.check_stmt(body);
            }
            Stmt::For { counter, to, step, body, .. } => {
                self.scopes.push();
                self.check_var_decl(counter);
                self.expect_zahl(to);
                if let Some(step) = step {
                    self.expect_zahl(step);
                }
                self.check_block_in_current_scope(body);
                self.scopes.pop();
            }
            Stmt::ForEach { elem_type, name, iter, body, .. } => {
                self.scopes.push();
                if let Some(in_type) = self.evaluate_required(iter) {
                    if !in_type.is_list && in_type != DdpType::TEXT {
                        self.err(
                            ErrorCode::TypeMismatch,
                            iter.range(),
                            "Man kann nur über Texte oder Listen iterieren".to_string(),
                        );
                    } else if in_type.is_list && *elem_type != in_type.element_type() {
                        self.err(
                            ErrorCode::TypeMismatch,
                            iter.range(),
                            format!(
                                "Es wurde ein Ausdruck vom Typ {} erwartet aber {} gefunden",
                                DdpType::list(elem_type.primitive),
                                in_type
                            ),
                        );
                    } else if in_type == DdpType::TEXT && *elem_type != DdpType::BUCHSTABE {
                        self.err(
                            ErrorCode::TypeMismatch,
                            iter.range(),
                            format!(
                                "Es wurde ein Ausdruck vom Typ Buchstabe erwartet aber {} gefunden",
                                elem_type
                            ),
                        );
                    }
                }
                self.scopes.declare(name, *elem_type);
                self.check_block_in_current_scope(body);
                self.scopes.pop();
            }
            Stmt::Return { value, func, range } => {
                let returned = match value {
                    Some(value) => self.evaluate_required(value),
                    None => None,
                };
                if let Some(decl) = self.functions.get(func) {
                    if decl.return_type != returned && (value.is_none() || returned.is_some()) {
                        let expected = type_name_or_nichts(decl.return_type);
                        let got = type_name_or_nichts(returned);
                        self.err(
                            ErrorCode::TypeMismatch,
                            *range,
                            format!(
                                "Eine Funktion mit Rückgabetyp {} kann keinen Wert vom Typ {} zurückgeben",
                                expected, got
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_block_in_current_scope(&mut self, body: &Stmt) {
        match body {
            Stmt::Block(block) => {
                for stmt in &block.statements {
                    self.check_stmt(stmt);
                }
            }
            other => self.check_stmt(other),
        }
    }

    fn check_var_decl(&mut self, decl: &VarDecl) {
        if let Some(initial) = self.evaluate_required(&decl.init) {
            if initial != decl.typ {
                self.err(
                    ErrorCode::TypeMismatch,
                    decl.init.range(),
                    format!(
                        "Ein Wert vom Typ {} kann keiner Variable vom Typ {} zugewiesen werden",
                        initial, decl.typ
                    ),
                );
            }
        }
        self.scopes.declare(&decl.name, decl.typ);
    }

    fn check_func_decl(&mut self, decl: &Rc<FuncDecl>) {
        if let Some(body) = &decl.body {
            self.scopes.push();
            for param in &decl.params {
                self.scopes.declare(&param.name, param.typ);
            }
            for stmt in &body.statements {
                self.check_stmt(stmt);
            }
            self.scopes.pop();
        }
    }

    fn check_assign(&mut self, target: &Assignable, rhs: &Expr) {
        let rhs_type = self.evaluate_required(rhs);
        let target_type = self.assignable_type(target);
        if let (Some(rhs_type), Some(target_type)) = (rhs_type, target_type) {
            if rhs_type != target_type {
                self.err(
                    ErrorCode::TypeMismatch,
                    rhs.range(),
                    format!(
                        "Ein Wert vom Typ {} kann keiner Variable vom Typ {} zugewiesen werden",
                        rhs_type, target_type
                    ),
                );
            }
        }
    }

    fn assignable_type(&mut self, target: &Assignable) -> Option<DdpType> {
        match target {
            Assignable::Ident { name, .. } => self.scopes.lookup(name).copied(),
            Assignable::Indexing { lhs, index, range } => {
                self.expect_zahl(index);
                let lhs_type = self.assignable_type(lhs)?;
                if lhs_type.is_list {
                    Some(lhs_type.element_type())
                } else if lhs_type == DdpType::TEXT {
                    Some(DdpType::BUCHSTABE)
                } else {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        *range,
                        format!(
                            "Der STELLE Operator erwartet einen Text oder eine Liste als ersten Operanden, nicht {}",
                            lhs_type
                        ),
                    );
                    None
                }
            }
        }
    }

    /// Evaluate an expression in a position that requires a value; a
    /// call to a function returning nothing is diagnosed here.
    fn evaluate_required(&mut self, expr: &Expr) -> Option<DdpType> {
        let typ = self.evaluate(expr);
        if typ.is_none() {
            if let Some(decl) = void_call_decl(self.functions, expr) {
                self.err(
                    ErrorCode::TypeMismatch,
                    expr.range(),
                    format!("Die Funktion {} gibt nichts zurück und kann hier nicht benutzt werden", decl),
                );
            }
        }
        typ
    }

    fn expect_zahl(&mut self, expr: &Expr) {
        if let Some(typ) = self.evaluate_required(expr) {
            if typ != DdpType::ZAHL {
                self.err(
                    ErrorCode::TypeMismatch,
                    expr.range(),
                    format!("Es wurde ein Ausdruck vom Typ Zahl erwartet aber {} gefunden", typ),
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    /// Synthesize the type of an expression. `None` means unknown (an
    /// earlier error) or void (a call to a function returning nothing).
    fn evaluate(&mut self, expr: &Expr) -> Option<DdpType> {
        match expr {
            Expr::Bad { .. } => {
                self.errored = true;
                None
            }
            Expr::IntLit { .. } => Some(DdpType::ZAHL),
            Expr::FloatLit { .. } => Some(DdpType::KOMMAZAHL),
            Expr::BoolLit { .. } => Some(DdpType::BOOLEAN),
            Expr::CharLit { .. } => Some(DdpType::BUCHSTABE),
            Expr::StringLit { .. } => Some(DdpType::TEXT),
            Expr::ListLit { elem, values, count, value, range } => {
                self.check_list_lit(*elem, values, count, value, *range)
            }
            Expr::Ident { name, .. } => self.scopes.lookup(name).copied(),
            Expr::Indexing { lhs, index, .. } => {
                self.expect_zahl(index);
                let lhs_type = self.evaluate_required(lhs)?;
                if !lhs_type.is_list && lhs_type != DdpType::TEXT {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        lhs.range(),
                        format!(
                            "Der STELLE Operator erwartet einen Text oder eine Liste als ersten Operanden, nicht {}",
                            lhs_type
                        ),
                    );
                    return None;
                }
                if lhs_type.is_list {
                    Some(lhs_type.element_type())
                } else {
                    Some(DdpType::BUCHSTABE)
                }
            }
            Expr::Unary { op, rhs, range } => self.check_unary(*op, rhs, *range),
            Expr::Binary { op, lhs, rhs, range } => self.check_binary(*op, lhs, rhs, *range),
            Expr::Slice { lhs, start, end, .. } => {
                self.expect_zahl(start);
                self.expect_zahl(end);
                let lhs_type = self.evaluate_required(lhs)?;
                if !lhs_type.is_list && lhs_type != DdpType::TEXT {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        lhs.range(),
                        format!(
                            "Der VON_BIS Operator erwartet einen Text oder eine Liste als ersten Operanden, nicht {}",
                            lhs_type
                        ),
                    );
                    return None;
                }
                Some(lhs_type)
            }
            Expr::Cast { target, lhs, range } => self.check_cast(*target, lhs, *range),
            Expr::Default { typ, .. } => Some(*typ),
            Expr::Grouping { expr, .. } => self.evaluate(expr),
            Expr::Call { name, args, .. } => self.check_call(name, args),
        }
    }

    fn check_list_lit(
        &mut self,
        elem: Option<Primitive>,
        values: &Option<Vec<Expr>>,
        count: &Option<Box<Expr>>,
        value: &Option<Box<Expr>>,
        range: Range,
    ) -> Option<DdpType> {
        if let Some(values) = values {
            let element_type = self.evaluate_required(values.first()?)?;
            if element_type.is_list {
                self.err(
                    ErrorCode::TypeMismatch,
                    range,
                    "Listen können keine Listen enthalten".to_string(),
                );
                return None;
            }
            for value in &values[1..] {
                if let Some(typ) = self.evaluate_required(value) {
                    if typ != element_type {
                        self.err(
                            ErrorCode::TypeMismatch,
                            value.range(),
                            format!(
                                "Falscher Typ ({}) in Listen Literal vom Typ {}",
                                typ, element_type
                            ),
                        );
                    }
                }
            }
            return Some(DdpType::list(element_type.primitive));
        }

        if let (Some(count), Some(value)) = (count, value) {
            if let Some(count_type) = self.evaluate_required(count) {
                if count_type != DdpType::ZAHL {
                    self.err(
                        ErrorCode::TypeMismatch,
                        count.range(),
                        format!("Die Größe einer Liste muss als Zahl angegeben werden, nicht als {}", count_type),
                    );
                }
            }
            let value_type = self.evaluate_required(value)?;
            if value_type.is_list {
                self.err(
                    ErrorCode::TypeMismatch,
                    value.range(),
                    "Listen können keine Listen enthalten".to_string(),
                );
                return None;
            }
            return Some(DdpType::list(value_type.primitive));
        }

        elem.map(DdpType::list)
    }

    fn check_unary(&mut self, op: UnaryOp, rhs: &Expr, range: Range) -> Option<DdpType> {
        let rhs_type = self.evaluate_required(rhs)?;
        match op {
            UnaryOp::Betrag | UnaryOp::Negate => {
                if !rhs_type.is_numeric() {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        range,
                        format!(
                            "Der {} Operator erwartet einen Ausdruck vom Typ Zahl oder Kommazahl, aber hat '{}' bekommen",
                            if op == UnaryOp::Betrag { "BETRAG" } else { "NEGATE" },
                            rhs_type
                        ),
                    );
                    return None;
                }
                Some(rhs_type)
            }
            UnaryOp::Nicht => {
                if rhs_type != DdpType::BOOLEAN {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        range,
                        format!(
                            "Der NICHT Operator erwartet einen Ausdruck vom Typ Boolean, aber hat '{}' bekommen",
                            rhs_type
                        ),
                    );
                }
                Some(DdpType::BOOLEAN)
            }
            UnaryOp::Negiere => {
                if rhs_type != DdpType::BOOLEAN && rhs_type != DdpType::ZAHL {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        range,
                        format!(
                            "Der NEGIERE Operator erwartet einen Ausdruck vom Typ Boolean oder Zahl, aber hat '{}' bekommen",
                            rhs_type
                        ),
                    );
                    return None;
                }
                Some(rhs_type)
            }
            UnaryOp::LogischNicht => {
                if rhs_type != DdpType::ZAHL {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        range,
                        format!(
                            "Der LOGISCH NICHT Operator erwartet einen Ausdruck vom Typ Zahl, aber hat '{}' bekommen",
                            rhs_type
                        ),
                    );
                }
                Some(DdpType::ZAHL)
            }
            UnaryOp::Laenge => {
                if !rhs_type.is_list && rhs_type != DdpType::TEXT {
                    self.err(
                        ErrorCode::TypeInvalidOperator,
                        range,
                        format!(
                            "Der LÄNGE Operator erwartet einen Text oder eine Liste als Operanden, nicht {}",
                            rhs_type
                        ),
                    );
                }
                Some(DdpType::ZAHL)
            }
            UnaryOp::Groesse => Some(DdpType::ZAHL),
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, range: Range) -> Option<DdpType> {
        let lhs_type = self.evaluate_required(lhs)?;
        let rhs_type = self.evaluate_required(rhs)?;

        let both_in = |types: &[DdpType]| types.contains(&lhs_type) && types.contains(&rhs_type);

        match op {
            BinaryOp::Verkettet => {
                if (!lhs_type.is_list && !rhs_type.is_list)
                    && (lhs_type == DdpType::TEXT || rhs_type == DdpType::TEXT)
                {
                    // text and char combinations produce text
                    if !both_in(&[DdpType::TEXT, DdpType::BUCHSTABE]) {
                        self.err_binary(range, lhs_type, rhs_type, op);
                        return None;
                    }
                    Some(DdpType::TEXT)
                } else {
                    if lhs_type.primitive != rhs_type.primitive {
                        self.err_binary(range, lhs_type, rhs_type, op);
                        return None;
                    }
                    Some(DdpType::list(lhs_type.primitive))
                }
            }
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Mal => {
                if !both_in(&[DdpType::ZAHL, DdpType::KOMMAZAHL]) {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                if lhs_type == DdpType::ZAHL && rhs_type == DdpType::ZAHL {
                    Some(DdpType::ZAHL)
                } else {
                    Some(DdpType::KOMMAZAHL)
                }
            }
            BinaryOp::Durch | BinaryOp::Hoch | BinaryOp::Logarithmus => {
                if !both_in(&[DdpType::ZAHL, DdpType::KOMMAZAHL]) {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                Some(DdpType::KOMMAZAHL)
            }
            BinaryOp::Modulo
            | BinaryOp::LogischUnd
            | BinaryOp::LogischOder
            | BinaryOp::Kontra
            | BinaryOp::Links
            | BinaryOp::Rechts => {
                if !both_in(&[DdpType::ZAHL]) {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                Some(DdpType::ZAHL)
            }
            BinaryOp::Und | BinaryOp::Oder => {
                if !both_in(&[DdpType::BOOLEAN]) {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                Some(DdpType::BOOLEAN)
            }
            BinaryOp::Gleich | BinaryOp::Ungleich => {
                if lhs_type != rhs_type {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                Some(DdpType::BOOLEAN)
            }
            BinaryOp::Kleiner | BinaryOp::KleinerOder | BinaryOp::Groesser | BinaryOp::GroesserOder => {
                if !both_in(&[DdpType::ZAHL, DdpType::KOMMAZAHL]) {
                    self.err_binary(range, lhs_type, rhs_type, op);
                    return None;
                }
                Some(DdpType::BOOLEAN)
            }
        }
    }

    fn check_cast(&mut self, target: DdpType, lhs: &Expr, range: Range) -> Option<DdpType> {
        let lhs_type = self.evaluate_required(lhs)?;
        if target.is_list {
            // only a value of the element type casts to a one-element list
            if lhs_type != target.element_type() {
                self.err(
                    ErrorCode::TypeInvalidCast,
                    range,
                    format!("Ein Ausdruck vom Typ {} kann nicht zu einer {} umgewandelt werden", lhs_type, target),
                );
                return None;
            }
            return Some(target);
        }
        let valid: &[DdpType] = match target.primitive {
            Primitive::Zahl => &[
                DdpType::ZAHL,
                DdpType::KOMMAZAHL,
                DdpType::BOOLEAN,
                DdpType::BUCHSTABE,
                DdpType::TEXT,
            ],
            Primitive::Kommazahl => &[DdpType::ZAHL, DdpType::KOMMAZAHL, DdpType::TEXT],
            Primitive::Boolean => &[DdpType::ZAHL, DdpType::BOOLEAN],
            Primitive::Buchstabe => &[DdpType::ZAHL, DdpType::BUCHSTABE],
            // everything, including lists, casts to its text representation
            Primitive::Text => {
                return Some(DdpType::TEXT);
            }
        };
        if !valid.contains(&lhs_type) {
            self.err(
                ErrorCode::TypeInvalidCast,
                range,
                format!("Ein Ausdruck vom Typ {} kann nicht zu einem {} umgewandelt werden", lhs_type, target),
            );
            return None;
        }
        Some(target)
    }

    fn check_call(&mut self, name: &str, args: &HashMap<String, Expr>) -> Option<DdpType> {
        let decl = Rc::clone(self.functions.get(name)?);
        for param in &decl.params {
            let Some(arg) = args.get(&param.name) else { continue };
            let arg_type = self.evaluate_required(arg);

            if param.is_reference {
                if !arg.is_assignable() {
                    self.err(
                        ErrorCode::TypeBadReference,
                        arg.range(),
                        "Es wurde ein Referenz-Typ erwartet aber ein Ausdruck gefunden".to_string(),
                    );
                } else if param.typ == DdpType::BUCHSTABE {
                    // a char inside a text is variable-width utf8 and must
                    // not be bound by reference
                    if let Expr::Indexing { lhs, .. } = arg {
                        if self.evaluate(lhs) == Some(DdpType::TEXT) {
                            self.err(
                                ErrorCode::TypeBadReference,
                                arg.range(),
                                "Ein Buchstabe in einem Text kann nicht als Buchstaben Referenz übergeben werden"
                                    .to_string(),
                            );
                        }
                    }
                }
            }

            if let Some(arg_type) = arg_type {
                if arg_type != param.typ {
                    self.err(
                        ErrorCode::TypeMismatch,
                        arg.range(),
                        format!(
                            "Die Funktion {} erwartet einen Wert vom Typ {} für den Parameter {}, aber hat {} bekommen",
                            name, param.typ, param.name, arg_type
                        ),
                    );
                }
            }
        }
        decl.return_type
    }
}

fn type_name_or_nichts(typ: Option<DdpType>) -> String {
    match typ {
        Some(typ) => typ.to_string(),
        None => "nichts".to_string(),
    }
}

/// The name of the called function if `expr` is a call (possibly
/// parenthesised) to a function that returns nothing.
fn void_call_decl(functions: &HashMap<String, Rc<FuncDecl>>, expr: &Expr) -> Option<String> {
    match expr {
        Expr::Grouping { expr, .. } => void_call_decl(functions, expr),
        Expr::Call { name, .. } => {
            let decl = functions.get(name)?;
            if decl.return_type.is_none() {
                Some(decl.name.clone())
            } else {
                None
            }
        }
        _ => None,
    }
}
