//! Name resolution.
//!
//! Walks the AST in pre-order, declares names into block-local scopes and
//! checks every use against them. Loop counters are injected into the
//! loop body's scope, not a separate enclosing one, so that return
//! statements inside the body see them for cleanup.

#[cfg(test)]
mod tests;

use crate::error::{DdpError, DiagnosticSink, ErrorCode};
use crate::lexer::token::{DdpType, Range};
use crate::parser::ast::*;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Resolve all names of the AST, reporting into `errors`.
/// Marks the AST faulty when an error was found.
pub fn resolve(ast: &mut Ast, errors: &mut DiagnosticSink) {
    let mut resolver = Resolver {
        errors,
        file: ast.file.clone(),
        functions: &ast.functions,
        scopes: ScopeStack::new(),
        seen_functions: HashSet::new(),
        in_function: false,
        errored: false,
    };
    for stmt in &ast.statements {
        resolver.resolve_stmt(stmt);
    }
    if resolver.errored {
        ast.faulty = true;
    }
}

struct Resolver<'a> {
    errors: &'a mut DiagnosticSink,
    file: String,
    functions: &'a HashMap<String, Rc<FuncDecl>>,
    scopes: ScopeStack<DdpType>,
    seen_functions: HashSet<String>,
    in_function: bool,
    errored: bool,
}

impl Resolver<'_> {
    fn err(&mut self, code: ErrorCode, range: Range, msg: String) {
        self.errored = true;
        self.errors.report(DdpError::new(code, range, msg, self.file.clone()));
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Bad { .. } => self.errored = true,
            Stmt::VarDecl(decl) => self.resolve_var_decl(decl),
            Stmt::FuncDecl(decl) => self.resolve_func_decl(decl),
            Stmt::Expr { expr, .. } => self.resolve_expr(expr),
            Stmt::Assign { target, rhs, .. } => {
                self.resolve_assignable(target);
                self.resolve_expr(rhs);
            }
            Stmt::Block(block) => {
                self.scopes.push();
                for stmt in &block.statements {
                    self.resolve_stmt(stmt);
                }
                self.scopes.pop();
            }
            Stmt::If { condition, then, els, .. } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then);
                if let Some(els) = els {
                    self.resolve_stmt(els);
                }
            }
            Stmt::While { condition, body, .. } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::For { counter, to, step, body, .. } => {
                // the counter lives in the body's scope
                self.scopes.push();
                self.resolve_expr(&counter.init);
                self.scopes.declare(&counter.name, counter.typ);
                self.resolve_expr(to);
                if let Some(step) = step {
                    self.resolve_expr(step);
                }
                self.resolve_block_in_current_scope(body);
                self.scopes.pop();
            }
            Stmt::ForEach { elem_type, name, iter, body, .. } => {
                self.scopes.push();
                self.resolve_expr(iter);
                self.scopes.declare(name, *elem_type);
                self.resolve_block_in_current_scope(body);
                self.scopes.pop();
            }
            Stmt::Return { value, func, range } => {
                if !self.in_function || !self.functions.contains_key(func) {
                    self.err(
                        ErrorCode::NameReturnOutsideFunction,
                        *range,
                        "Man kann nur aus Funktionen einen Wert zurückgeben".to_string(),
                    );
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    /// Resolve a loop body without opening another scope, so declarations
    /// made by the loop header are part of the body's scope.
    fn resolve_block_in_current_scope(&mut self, body: &Stmt) {
        match body {
            Stmt::Block(block) => {
                for stmt in &block.statements {
                    self.resolve_stmt(stmt);
                }
            }
            other => self.resolve_stmt(other),
        }
    }

    fn resolve_var_decl(&mut self, decl: &VarDecl) {
        self.resolve_expr(&decl.init);
        if self.scopes.declare(&decl.name, decl.typ) {
            self.err(
                ErrorCode::NameDuplicate,
                decl.range,
                format!("Die Variable '{}' existiert bereits", decl.name),
            );
        }
    }

    fn resolve_func_decl(&mut self, decl: &Rc<FuncDecl>) {
        if !self.seen_functions.insert(decl.name.clone()) {
            self.err(
                ErrorCode::NameDuplicate,
                decl.range,
                format!("Die Funktion '{}' existiert bereits", decl.name),
            );
        }
        if let Some(body) = &decl.body {
            self.scopes.push();
            for param in &decl.params {
                self.scopes.declare(&param.name, param.typ);
            }
            self.in_function = true;
            for stmt in &body.statements {
                self.resolve_stmt(stmt);
            }
            self.in_function = false;
            self.scopes.pop();
        }
    }

    fn resolve_assignable(&mut self, target: &Assignable) {
        match target {
            Assignable::Ident { name, range } => {
                if self.scopes.lookup(name).is_none() {
                    self.err(
                        ErrorCode::NameUndeclared,
                        *range,
                        format!("Der Name '{}' wurde noch nicht als Variable deklariert", name),
                    );
                }
            }
            Assignable::Indexing { lhs, index, .. } => {
                self.resolve_assignable(lhs);
                self.resolve_expr(index);
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Bad { .. } => self.errored = true,
            Expr::IntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::BoolLit { .. }
            | Expr::CharLit { .. }
            | Expr::StringLit { .. }
            | Expr::Default { .. } => {}
            Expr::ListLit { values, count, value, .. } => {
                if let Some(values) = values {
                    for value in values {
                        self.resolve_expr(value);
                    }
                }
                if let Some(count) = count {
                    self.resolve_expr(count);
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Expr::Ident { name, range } => {
                if self.scopes.lookup(name).is_none() {
                    self.err(
                        ErrorCode::NameUndeclared,
                        *range,
                        format!(
                            "Der Name '{}' wurde noch nicht als Variable oder Funktions-Alias deklariert",
                            name
                        ),
                    );
                }
            }
            Expr::Indexing { lhs, index, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(index);
            }
            Expr::Unary { rhs, .. } => self.resolve_expr(rhs),
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            Expr::Slice { lhs, start, end, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(start);
                self.resolve_expr(end);
            }
            Expr::Cast { lhs, .. } => self.resolve_expr(lhs),
            Expr::Grouping { expr, .. } => self.resolve_expr(expr),
            Expr::Call { name, args, range } => {
                if !self.functions.contains_key(name) {
                    self.err(
                        ErrorCode::NameUnresolvedCall,
                        *range,
                        format!("Die Funktion '{}' wurde nicht deklariert", name),
                    );
                }
                for arg in args.values() {
                    self.resolve_expr(arg);
                }
            }
        }
    }
}
