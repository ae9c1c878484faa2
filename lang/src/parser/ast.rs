//! Abstract syntax tree of a DDP translation unit.
//!
//! Closed tagged variants with exhaustive matches at each walker, so that
//! adding a node variant surfaces every site that needs updating.

use crate::lexer::token::{DdpType, Primitive, Range};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// der Betrag von
    Betrag,
    /// prefix '-'
    Negate,
    /// nicht (boolesch)
    Nicht,
    /// negiere (boolesch oder bitweise)
    Negiere,
    /// logisch nicht (bitweise)
    LogischNicht,
    /// die Länge von
    Laenge,
    /// die Größe von
    Groesse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mal,
    Durch,
    Modulo,
    Hoch,
    /// der Logarithmus von <lhs> zur Basis <rhs>
    Logarithmus,
    /// verkettet mit
    Verkettet,
    Und,
    Oder,
    LogischUnd,
    LogischOder,
    Kontra,
    /// um <n> Bit nach links verschoben
    Links,
    /// um <n> Bit nach rechts verschoben
    Rechts,
    Gleich,
    Ungleich,
    Kleiner,
    KleinerOder,
    Groesser,
    GroesserOder,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BinaryOp::Plus => "PLUS",
            BinaryOp::Minus => "MINUS",
            BinaryOp::Mal => "MAL",
            BinaryOp::Durch => "DURCH",
            BinaryOp::Modulo => "MODULO",
            BinaryOp::Hoch => "HOCH",
            BinaryOp::Logarithmus => "LOGARITHMUS",
            BinaryOp::Verkettet => "VERKETTET",
            BinaryOp::Und => "UND",
            BinaryOp::Oder => "ODER",
            BinaryOp::LogischUnd => "LOGISCH UND",
            BinaryOp::LogischOder => "LOGISCH ODER",
            BinaryOp::Kontra => "KONTRA",
            BinaryOp::Links => "LINKS",
            BinaryOp::Rechts => "RECHTS",
            BinaryOp::Gleich => "GLEICH",
            BinaryOp::Ungleich => "UNGLEICH",
            BinaryOp::Kleiner => "KLEINER",
            BinaryOp::KleinerOder => "KLEINER ODER",
            BinaryOp::Groesser => "GRÖßER",
            BinaryOp::GroesserOder => "GRÖßER ODER",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// sentinel inserted on syntax errors so later stages can keep running
    Bad { range: Range },
    IntLit { value: i64, range: Range },
    FloatLit { value: f64, range: Range },
    BoolLit { value: bool, range: Range },
    CharLit { value: char, range: Range },
    StringLit { value: String, range: Range },
    /// one of three list forms: explicit values, an empty list with a
    /// written element type, or count+value repetition
    ListLit {
        elem: Option<Primitive>,
        values: Option<Vec<Expr>>,
        count: Option<Box<Expr>>,
        value: Option<Box<Expr>>,
        range: Range,
    },
    Ident { name: String, range: Range },
    Indexing { lhs: Box<Expr>, index: Box<Expr>, range: Range },
    Unary { op: UnaryOp, rhs: Box<Expr>, range: Range },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, range: Range },
    /// <lhs> von <start> bis <end>
    Slice { lhs: Box<Expr>, start: Box<Expr>, end: Box<Expr>, range: Range },
    /// <lhs> als <target>
    Cast { target: DdpType, lhs: Box<Expr>, range: Range },
    /// der Standardwert von <typ>
    Default { typ: DdpType, range: Range },
    Grouping { expr: Box<Expr>, range: Range },
    /// a resolved alias call; args are keyed by parameter name
    Call { name: String, args: HashMap<String, Expr>, range: Range },
}

impl Expr {
    pub fn range(&self) -> Range {
        match self {
            Expr::Bad { range }
            | Expr::IntLit { range, .. }
            | Expr::FloatLit { range, .. }
            | Expr::BoolLit { range, .. }
            | Expr::CharLit { range, .. }
            | Expr::StringLit { range, .. }
            | Expr::ListLit { range, .. }
            | Expr::Ident { range, .. }
            | Expr::Indexing { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Slice { range, .. }
            | Expr::Cast { range, .. }
            | Expr::Default { range, .. }
            | Expr::Grouping { range, .. }
            | Expr::Call { range, .. } => *range,
        }
    }

    /// Whether the expression denotes a storage location.
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Ident { .. } => true,
            Expr::Indexing { lhs, .. } => lhs.is_assignable(),
            Expr::Grouping { expr, .. } => expr.is_assignable(),
            _ => false,
        }
    }
}

/// The target of an assignment
#[derive(Debug, Clone, PartialEq)]
pub enum Assignable {
    Ident { name: String, range: Range },
    Indexing { lhs: Box<Assignable>, index: Expr, range: Range },
}

impl Assignable {
    pub fn range(&self) -> Range {
        match self {
            Assignable::Ident { range, .. } | Assignable::Indexing { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub typ: DdpType,
    pub init: Expr,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub typ: DdpType,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    /// None for functions that return nothing
    pub return_type: Option<DdpType>,
    /// None for extern functions
    pub body: Option<Block>,
    /// the object/source file an extern function is defined in
    pub extern_file: Option<String>,
    /// surface alias patterns as written in the declaration
    pub aliases: Vec<String>,
    pub range: Range,
}

impl FuncDecl {
    pub fn is_extern(&self) -> bool {
        self.extern_file.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// pre-test loop: Solange <b>, mache: ...
    Solange,
    /// post-test loop: Mache: ... Solange <b>.
    MacheSolange,
    /// count-down loop: Wiederhole <n> Mal: ...
    Wiederhole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Bad { range: Range },
    VarDecl(VarDecl),
    FuncDecl(Rc<FuncDecl>),
    Expr { expr: Expr, range: Range },
    /// Speichere <rhs> in <target>.
    Assign { target: Assignable, rhs: Expr, range: Range },
    Block(Block),
    If { condition: Expr, then: Box<Stmt>, els: Option<Box<Stmt>>, range: Range },
    While { kind: LoopKind, condition: Expr, body: Box<Stmt>, range: Range },
    /// Für jede Zahl <counter> von <init> bis <to> [mit Schrittgröße <step>]
    For { counter: VarDecl, to: Expr, step: Option<Expr>, body: Box<Stmt>, range: Range },
    /// Für jede(n) <elem_type> <name> in <iter>
    ForEach { elem_type: DdpType, name: String, iter: Expr, body: Box<Stmt>, range: Range },
    /// Gib <value> zurück. / Kehre zurück.  `func` is the enclosing function.
    Return { value: Option<Expr>, func: String, range: Range },
}

impl Stmt {
    pub fn range(&self) -> Range {
        match self {
            Stmt::Bad { range } => *range,
            Stmt::VarDecl(decl) => decl.range,
            Stmt::FuncDecl(decl) => decl.range,
            Stmt::Expr { range, .. }
            | Stmt::Assign { range, .. }
            | Stmt::If { range, .. }
            | Stmt::While { range, .. }
            | Stmt::For { range, .. }
            | Stmt::ForEach { range, .. }
            | Stmt::Return { range, .. } => *range,
            Stmt::Block(block) => block.range,
        }
    }
}

/// A parsed translation unit.
#[derive(Debug)]
pub struct Ast {
    pub file: String,
    pub statements: Vec<Stmt>,
    /// the global function scope, filled during parsing so forward
    /// references within a file are allowed
    pub functions: HashMap<String, Rc<FuncDecl>>,
    /// set when any stage reported an error; suppresses code emission
    pub faulty: bool,
}

/// A tree of lexical scopes, realised as a stack during AST walks.
/// Child scopes look through to the parent on miss.
#[derive(Debug)]
pub struct ScopeStack<V> {
    scopes: Vec<HashMap<String, V>>,
}

impl<V> ScopeStack<V> {
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) -> HashMap<String, V> {
        debug_assert!(self.scopes.len() > 1, "global scope must not be popped");
        self.scopes.pop().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Insert into the innermost scope. Returns whether the name already
    /// existed there.
    pub fn declare(&mut self, name: &str, value: V) -> bool {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        scope.insert(name.to_string(), value).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl<V> Default for ScopeStack<V> {
    fn default() -> Self {
        Self::new()
    }
}
