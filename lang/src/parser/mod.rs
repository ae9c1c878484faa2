//! Recursive-descent parser with one-token lookahead.
//!
//! Declarations are entered into the global tables while parsing so that
//! forward references within a file work. Function call sites have no
//! dedicated syntax: at expression start the parser consults the alias
//! table and greedily attempts the longest pattern match, recursively
//! parsing sub-expressions at `<param>` holes. The longest match wins,
//! ties break by declaration order.

pub mod alias;
pub mod ast;

#[cfg(test)]
mod tests;

use crate::error::{msg_got_expected, DdpError, DiagnosticSink, ErrorCode};
use crate::lexer::token::{DdpType, Position, Primitive, Range, Token};
use crate::lexer::{char_literal_value, unescape_string, Scanner, TokenKind};

use alias::{Alias, AliasTable, PatternElement};
use ast::*;

use std::collections::HashMap;
use std::rc::Rc;

/// Parse a token stream into an AST.
pub fn parse(tokens: Vec<Token>, file: &str) -> (Ast, DiagnosticSink) {
    let mut parser = Parser::new(tokens, file);
    let ast = parser.parse_program();
    (ast, parser.errors)
}

pub struct Parser {
    tokens: Vec<Token>,
    cur: usize,
    /// parse limit used when re-visiting a deferred function body
    limit: Option<usize>,
    file: String,
    pub errors: DiagnosticSink,

    aliases: AliasTable,
    functions: HashMap<String, Rc<FuncDecl>>,
    /// variable types per scope, used to disambiguate alias overloads
    var_types: ScopeStack<DdpType>,
    current_function: Option<String>,
    /// trial parses (alias matching) must not report diagnostics
    suppress: usize,
    /// positions with an active alias parameter trial, guards recursion
    active_trials: Vec<usize>,
    errored: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: &str) -> Self {
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|tok| tok.kind != TokenKind::Comment)
            .collect();
        let mut parser = Self {
            tokens,
            cur: 0,
            limit: None,
            file: file.to_string(),
            errors: DiagnosticSink::new(),
            aliases: AliasTable::new(),
            functions: HashMap::new(),
            var_types: ScopeStack::new(),
            current_function: None,
            suppress: 0,
            active_trials: Vec::new(),
            errored: false,
        };
        parser.seed_inbuilt_functions();
        parser
    }

    pub fn parse_program(&mut self) -> Ast {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.statement());
        }
        Ast {
            file: self.file.clone(),
            statements,
            functions: self.functions.clone(),
            faulty: self.errored,
        }
    }

    /// The write builtins of the runtime library, declared like extern
    /// functions so the usual alias machinery handles their call sites.
    fn seed_inbuilt_functions(&mut self) {
        let builtins: [(&str, DdpType, &str); 10] = [
            ("Schreibe_Zahl", DdpType::ZAHL, "Schreibe <wert>"),
            ("Schreibe_Kommazahl", DdpType::KOMMAZAHL, "Schreibe <wert>"),
            ("Schreibe_Boolean", DdpType::BOOLEAN, "Schreibe <wert>"),
            ("Schreibe_Buchstabe", DdpType::BUCHSTABE, "Schreibe <wert>"),
            ("Schreibe_Text", DdpType::TEXT, "Schreibe <wert>"),
            ("Schreibe_Zahl_Zeile", DdpType::ZAHL, "Schreibe die Zeile <wert>"),
            ("Schreibe_Kommazahl_Zeile", DdpType::KOMMAZAHL, "Schreibe die Zeile <wert>"),
            ("Schreibe_Boolean_Zeile", DdpType::BOOLEAN, "Schreibe die Zeile <wert>"),
            ("Schreibe_Buchstabe_Zeile", DdpType::BUCHSTABE, "Schreibe die Zeile <wert>"),
            ("Schreibe_Text_Zeile", DdpType::TEXT, "Schreibe die Zeile <wert>"),
        ];

        for (name, typ, pattern) in builtins {
            let decl = Rc::new(FuncDecl {
                name: name.to_string(),
                params: vec![ParamDecl { name: "wert".to_string(), typ, is_reference: false }],
                return_type: None,
                body: None,
                extern_file: Some(String::new()),
                aliases: vec![pattern.to_string()],
                range: Range::new(Position::new(0, 0), Position::new(0, 0)),
            });
            self.register_function(Rc::clone(&decl));
            let literal = Token::new(
                TokenKind::String,
                pattern.to_string(),
                0,
                self.file.clone(),
                decl.range,
            );
            self.register_alias(&literal, &decl);
        }
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> Stmt {
        match self.peek().kind {
            TokenKind::Der | TokenKind::Die | TokenKind::Das => {
                if self.peek_at(1).kind == TokenKind::Funktion {
                    self.func_declaration()
                } else if is_type_start(self.peek_at(1).kind) {
                    self.var_declaration()
                } else {
                    self.expression_statement()
                }
            }
            TokenKind::Wenn => self.if_statement(),
            TokenKind::Solange => self.while_statement(),
            TokenKind::Mache => self.do_while_statement(),
            TokenKind::Wiederhole => self.repeat_statement(),
            TokenKind::Fuer => self.for_statement(),
            TokenKind::Gib | TokenKind::Kehre => self.return_statement(),
            TokenKind::Speichere => self.assign_statement(),
            TokenKind::Illegal => {
                let range = self.advance().range;
                self.errored = true;
                Stmt::Bad { range }
            }
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> Stmt {
        let start = self.peek().range;
        let expr = self.expression();
        if !self.expect(TokenKind::Dot, "'.'") {
            return self.bad_stmt(start);
        }
        let range = Range::new(start.start, self.previous_range().end);
        Stmt::Expr { expr, range }
    }

    /// `Der|Die|Das <Typ> <name> ist <Ausdruck>.`
    fn var_declaration(&mut self) -> Stmt {
        let start = self.advance().range; // article
        let typ = self.parse_type();
        let name_tok = self.peek().clone();
        if !self.expect(TokenKind::Identifier, "ein Name") {
            return self.bad_stmt(start);
        }
        if !self.expect(TokenKind::Ist, "'ist'") {
            return self.bad_stmt(start);
        }
        let init = self.expression();
        if !self.expect(TokenKind::Dot, "'.'") {
            return self.bad_stmt(start);
        }

        self.var_types.declare(&name_tok.literal, typ);
        let range = Range::new(start.start, self.previous_range().end);
        Stmt::VarDecl(VarDecl { name: name_tok.literal, typ, init, range })
    }

    /// `Speichere <Ausdruck> in <Zuweisbar>.`
    fn assign_statement(&mut self) -> Stmt {
        let start = self.advance().range; // Speichere
        let rhs = self.expression();
        if !self.expect(TokenKind::In, "'in'") {
            return self.bad_stmt(start);
        }
        let target = self.parse_assignable();
        if !self.expect(TokenKind::Dot, "'.'") {
            return self.bad_stmt(start);
        }
        let range = Range::new(start.start, self.previous_range().end);
        Stmt::Assign { target, rhs, range }
    }

    /// identifier, or `die <i>. Stelle von <Zuweisbar>` (possibly nested)
    fn parse_assignable(&mut self) -> Assignable {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Identifier => {
                self.advance();
                Assignable::Ident { name: tok.literal, range: tok.range }
            }
            TokenKind::Der | TokenKind::Die | TokenKind::Das => {
                self.advance();
                let index = self.unary();
                self.expect(TokenKind::Dot, "'.'");
                self.expect(TokenKind::Stelle, "'Stelle'");
                self.expect(TokenKind::Von, "'von'");
                let lhs = self.parse_assignable();
                let range = Range::new(tok.range.start, self.previous_range().end);
                Assignable::Indexing { lhs: Box::new(lhs), index, range }
            }
            _ => {
                self.err(
                    ErrorCode::SynExpectedAssignable,
                    tok.range,
                    msg_got_expected(&tok.literal, "ein zuweisbarer Ausdruck"),
                );
                self.advance();
                Assignable::Ident { name: String::new(), range: tok.range }
            }
        }
    }

    /// `Wenn <Bedingung>, dann: ...` with optional `Sonst: ...`
    fn if_statement(&mut self) -> Stmt {
        let wenn = self.advance(); // Wenn
        let indent = wenn.indent;
        let condition = self.expression();
        self.expect(TokenKind::Comma, "','");
        self.expect(TokenKind::Dann, "'dann'");

        let then: Box<Stmt> = if self.consume(TokenKind::Colon) {
            Box::new(Stmt::Block(self.parse_block(indent)))
        } else {
            Box::new(self.statement())
        };

        let els = if self.peek().kind == TokenKind::Sonst && self.peek().indent == indent {
            self.advance();
            if self.consume(TokenKind::Colon) {
                Some(Box::new(Stmt::Block(self.parse_block(indent))))
            } else if self.peek().kind == TokenKind::Wenn {
                Some(Box::new(self.if_statement()))
            } else {
                Some(Box::new(self.statement()))
            }
        } else {
            None
        };

        let range = Range::new(wenn.range.start, self.previous_range().end);
        Stmt::If { condition, then, els, range }
    }

    /// `Solange <Bedingung>, mache: ...`
    fn while_statement(&mut self) -> Stmt {
        let tok = self.advance(); // Solange
        let condition = self.expression();
        self.expect(TokenKind::Comma, "','");
        self.expect(TokenKind::Mache, "'mache'");
        self.expect(TokenKind::Colon, "':'");
        let body = Box::new(Stmt::Block(self.parse_block(tok.indent)));
        let range = Range::new(tok.range.start, self.previous_range().end);
        Stmt::While { kind: LoopKind::Solange, condition, body, range }
    }

    /// `Mache: ... Solange <Bedingung>.`
    fn do_while_statement(&mut self) -> Stmt {
        let tok = self.advance(); // Mache
        self.expect(TokenKind::Colon, "':'");
        let body = Box::new(Stmt::Block(self.parse_block(tok.indent)));
        self.expect(TokenKind::Solange, "'solange'");
        let condition = self.expression();
        self.expect(TokenKind::Dot, "'.'");
        let range = Range::new(tok.range.start, self.previous_range().end);
        Stmt::While { kind: LoopKind::MacheSolange, condition, body, range }
    }

    /// `Wiederhole <Anzahl> Mal: ...`
    fn repeat_statement(&mut self) -> Stmt {
        let tok = self.advance(); // Wiederhole
        let condition = self.unary();
        self.expect(TokenKind::Mal, "'Mal'");
        self.expect(TokenKind::Colon, "':'");
        let body = Box::new(Stmt::Block(self.parse_block(tok.indent)));
        let range = Range::new(tok.range.start, self.previous_range().end);
        Stmt::While { kind: LoopKind::Wiederhole, condition, body, range }
    }

    /// numeric for and for-each, both introduced by `Für jede(n) <Typ> <name>`
    fn for_statement(&mut self) -> Stmt {
        let tok = self.advance(); // Für
        if !matches!(self.peek().kind, TokenKind::Jede | TokenKind::Jeden | TokenKind::Jedes) {
            let got = self.peek().clone();
            self.err(ErrorCode::SynUnexpectedToken, got.range, msg_got_expected(&got.literal, "'jede'"));
        } else {
            self.advance();
        }

        let elem_type = self.parse_type_singular();
        let name_tok = self.peek().clone();
        if !self.expect(TokenKind::Identifier, "ein Name") {
            return self.bad_stmt(tok.range);
        }

        if self.consume(TokenKind::Von) {
            // counting loop
            if elem_type != Primitive::Zahl {
                self.err(
                    ErrorCode::TypeMismatch,
                    name_tok.range,
                    "Der Zähler einer zählenden Schleife muss eine Zahl sein".to_string(),
                );
            }
            let init = self.expression();
            self.expect(TokenKind::Bis, "'bis'");
            let to = self.expression();
            let step = if self.consume(TokenKind::Mit) {
                self.expect(TokenKind::Schrittgroesse, "'Schrittgröße'");
                Some(self.expression())
            } else {
                None
            };
            self.expect(TokenKind::Comma, "','");
            self.expect(TokenKind::Mache, "'mache'");
            self.expect(TokenKind::Colon, "':'");

            self.var_types.push();
            self.var_types.declare(&name_tok.literal, DdpType::ZAHL);
            let body = Box::new(Stmt::Block(self.parse_block(tok.indent)));
            self.var_types.pop();

            let counter_range = Range::new(name_tok.range.start, init.range().end);
            let counter =
                VarDecl { name: name_tok.literal, typ: DdpType::ZAHL, init, range: counter_range };
            let range = Range::new(tok.range.start, self.previous_range().end);
            Stmt::For { counter, to, step, body, range }
        } else {
            // iterating loop
            self.expect(TokenKind::In, "'in'");
            let iter = self.expression();
            self.expect(TokenKind::Comma, "','");
            self.expect(TokenKind::Mache, "'mache'");
            self.expect(TokenKind::Colon, "':'");

            let elem = DdpType::primitive(elem_type);
            self.var_types.push();
            self.var_types.declare(&name_tok.literal, elem);
            let body = Box::new(Stmt::Block(self.parse_block(tok.indent)));
            self.var_types.pop();

            let range = Range::new(tok.range.start, self.previous_range().end);
            Stmt::ForEach { elem_type: elem, name: name_tok.literal, iter, body, range }
        }
    }

    /// `Gib <Ausdruck> zurück.` / `Kehre zurück.`
    fn return_statement(&mut self) -> Stmt {
        let tok = self.advance();
        let value = if tok.kind == TokenKind::Gib { Some(self.expression()) } else { None };
        self.expect(TokenKind::Zurueck, "'zurück'");
        self.expect(TokenKind::Dot, "'.'");
        let range = Range::new(tok.range.start, self.previous_range().end);
        Stmt::Return { value, func: self.current_function.clone().unwrap_or_default(), range }
    }

    /// Statements more deeply indented than `parent_indent` form the block.
    fn parse_block(&mut self, parent_indent: usize) -> Block {
        let start = self.peek().range;
        self.var_types.push();
        let mut statements = Vec::new();
        while !self.at_end() && self.peek().indent > parent_indent {
            statements.push(self.statement());
        }
        self.var_types.pop();
        let end = if statements.is_empty() { start } else { self.previous_range() };
        Block { statements, range: Range::new(start.start, end.end) }
    }

    // ------------------------------------------------------------------
    // function declarations
    // ------------------------------------------------------------------

    fn func_declaration(&mut self) -> Stmt {
        let die = self.advance(); // article
        self.advance(); // Funktion
        let indent = die.indent;

        if !self.var_types.is_global() || self.current_function.is_some() {
            self.err(
                ErrorCode::SynUnexpectedToken,
                die.range,
                "Funktionen können nur im globalen Bereich deklariert werden".to_string(),
            );
        }

        let name_tok = self.peek().clone();
        if !self.expect(TokenKind::Identifier, "ein Funktions-Name") {
            return self.bad_stmt(die.range);
        }

        // parameter names and types
        let mut param_names: Vec<Token> = Vec::new();
        let mut param_types: Vec<(DdpType, bool)> = Vec::new();
        if self.consume(TokenKind::Mit) {
            if self.consume(TokenKind::Dem) {
                self.expect(TokenKind::Parameter, "'Parameter'");
            } else {
                self.expect(TokenKind::Den, "'den'");
                self.expect(TokenKind::Parametern, "'Parametern'");
            }
            param_names.push(self.peek().clone());
            self.expect(TokenKind::Identifier, "ein Parameter-Name");
            loop {
                if self.consume(TokenKind::Comma) {
                    param_names.push(self.peek().clone());
                    self.expect(TokenKind::Identifier, "ein Parameter-Name");
                } else if self.consume(TokenKind::Und) {
                    param_names.push(self.peek().clone());
                    self.expect(TokenKind::Identifier, "ein Parameter-Name");
                    break;
                } else {
                    break;
                }
            }

            self.expect(TokenKind::Vom, "'vom'");
            self.expect(TokenKind::Typ, "'Typ'");
            param_types.push(self.parse_param_type());
            loop {
                // the comma closing the clause is not a separator
                if self.peek().kind == TokenKind::Comma && is_type_start(self.peek_at(1).kind) {
                    self.advance();
                    param_types.push(self.parse_param_type());
                } else if self.consume(TokenKind::Und) {
                    param_types.push(self.parse_param_type());
                    break;
                } else {
                    break;
                }
            }

            if param_names.len() != param_types.len() {
                self.err(
                    ErrorCode::SynUnexpectedToken,
                    name_tok.range,
                    format!(
                        "Es wurden {} Parameter-Namen aber {} Typen angegeben",
                        param_names.len(),
                        param_types.len()
                    ),
                );
            }
            self.expect(TokenKind::Comma, "','");
        }

        let params: Vec<ParamDecl> = param_names
            .iter()
            .zip(param_types.iter())
            .map(|(name, (typ, is_reference))| ParamDecl {
                name: name.literal.clone(),
                typ: *typ,
                is_reference: *is_reference,
            })
            .collect();

        // return clause; parameterless declarations still carry the
        // comma after the name
        self.consume(TokenKind::Comma);
        self.expect(TokenKind::Gibt, "'gibt'");
        let return_type = if self.consume(TokenKind::Nichts) {
            None
        } else {
            self.consume_article();
            Some(self.parse_type())
        };
        self.expect(TokenKind::Zurueck, "'zurück'");
        self.expect(TokenKind::Comma, "','");

        // body or extern clause; the body tokens are skipped for now and
        // parsed after the aliases are registered, so recursive calls
        // through an alias resolve
        let mut extern_file = None;
        let mut body_span: Option<(usize, usize)> = None;
        if self.consume(TokenKind::Macht) {
            self.expect(TokenKind::Colon, "':'");
            let body_start = self.cur;
            while !self.at_end() && self.peek().indent > indent {
                self.advance();
            }
            body_span = Some((body_start, self.cur));
        } else {
            self.expect(TokenKind::Ist, "'ist'");
            self.expect(TokenKind::In, "'in'");
            let file_tok = self.peek().clone();
            if self.expect(TokenKind::String, "ein Text Literal") {
                extern_file = Some(unescape_string(&file_tok.literal));
            }
            self.expect(TokenKind::Definiert, "'definiert'");
            self.expect(TokenKind::Comma, "','");
        }

        // alias clause
        self.expect(TokenKind::Und, "'und'");
        self.expect(TokenKind::Kann, "'kann'");
        self.expect(TokenKind::So, "'so'");
        self.expect(TokenKind::Benutzt, "'benutzt'");
        self.expect(TokenKind::Werden, "'werden'");
        self.expect(TokenKind::Colon, "':'");

        let mut alias_literals: Vec<Token> = Vec::new();
        if self.peek().kind == TokenKind::String {
            alias_literals.push(self.advance());
            while matches!(self.peek().kind, TokenKind::Comma | TokenKind::Oder) {
                self.advance();
                let tok = self.peek().clone();
                if self.expect(TokenKind::String, "ein Alias Text Literal") {
                    alias_literals.push(tok);
                }
            }
        } else {
            let got = self.peek().clone();
            self.err(
                ErrorCode::SynMalformedAlias,
                got.range,
                msg_got_expected(&got.literal, "ein Alias Text Literal"),
            );
        }
        self.expect(TokenKind::Dot, "'.'");

        let end = self.previous_range();
        let mut decl = FuncDecl {
            name: name_tok.literal.clone(),
            params,
            return_type,
            body: None,
            extern_file,
            aliases: alias_literals.iter().map(|tok| unescape_string(&tok.literal)).collect(),
            range: Range::new(die.range.start, end.end),
        };

        // register the function and its aliases before the body is parsed
        let probe = Rc::new(decl.clone());
        self.register_function(Rc::clone(&probe));
        for tok in &alias_literals {
            self.register_alias(tok, &probe);
        }

        // deferred body parse
        if let Some((start, stop)) = body_span {
            let after = self.cur;
            let old_limit = self.limit;
            self.cur = start;
            self.limit = Some(stop);
            self.current_function = Some(decl.name.clone());

            self.var_types.push();
            for param in &decl.params {
                self.var_types.declare(&param.name, param.typ);
            }
            let body = self.parse_block(indent);
            self.var_types.pop();

            self.current_function = None;
            self.cur = after;
            self.limit = old_limit;
            decl.body = Some(body);
        }

        let decl = Rc::new(decl);
        // replace the body-less probe so later stages see the full
        // declaration; a duplicate name keeps its first declaration
        if self.functions.get(&decl.name).is_some_and(|existing| Rc::ptr_eq(existing, &probe)) {
            self.functions.insert(decl.name.clone(), Rc::clone(&decl));
        }
        Stmt::FuncDecl(decl)
    }

    fn register_function(&mut self, decl: Rc<FuncDecl>) {
        // duplicate declarations are diagnosed by the resolver; first wins
        self.functions.entry(decl.name.clone()).or_insert(decl);
    }

    /// Scan an alias string literal in alias mode and insert the pattern
    /// into the alias table.
    fn register_alias(&mut self, literal: &Token, decl: &Rc<FuncDecl>) {
        let pattern_src = unescape_string(&literal.literal);
        let mut scanner = Scanner::for_alias(&pattern_src, &self.file);
        let tokens = scanner.scan_all();
        let scan_errors = std::mem::take(&mut scanner.errors);
        let had_scan_errors = scan_errors.has_errors();
        self.errors.extend(scan_errors);
        if had_scan_errors {
            self.errored = true;
            return;
        }

        let mut elements = Vec::new();
        let mut seen_params: Vec<String> = Vec::new();
        for tok in tokens {
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::AliasParameter => {
                    let name = tok.literal.trim_matches(|c| c == '<' || c == '>').to_string();
                    let Some(param) = decl.params.iter().find(|p| p.name == name) else {
                        self.err(
                            ErrorCode::SynMalformedAlias,
                            literal.range,
                            format!(
                                "Der Alias-Parameter <{}> ist kein Parameter der Funktion {}",
                                name, decl.name
                            ),
                        );
                        return;
                    };
                    if seen_params.contains(&name) {
                        self.err(
                            ErrorCode::SynMalformedAlias,
                            literal.range,
                            format!("Der Alias-Parameter <{}> kommt mehrmals vor", name),
                        );
                        return;
                    }
                    seen_params.push(name.clone());
                    elements.push(PatternElement::Param {
                        name,
                        typ: param.typ,
                        is_reference: param.is_reference,
                    });
                }
                TokenKind::Identifier => elements.push(PatternElement::Ident(tok.literal)),
                kind => elements.push(PatternElement::Keyword(kind)),
            }
        }

        if seen_params.len() != decl.params.len() {
            self.err(
                ErrorCode::SynMalformedAlias,
                literal.range,
                format!("Der Alias '{}' nennt nicht alle Parameter der Funktion {}", pattern_src, decl.name),
            );
            return;
        }
        if elements.is_empty() {
            self.err(
                ErrorCode::SynMalformedAlias,
                literal.range,
                "Ein Alias darf nicht leer sein".to_string(),
            );
            return;
        }

        let alias = Alias { pattern: elements, func: decl.name.clone(), source: pattern_src.clone() };
        if let Some(existing) = self.aliases.insert(alias) {
            let msg = format!(
                "Der Alias '{}' existiert bereits für die Funktion {}",
                pattern_src, existing.func
            );
            self.errors.report(DdpError::warning(
                ErrorCode::SynDuplicateAlias,
                literal.range,
                msg,
                self.file.clone(),
            ));
        }
    }

    // ------------------------------------------------------------------
    // types
    // ------------------------------------------------------------------

    /// `Zahl`, `Zahlen Liste`, `Text`, `Text Liste`, ...
    fn parse_type(&mut self) -> DdpType {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Zahl => DdpType::ZAHL,
            TokenKind::Kommazahl => DdpType::KOMMAZAHL,
            TokenKind::Buchstabe => DdpType::BUCHSTABE,
            TokenKind::Boolean => {
                if self.consume(TokenKind::Liste) {
                    DdpType::list(Primitive::Boolean)
                } else {
                    DdpType::BOOLEAN
                }
            }
            TokenKind::Text => {
                if self.consume(TokenKind::Liste) {
                    DdpType::list(Primitive::Text)
                } else {
                    DdpType::TEXT
                }
            }
            TokenKind::Zahlen => {
                self.expect(TokenKind::Liste, "'Liste'");
                DdpType::list(Primitive::Zahl)
            }
            TokenKind::Kommazahlen => {
                self.expect(TokenKind::Liste, "'Liste'");
                DdpType::list(Primitive::Kommazahl)
            }
            TokenKind::Buchstaben => {
                self.expect(TokenKind::Liste, "'Liste'");
                DdpType::list(Primitive::Buchstabe)
            }
            _ => {
                self.err(
                    ErrorCode::SynUnexpectedToken,
                    tok.range,
                    msg_got_expected(&tok.literal, "ein Typ-Name"),
                );
                DdpType::ZAHL
            }
        }
    }

    /// a singular primitive type name (for-each element types)
    fn parse_type_singular(&mut self) -> Primitive {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Zahl => Primitive::Zahl,
            TokenKind::Kommazahl => Primitive::Kommazahl,
            TokenKind::Boolean => Primitive::Boolean,
            TokenKind::Buchstabe | TokenKind::Buchstaben => Primitive::Buchstabe,
            TokenKind::Text => Primitive::Text,
            _ => {
                self.err(
                    ErrorCode::SynUnexpectedToken,
                    tok.range,
                    msg_got_expected(&tok.literal, "ein Typ-Name"),
                );
                Primitive::Zahl
            }
        }
    }

    /// parameter types additionally allow the `Referenz` forms:
    /// `Zahlen Referenz`, `Text Referenz`, `Zahlen Liste Referenz`, ...
    fn parse_param_type(&mut self) -> (DdpType, bool) {
        let tok = self.advance();
        let plural = |parser: &mut Self, primitive: Primitive| {
            if parser.consume(TokenKind::Liste) {
                let is_ref = parser.consume(TokenKind::Referenz);
                (DdpType::list(primitive), is_ref)
            } else if parser.consume(TokenKind::Referenz) {
                (DdpType::primitive(primitive), true)
            } else {
                parser.err(
                    ErrorCode::SynUnexpectedToken,
                    tok.range,
                    msg_got_expected(&tok.literal, "'Liste' oder 'Referenz'"),
                );
                (DdpType::primitive(primitive), false)
            }
        };
        match tok.kind {
            TokenKind::Zahl => (DdpType::ZAHL, false),
            TokenKind::Kommazahl => (DdpType::KOMMAZAHL, false),
            TokenKind::Buchstabe => (DdpType::BUCHSTABE, false),
            TokenKind::Zahlen => plural(self, Primitive::Zahl),
            TokenKind::Kommazahlen => plural(self, Primitive::Kommazahl),
            TokenKind::Buchstaben => plural(self, Primitive::Buchstabe),
            TokenKind::Boolean => {
                if self.consume(TokenKind::Liste) {
                    (DdpType::list(Primitive::Boolean), self.consume(TokenKind::Referenz))
                } else {
                    (DdpType::BOOLEAN, self.consume(TokenKind::Referenz))
                }
            }
            TokenKind::Text => {
                if self.consume(TokenKind::Liste) {
                    (DdpType::list(Primitive::Text), self.consume(TokenKind::Referenz))
                } else {
                    (DdpType::TEXT, self.consume(TokenKind::Referenz))
                }
            }
            _ => {
                self.err(
                    ErrorCode::SynUnexpectedToken,
                    tok.range,
                    msg_got_expected(&tok.literal, "ein Typ-Name"),
                );
                (DdpType::ZAHL, false)
            }
        }
    }

    fn consume_article(&mut self) {
        if matches!(
            self.peek().kind,
            TokenKind::Eine | TokenKind::Einen | TokenKind::Einem | TokenKind::Einer
        ) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    pub fn expression(&mut self) -> Expr {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Expr {
        let mut expr = self.logical_and();
        while self.peek().kind == TokenKind::Oder {
            self.advance();
            let rhs = self.logical_and();
            expr = binary(BinaryOp::Oder, expr, rhs);
        }
        expr
    }

    fn logical_and(&mut self) -> Expr {
        let mut expr = self.bitwise();
        while self.peek().kind == TokenKind::Und {
            self.advance();
            let rhs = self.bitwise();
            expr = binary(BinaryOp::Und, expr, rhs);
        }
        expr
    }

    /// `logisch und`, `logisch oder`, `kontra`
    fn bitwise(&mut self) -> Expr {
        let mut expr = self.equality();
        loop {
            let op = match (self.peek().kind, self.peek_at(1).kind) {
                (TokenKind::Logisch, TokenKind::Und) => {
                    self.advance();
                    self.advance();
                    BinaryOp::LogischUnd
                }
                (TokenKind::Logisch, TokenKind::Oder) => {
                    self.advance();
                    self.advance();
                    BinaryOp::LogischOder
                }
                (TokenKind::Logisch, TokenKind::Kontra) => {
                    self.advance();
                    self.advance();
                    BinaryOp::Kontra
                }
                (TokenKind::Kontra, _) => {
                    self.advance();
                    BinaryOp::Kontra
                }
                _ => break,
            };
            let rhs = self.equality();
            expr = binary(op, expr, rhs);
        }
        expr
    }

    fn equality(&mut self) -> Expr {
        let mut expr = self.slice();
        loop {
            let op = match self.peek().kind {
                TokenKind::Gleich => BinaryOp::Gleich,
                TokenKind::Ungleich => BinaryOp::Ungleich,
                _ => break,
            };
            self.advance();
            let rhs = self.slice();
            expr = binary(op, expr, rhs);
        }
        expr
    }

    /// `<e> von <a> bis <b>`
    fn slice(&mut self) -> Expr {
        let mut expr = self.comparison();
        while self.peek().kind == TokenKind::Von {
            self.advance();
            let start = self.comparison();
            self.expect(TokenKind::Bis, "'bis'");
            let end = self.comparison();
            let range = Range::new(expr.range().start, end.range().end);
            expr = Expr::Slice {
                lhs: Box::new(expr),
                start: Box::new(start),
                end: Box::new(end),
                range,
            };
        }
        expr
    }

    /// `kleiner als [oder gleich]`, `größer als [oder gleich]`
    fn comparison(&mut self) -> Expr {
        let mut expr = self.shift();
        loop {
            let smaller = match self.peek().kind {
                TokenKind::Kleiner => true,
                TokenKind::Groesser => false,
                _ => break,
            };
            self.advance();
            self.expect(TokenKind::Als, "'als'");
            let or_equal =
                self.peek().kind == TokenKind::Oder && self.peek_at(1).kind == TokenKind::Gleich;
            if or_equal {
                self.advance();
                self.advance();
            }
            let op = match (smaller, or_equal) {
                (true, false) => BinaryOp::Kleiner,
                (true, true) => BinaryOp::KleinerOder,
                (false, false) => BinaryOp::Groesser,
                (false, true) => BinaryOp::GroesserOder,
            };
            let rhs = self.shift();
            expr = binary(op, expr, rhs);
        }
        expr
    }

    /// `<e> um <n> Bit nach links|rechts verschoben`
    fn shift(&mut self) -> Expr {
        let mut expr = self.concat();
        while self.peek().kind == TokenKind::Um {
            self.advance();
            let amount = self.concat();
            self.expect(TokenKind::Bit, "'Bit'");
            self.expect(TokenKind::Nach, "'nach'");
            let op = match self.peek().kind {
                TokenKind::Links => {
                    self.advance();
                    BinaryOp::Links
                }
                TokenKind::Rechts => {
                    self.advance();
                    BinaryOp::Rechts
                }
                _ => {
                    let got = self.peek().clone();
                    self.err(
                        ErrorCode::SynUnexpectedToken,
                        got.range,
                        msg_got_expected(&got.literal, "'links' oder 'rechts'"),
                    );
                    BinaryOp::Links
                }
            };
            self.expect(TokenKind::Verschoben, "'verschoben'");
            expr = binary(op, expr, amount);
        }
        expr
    }

    /// `verkettet mit`
    fn concat(&mut self) -> Expr {
        let mut expr = self.additive();
        while self.peek().kind == TokenKind::Verkettet {
            self.advance();
            self.expect(TokenKind::Mit, "'mit'");
            let rhs = self.additive();
            expr = binary(BinaryOp::Verkettet, expr, rhs);
        }
        expr
    }

    fn additive(&mut self) -> Expr {
        let mut expr = self.multiplicative();
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Plus,
                TokenKind::Minus => BinaryOp::Minus,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative();
            expr = binary(op, expr, rhs);
        }
        expr
    }

    fn multiplicative(&mut self) -> Expr {
        let mut expr = self.power();
        loop {
            let op = match self.peek().kind {
                TokenKind::Mal => BinaryOp::Mal,
                TokenKind::Durch => BinaryOp::Durch,
                TokenKind::Modulo => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let rhs = self.power();
            expr = binary(op, expr, rhs);
        }
        expr
    }

    fn power(&mut self) -> Expr {
        let expr = self.unary();
        if self.peek().kind == TokenKind::Hoch {
            self.advance();
            let rhs = self.power();
            return binary(BinaryOp::Hoch, expr, rhs);
        }
        expr
    }

    fn unary(&mut self) -> Expr {
        // alias calls bind tightest of all word forms
        if let Some(call) = self.try_alias_call() {
            return call;
        }

        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Negate => {
                self.advance();
                let rhs = self.unary();
                return unary(UnaryOp::Negate, tok.range, rhs);
            }
            TokenKind::Nicht => {
                self.advance();
                let rhs = self.unary();
                return unary(UnaryOp::Nicht, tok.range, rhs);
            }
            TokenKind::Negiere => {
                self.advance();
                let rhs = self.unary();
                return unary(UnaryOp::Negiere, tok.range, rhs);
            }
            TokenKind::Logisch if self.peek_at(1).kind == TokenKind::Nicht => {
                self.advance();
                self.advance();
                let rhs = self.unary();
                return unary(UnaryOp::LogischNicht, tok.range, rhs);
            }
            TokenKind::Der | TokenKind::Die | TokenKind::Das => {
                return self.article_expression();
            }
            _ => {}
        }

        self.cast()
    }

    /// word operators and indexing introduced by an article:
    /// `der Betrag von`, `die Länge von`, `die Größe von`,
    /// `der Logarithmus von ... zur Basis ...`, `der Standardwert von ...`,
    /// `die <i>. Stelle von <e>`
    fn article_expression(&mut self) -> Expr {
        let article = self.advance();
        match self.peek().kind {
            TokenKind::Betrag => {
                self.advance();
                self.expect(TokenKind::Von, "'von'");
                let rhs = self.unary();
                unary(UnaryOp::Betrag, article.range, rhs)
            }
            TokenKind::Laenge => {
                self.advance();
                self.expect(TokenKind::Von, "'von'");
                let rhs = self.unary();
                unary(UnaryOp::Laenge, article.range, rhs)
            }
            TokenKind::Groesse => {
                self.advance();
                self.expect(TokenKind::Von, "'von'");
                let rhs = self.unary();
                unary(UnaryOp::Groesse, article.range, rhs)
            }
            TokenKind::Logarithmus => {
                self.advance();
                self.expect(TokenKind::Von, "'von'");
                let lhs = self.unary();
                self.expect(TokenKind::Zur, "'zur'");
                self.expect(TokenKind::Basis, "'Basis'");
                let rhs = self.unary();
                let range = Range::new(article.range.start, rhs.range().end);
                Expr::Binary { op: BinaryOp::Logarithmus, lhs: Box::new(lhs), rhs: Box::new(rhs), range }
            }
            TokenKind::Standardwert => {
                self.advance();
                self.expect(TokenKind::Von, "'von'");
                self.consume_article();
                let typ = self.parse_type();
                let range = Range::new(article.range.start, self.previous_range().end);
                Expr::Default { typ, range }
            }
            _ => {
                // `die <i>. Stelle von <e>`
                let index = self.unary();
                self.expect(TokenKind::Dot, "'.'");
                self.expect(TokenKind::Stelle, "'Stelle'");
                self.expect(TokenKind::Von, "'von'");
                let lhs = self.unary();
                let range = Range::new(article.range.start, lhs.range().end);
                Expr::Indexing { lhs: Box::new(lhs), index: Box::new(index), range }
            }
        }
    }

    /// `<e> als <Typ>`, with trailing `ist`/`sind` consumed as noise
    fn cast(&mut self) -> Expr {
        let mut expr = self.primary();
        loop {
            match self.peek().kind {
                TokenKind::Als => {
                    self.advance();
                    self.consume_article();
                    let target = self.parse_type();
                    let range = Range::new(expr.range().start, self.previous_range().end);
                    expr = Expr::Cast { target, lhs: Box::new(expr), range };
                }
                TokenKind::Ist | TokenKind::Sind => {
                    self.advance();
                }
                _ => break,
            }
        }
        expr
    }

    fn primary(&mut self) -> Expr {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int => {
                self.advance();
                let value = tok.literal.parse::<i64>().unwrap_or_else(|_| {
                    self.err(
                        ErrorCode::SynUnexpectedToken,
                        tok.range,
                        format!("Die Zahl '{}' ist zu groß", tok.literal),
                    );
                    0
                });
                Expr::IntLit { value, range: tok.range }
            }
            TokenKind::Float => {
                self.advance();
                let value = tok.literal.replace(',', ".").parse::<f64>().unwrap_or(0.0);
                Expr::FloatLit { value, range: tok.range }
            }
            TokenKind::Wahr => {
                self.advance();
                Expr::BoolLit { value: true, range: tok.range }
            }
            TokenKind::Falsch => {
                self.advance();
                Expr::BoolLit { value: false, range: tok.range }
            }
            TokenKind::Char => {
                self.advance();
                let value = char_literal_value(&tok.literal).unwrap_or('\0');
                Expr::CharLit { value, range: tok.range }
            }
            TokenKind::String => {
                self.advance();
                Expr::StringLit { value: unescape_string(&tok.literal), range: tok.range }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression();
                self.expect(TokenKind::RParen, "')'");
                let range = Range::new(tok.range.start, self.previous_range().end);
                Expr::Grouping { expr: Box::new(expr), range }
            }
            TokenKind::Eine | TokenKind::Einen | TokenKind::Einer | TokenKind::Einem => {
                self.list_literal()
            }
            TokenKind::Identifier => {
                self.advance();
                Expr::Ident { name: tok.literal, range: tok.range }
            }
            _ => {
                self.err(
                    ErrorCode::SynExpectedExpression,
                    tok.range,
                    msg_got_expected(&tok.literal, "ein Ausdruck"),
                );
                self.advance();
                Expr::Bad { range: tok.range }
            }
        }
    }

    /// the three list literal forms:
    /// `eine Liste, die aus <e1>, <e2> und <e3> besteht`
    /// `eine leere Zahlen Liste`
    /// `eine Liste, die <n> Mal <w> enthält`
    fn list_literal(&mut self) -> Expr {
        let start = self.advance(); // article
        if self.consume(TokenKind::Leere) {
            let elem = match self.peek().kind {
                TokenKind::Zahlen => Primitive::Zahl,
                TokenKind::Kommazahlen => Primitive::Kommazahl,
                TokenKind::Boolean => Primitive::Boolean,
                TokenKind::Buchstaben => Primitive::Buchstabe,
                TokenKind::Text => Primitive::Text,
                _ => {
                    let got = self.peek().clone();
                    self.err(
                        ErrorCode::SynUnexpectedToken,
                        got.range,
                        msg_got_expected(&got.literal, "ein Element-Typ"),
                    );
                    Primitive::Zahl
                }
            };
            self.advance();
            self.expect(TokenKind::Liste, "'Liste'");
            let range = Range::new(start.range.start, self.previous_range().end);
            return Expr::ListLit { elem: Some(elem), values: None, count: None, value: None, range };
        }

        self.expect(TokenKind::Liste, "'Liste'");
        self.expect(TokenKind::Comma, "','");
        self.expect(TokenKind::Die, "'die'");

        if self.consume(TokenKind::Aus) {
            // elements parse below the `und` level, the final element is
            // joined with `und`
            let mut values = vec![self.bitwise()];
            loop {
                if self.consume(TokenKind::Comma) {
                    values.push(self.bitwise());
                } else if self.consume(TokenKind::Und) {
                    values.push(self.bitwise());
                    break;
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Besteht, "'besteht'");
            let range = Range::new(start.range.start, self.previous_range().end);
            Expr::ListLit { elem: None, values: Some(values), count: None, value: None, range }
        } else {
            let count = self.unary();
            self.expect(TokenKind::Mal, "'Mal'");
            let value = self.unary();
            self.expect(TokenKind::Enthaelt, "'enthält'");
            let range = Range::new(start.range.start, self.previous_range().end);
            Expr::ListLit {
                elem: None,
                values: None,
                count: Some(Box::new(count)),
                value: Some(Box::new(value)),
                range,
            }
        }
    }

    // ------------------------------------------------------------------
    // alias matching
    // ------------------------------------------------------------------

    /// Attempt the longest alias pattern match at the current position.
    fn try_alias_call(&mut self) -> Option<Expr> {
        let start_cur = self.cur;
        let start_range = self.peek().range;
        let mut best: Option<MatchCandidate> = None;
        let mut args = Vec::new();
        self.alias_dfs(AliasTable::ROOT, 0, &mut args, &mut best);
        self.cur = start_cur;

        let candidate = best?;
        if candidate.depth == 0 {
            return None;
        }

        let completions = self.aliases.completions(candidate.node).to_vec();
        debug_assert!(!completions.is_empty());

        // among equally long matches the first declared alias whose
        // parameter types fit the (statically probed) argument types wins;
        // if none fits, keep the first so the typechecker can complain
        let chosen = completions
            .iter()
            .copied()
            .find(|&idx| self.alias_fits(idx, &candidate.args))
            .unwrap_or(completions[0]);

        let alias = self.aliases.alias(chosen).clone();
        let mut named_args = HashMap::new();
        for ((name, _, is_reference), arg) in alias.params().zip(candidate.args.iter()) {
            if is_reference && !arg.is_assignable() {
                self.err(
                    ErrorCode::SynExpectedAssignable,
                    arg.range(),
                    "Es wurde ein Referenz-Typ erwartet aber ein Ausdruck gefunden".to_string(),
                );
            }
            named_args.insert(name.to_string(), arg.clone());
        }

        self.cur = candidate.cur;
        let range = Range::new(start_range.start, self.previous_range().end);
        Some(Expr::Call { name: alias.func, args: named_args, range })
    }

    fn alias_dfs(
        &mut self,
        node: usize,
        depth: usize,
        args: &mut Vec<Expr>,
        best: &mut Option<MatchCandidate>,
    ) {
        if !self.aliases.completions(node).is_empty()
            && best.as_ref().map_or(true, |b| depth > b.depth)
        {
            *best = Some(MatchCandidate { depth, node, cur: self.cur, args: args.clone() });
        }

        // literal edge
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            if let Some(next) = self.aliases.next_literal(node, &tok) {
                let save = self.cur;
                self.cur += 1;
                self.alias_dfs(next, depth + 1, args, best);
                self.cur = save;
            }
        }

        // parameter edge: trial-parse a sub-expression. A hole-initial
        // pattern (param edge at the root) would re-enter itself at the
        // same position through the trial's expression parse, so root
        // trials are guarded per position; deeper holes always advance
        // the cursor first and terminate on their own.
        if let Some(next) = self.aliases.param_edge(node) {
            let at_root = node == AliasTable::ROOT;
            if !(at_root && self.active_trials.contains(&self.cur)) {
                let save = self.cur;
                let errors_before = self.errors.len();
                if at_root {
                    self.active_trials.push(save);
                }
                self.suppress += 1;
                let arg = self.unary();
                self.suppress -= 1;
                if at_root {
                    self.active_trials.pop();
                }
                let parse_ok = !matches!(arg, Expr::Bad { .. })
                    && self.cur > save
                    && self.errors.len() == errors_before;
                self.errors.truncate(errors_before);
                if parse_ok {
                    args.push(arg);
                    self.alias_dfs(next, depth + 1, args, best);
                    args.pop();
                }
                self.cur = save;
            }
        }
    }

    fn alias_fits(&self, idx: usize, args: &[Expr]) -> bool {
        let alias = self.aliases.alias(idx);
        if alias.param_count() != args.len() {
            return false;
        }
        alias.params().zip(args.iter()).all(|((_, typ, is_reference), arg)| {
            if is_reference && !arg.is_assignable() {
                return false;
            }
            match self.probe_type(arg) {
                Some(found) => found == typ,
                None => true,
            }
        })
    }

    /// Best-effort static type of an expression, used only to pick among
    /// alias overloads. The typechecker re-derives types with diagnostics.
    fn probe_type(&self, expr: &Expr) -> Option<DdpType> {
        match expr {
            Expr::Bad { .. } => None,
            Expr::IntLit { .. } => Some(DdpType::ZAHL),
            Expr::FloatLit { .. } => Some(DdpType::KOMMAZAHL),
            Expr::BoolLit { .. } => Some(DdpType::BOOLEAN),
            Expr::CharLit { .. } => Some(DdpType::BUCHSTABE),
            Expr::StringLit { .. } => Some(DdpType::TEXT),
            Expr::ListLit { elem, values, value, .. } => {
                if let Some(elem) = elem {
                    return Some(DdpType::list(*elem));
                }
                let probe_from = values.as_ref().and_then(|v| v.first()).or(value.as_deref())?;
                let elem = self.probe_type(probe_from)?;
                Some(DdpType::list(elem.primitive))
            }
            Expr::Ident { name, .. } => self.var_types.lookup(name).copied(),
            Expr::Indexing { lhs, .. } => {
                let lhs = self.probe_type(lhs)?;
                if lhs.is_list {
                    Some(lhs.element_type())
                } else {
                    Some(DdpType::BUCHSTABE)
                }
            }
            Expr::Unary { op, rhs, .. } => match op {
                UnaryOp::Betrag | UnaryOp::Negate | UnaryOp::Negiere => self.probe_type(rhs),
                UnaryOp::Nicht => Some(DdpType::BOOLEAN),
                UnaryOp::LogischNicht | UnaryOp::Laenge | UnaryOp::Groesse => Some(DdpType::ZAHL),
            },
            Expr::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Mal => {
                    let (l, r) = (self.probe_type(lhs)?, self.probe_type(rhs)?);
                    if l == DdpType::ZAHL && r == DdpType::ZAHL {
                        Some(DdpType::ZAHL)
                    } else {
                        Some(DdpType::KOMMAZAHL)
                    }
                }
                BinaryOp::Durch | BinaryOp::Hoch | BinaryOp::Logarithmus => {
                    Some(DdpType::KOMMAZAHL)
                }
                BinaryOp::Modulo
                | BinaryOp::LogischUnd
                | BinaryOp::LogischOder
                | BinaryOp::Kontra
                | BinaryOp::Links
                | BinaryOp::Rechts => Some(DdpType::ZAHL),
                BinaryOp::Und
                | BinaryOp::Oder
                | BinaryOp::Gleich
                | BinaryOp::Ungleich
                | BinaryOp::Kleiner
                | BinaryOp::KleinerOder
                | BinaryOp::Groesser
                | BinaryOp::GroesserOder => Some(DdpType::BOOLEAN),
                BinaryOp::Verkettet => {
                    let l = self.probe_type(lhs)?;
                    let r = self.probe_type(rhs)?;
                    if l.primitive == Primitive::Text || r.primitive == Primitive::Text {
                        if l.is_list || r.is_list {
                            Some(DdpType::list(Primitive::Text))
                        } else {
                            Some(DdpType::TEXT)
                        }
                    } else if l.primitive == Primitive::Buchstabe && !l.is_list && !r.is_list {
                        if r.primitive == Primitive::Text {
                            Some(DdpType::TEXT)
                        } else {
                            Some(DdpType::list(Primitive::Buchstabe))
                        }
                    } else {
                        Some(DdpType::list(l.primitive))
                    }
                }
            },
            Expr::Slice { lhs, .. } => self.probe_type(lhs),
            Expr::Cast { target, .. } => Some(*target),
            Expr::Default { typ, .. } => Some(*typ),
            Expr::Grouping { expr, .. } => self.probe_type(expr),
            Expr::Call { name, .. } => {
                self.functions.get(name).and_then(|decl| decl.return_type)
            }
        }
    }

    // ------------------------------------------------------------------
    // plumbing
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        let limit = self.limit.unwrap_or(self.tokens.len().saturating_sub(1));
        self.cur >= limit || self.tokens[self.cur].kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        self.token_at(self.cur)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.token_at(self.cur + offset)
    }

    fn token_at(&self, index: usize) -> &Token {
        let limit = self.limit.unwrap_or(self.tokens.len().saturating_sub(1));
        if index >= limit {
            // the scanner always terminates the stream with EOF
            &self.tokens[self.tokens.len() - 1]
        } else {
            &self.tokens[index]
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if !self.at_end() {
            self.cur += 1;
        }
        tok
    }

    fn previous_range(&self) -> Range {
        if self.cur == 0 {
            self.tokens[0].range
        } else {
            self.tokens[self.cur - 1].range
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> bool {
        if self.consume(kind) {
            return true;
        }
        let got = self.peek().clone();
        self.err(
            ErrorCode::SynUnexpectedToken,
            got.range,
            msg_got_expected(&got.literal, expected),
        );
        false
    }

    fn err(&mut self, code: ErrorCode, range: Range, msg: String) {
        if self.suppress > 0 {
            // trial parses still count towards match failure via the
            // diagnostics length check in alias_dfs
            self.errors.report(DdpError::new(code, range, msg, self.file.clone()));
            return;
        }
        self.errored = true;
        self.errors.report(DdpError::new(code, range, msg, self.file.clone()));
    }

    /// error recovery: skip to the next statement terminator
    fn bad_stmt(&mut self, start: Range) -> Stmt {
        self.errored = true;
        while !self.at_end() && self.peek().kind != TokenKind::Dot {
            self.advance();
        }
        self.consume(TokenKind::Dot);
        Stmt::Bad { range: Range::new(start.start, self.previous_range().end) }
    }
}

struct MatchCandidate {
    depth: usize,
    node: usize,
    cur: usize,
    args: Vec<Expr>,
}

fn is_type_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Zahl
            | TokenKind::Kommazahl
            | TokenKind::Boolean
            | TokenKind::Buchstabe
            | TokenKind::Text
            | TokenKind::Zahlen
            | TokenKind::Kommazahlen
            | TokenKind::Buchstaben
    )
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let range = Range::new(lhs.range().start, rhs.range().end);
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), range }
}

fn unary(op: UnaryOp, start: Range, rhs: Expr) -> Expr {
    let range = Range::new(start.start, rhs.range().end);
    Expr::Unary { op, rhs: Box::new(rhs), range }
}
