//! The scanner: UTF-8 source text in, DDP tokens out.
//!
//! Includes (`Binde "..." ein.`) are scanned inline by delegating to a
//! nested scanner until it reaches EOF; a set of canonicalised paths
//! prevents double inclusion. In alias mode `<name>` produces
//! `AliasParameter` tokens.

pub mod token;

#[cfg(test)]
mod tests;

pub use token::{Token, TokenKind};
use token::{keyword_kind, Position, Range};

use crate::ddppath;
use crate::error::{msg_got_expected, DdpError, DiagnosticSink, ErrorCode};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Scanner operating mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    /// report capitalization errors after '.' and ':'
    pub strict_capitalization: bool,
    /// interpret the input as an alias pattern (enables `<name>` syntax)
    pub alias: bool,
}

pub struct Scanner {
    file: String,
    src: Vec<char>,
    mode: Mode,
    pub errors: DiagnosticSink,

    include: Option<Box<Scanner>>,
    included_files: HashSet<PathBuf>,

    start: usize,
    cur: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    indent: usize,
    should_indent: bool,
    should_capitalize: bool,
}

/// Scan a whole source string (used by tests and the benchmark harness).
pub fn scan_source(file: &str, src: &str, mode: Mode) -> (Vec<Token>, DiagnosticSink) {
    let mut scanner = Scanner::from_source(file, src, mode);
    let tokens = scanner.scan_all();
    (tokens, scanner.errors)
}

impl Scanner {
    /// Create a scanner over in-memory source text.
    pub fn from_source(file: &str, src: &str, mode: Mode) -> Self {
        Self {
            file: file.to_string(),
            src: src.chars().collect(),
            mode,
            errors: DiagnosticSink::new(),
            include: None,
            included_files: HashSet::new(),
            start: 0,
            cur: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            indent: 0,
            should_indent: true,
            should_capitalize: true,
        }
    }

    /// Create a scanner that reads `file_path` from disk.
    pub fn from_file(file_path: &Path, mode: Mode) -> Result<Self, DdpError> {
        let zero = Range::new(Position::new(1, 1), Position::new(1, 1));
        let display = file_path.display().to_string();

        if file_path.extension().map_or(true, |ext| ext != "ddp") {
            return Err(DdpError::new(
                ErrorCode::LexMalformedIncludePath,
                zero,
                "Der angegebene Pfad ist keine .ddp Datei",
                display,
            ));
        }

        let bytes = std::fs::read(file_path).map_err(|err| {
            DdpError::new(
                ErrorCode::LexMalformedIncludePath,
                zero,
                format!("Die Datei konnte nicht gelesen werden: {}", err),
                display.clone(),
            )
        })?;
        let src = String::from_utf8(bytes).map_err(|_| {
            DdpError::new(
                ErrorCode::LexInvalidUtf8,
                zero,
                "Der Quelltext entspricht nicht dem UTF-8 Standard",
                display.clone(),
            )
        })?;

        let mut scanner = Self::from_source(&display, &src, mode);
        if let Ok(abs) = file_path.canonicalize() {
            scanner.included_files.insert(abs);
        }
        Ok(scanner)
    }

    /// Create a scanner over an alias pattern literal (the text between
    /// the quotes of an alias string).
    pub fn for_alias(pattern: &str, file: &str) -> Self {
        Self::from_source(file, pattern, Mode { strict_capitalization: false, alias: true })
    }

    /// Scan all tokens until EOF (inclusive).
    pub fn scan_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    /// Scan the next token, resolving includes transparently.
    pub fn next_token(&mut self) -> Token {
        if let Some(include) = self.include.as_mut() {
            let tok = include.next_token();
            if tok.kind != TokenKind::Eof {
                return tok;
            }
            let mut finished = self.include.take().unwrap();
            self.included_files.extend(finished.included_files.drain());
            let inner_errors = std::mem::take(&mut finished.errors);
            self.errors.extend(inner_errors);
        }

        self.skip_whitespace();
        self.start = self.cur;
        self.start_line = self.line;
        self.start_column = self.column;

        if self.at_end() {
            return self.new_token(TokenKind::Eof);
        }

        let ch = self.advance();

        if is_alpha(ch) {
            return self.identifier();
        }
        if ch.is_ascii_digit() {
            return self.number();
        }

        match ch {
            '-' => self.new_token(TokenKind::Negate),
            '.' => self.new_token(TokenKind::Dot),
            ',' => self.new_token(TokenKind::Comma),
            ':' => self.new_token(TokenKind::Colon),
            '(' => self.new_token(TokenKind::LParen),
            ')' => self.new_token(TokenKind::RParen),
            '"' => self.string(),
            '\'' => self.char(),
            '[' => self.comment(),
            '<' if self.mode.alias => self.alias_parameter(),
            _ => self.error_token(
                ErrorCode::LexUnexpectedCharacter,
                format!("Unerwartetes Zeichen '{}'", ch),
            ),
        }
    }

    /// `[ ... ]` with nested bracket tracking
    fn comment(&mut self) -> Token {
        let mut bracket_count = 1usize;
        while bracket_count > 0 && !self.at_end() {
            match self.peek() {
                '[' => bracket_count += 1,
                ']' => bracket_count -= 1,
                '\n' => self.increase_line_before_advance(),
                _ => {}
            }
            self.advance();
        }
        self.new_token(TokenKind::Comment)
    }

    fn scan_escape(&mut self, quote: char) {
        match self.peek_next() {
            Some(c) if matches!(c, 'a' | 'b' | 'n' | 'r' | 't' | '\\') || c == quote => {
                self.advance();
            }
            other => {
                let shown = other.map(String::from).unwrap_or_default();
                self.err(
                    ErrorCode::LexUnknownEscape,
                    format!("Unbekannte Escape Sequenz '\\{}'", shown),
                );
            }
        }
    }

    fn string(&mut self) -> Token {
        while !self.at_end() {
            match self.peek() {
                '"' => break,
                '\n' => self.increase_line_before_advance(),
                '\\' => self.scan_escape('"'),
                _ => {}
            }
            self.advance();
        }

        if self.at_end() {
            return self.error_token(ErrorCode::LexUnterminatedLiteral, "Offenes Text Literal".to_string());
        }

        self.advance(); // closing quote
        self.new_token(TokenKind::String)
    }

    fn char(&mut self) -> Token {
        let mut got_backslash = false;
        while !self.at_end() {
            match self.peek() {
                '\'' => break,
                '\n' => self.increase_line_before_advance(),
                '\\' => {
                    got_backslash = true;
                    self.scan_escape('\'');
                }
                _ => {}
            }
            self.advance();
        }

        if self.at_end() {
            return self.error_token(
                ErrorCode::LexUnterminatedLiteral,
                "Offenes Buchstaben Literal".to_string(),
            );
        }

        self.advance(); // closing quote
        let tok = self.new_token(TokenKind::Char);
        match tok.literal.chars().count() {
            3 => {}
            4 if got_backslash => {}
            _ => self.err(
                ErrorCode::LexCharLiteralTooLong,
                "Ein Buchstaben Literal darf nur einen Buchstaben enthalten".to_string(),
            ),
        }
        tok
    }

    fn number(&mut self) -> Token {
        let mut kind = TokenKind::Int;
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // a comma followed by digits promotes to a float literal
        if self.peek() == ',' && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.new_token(kind)
    }

    fn identifier(&mut self) -> Token {
        // capitalization errors on aliases are never reported, but the token
        // type is unknown until scanned, hence the flag
        let should_report_capitalization = self.mode.strict_capitalization
            && self.should_capitalize
            && !is_upper(self.src[self.cur - 1]);

        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let kind = keyword_kind(&self.literal_text());

        if should_report_capitalization && kind != TokenKind::Identifier {
            self.warn(
                ErrorCode::LexCapitalization,
                "Nach einem Punkt muss ein Großbuchstabe folgen".to_string(),
            );
        }

        // includes are not resolved in alias mode, they would produce garbage
        if kind == TokenKind::Binde && !self.mode.alias {
            return self.resolve_include();
        }

        self.new_token(kind)
    }

    /// `Binde "<pfad>" ein.` pulls in the referenced file inline.
    fn resolve_include(&mut self) -> Token {
        let lit = self.next_token();
        if lit.kind != TokenKind::String {
            self.errors.report(DdpError::new(
                ErrorCode::SynUnexpectedToken,
                lit.range,
                "Nach 'Binde' muss ein Text Literal folgen",
                self.file.clone(),
            ));
            return lit;
        }

        let tok = self.next_token();
        if tok.kind != TokenKind::Ein {
            self.errors.report(DdpError::new(
                ErrorCode::SynUnexpectedToken,
                tok.range,
                msg_got_expected(&tok.literal, "'ein'"),
                self.file.clone(),
            ));
        } else {
            let tok = self.next_token();
            if tok.kind != TokenKind::Dot {
                self.errors.report(DdpError::new(
                    ErrorCode::SynUnexpectedToken,
                    tok.range,
                    msg_got_expected(&tok.literal, "'.'"),
                    self.file.clone(),
                ));
            }
        }

        let content = lit.literal.trim_matches('"');
        let incl_path = if content.starts_with("Duden") {
            ddppath::install_dir().join(format!("{}.ddp", content))
        } else {
            Path::new(&self.file)
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(format!("{}.ddp", content))
        };

        match incl_path.canonicalize() {
            Err(err) => self.errors.report(DdpError::new(
                ErrorCode::LexMalformedIncludePath,
                lit.range,
                format!("Fehlerhafter Dateipfad '{}.ddp': \"{}\"", content, err),
                self.file.clone(),
            )),
            Ok(abs) if self.included_files.contains(&abs) => {}
            Ok(abs) => match Scanner::from_file(&incl_path, self.mode) {
                Err(err) => self.errors.report(DdpError::new(
                    ErrorCode::LexMalformedIncludePath,
                    lit.range,
                    format!("Fehler beim Einbinden der Datei '{}': \"{}\"", incl_path.display(), err.msg),
                    self.file.clone(),
                )),
                Ok(mut inner) => {
                    inner.included_files.extend(self.included_files.iter().cloned());
                    inner.included_files.insert(abs);
                    self.include = Some(Box::new(inner));
                }
            },
        }

        self.next_token()
    }

    /// `<name>` inside an alias pattern
    fn alias_parameter(&mut self) -> Token {
        if !is_alpha(self.peek()) {
            self.err(ErrorCode::LexInvalidAliasParameter, "Invalider Parameter Name".to_string());
        }
        while !self.at_end() && self.peek() != '>' {
            if !is_alpha_numeric(self.advance()) {
                self.err(ErrorCode::LexInvalidAliasParameter, "Invalider Parameter Name".to_string());
            }
        }
        if self.at_end() {
            self.err(ErrorCode::LexUnterminatedLiteral, "Offener Parameter".to_string());
        } else {
            self.advance(); // consume the closing '>'
        }
        if self.cur - self.start <= 2 && !self.at_end() {
            self.err(
                ErrorCode::LexInvalidAliasParameter,
                "Ein Parameter in einem Alias muss mindestens einen Buchstaben enthalten".to_string(),
            );
        }

        let inner: String = self.src[self.start + 1..self.cur.saturating_sub(1)].iter().collect();
        if keyword_kind(&inner) != TokenKind::Identifier {
            self.err(
                ErrorCode::LexInvalidAliasParameter,
                "Es wurde ein Name als Alias-Parameter erwartet".to_string(),
            );
        }

        self.new_token(TokenKind::AliasParameter)
    }

    fn skip_whitespace(&mut self) {
        let mut consecutive_spaces = 0usize;
        loop {
            let ch = self.peek();
            if ch == ' ' {
                consecutive_spaces += 1;
            } else {
                consecutive_spaces = 0;
            }

            match ch {
                ' ' => {
                    if self.should_indent && consecutive_spaces == 4 {
                        self.indent += 1;
                        consecutive_spaces = 0;
                    }
                    self.advance();
                }
                '\r' => {
                    self.advance();
                }
                '\t' => {
                    if self.should_indent {
                        self.indent += 1;
                    }
                    self.advance();
                }
                '\n' => {
                    self.increase_line_before_advance();
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn at_end(&self) -> bool {
        self.cur >= self.src.len()
    }

    fn literal_text(&self) -> String {
        self.src[self.start..self.cur].iter().collect()
    }

    fn new_token(&mut self, kind: TokenKind) -> Token {
        self.should_capitalize = matches!(kind, TokenKind::Dot | TokenKind::Colon);
        Token::new(kind, self.literal_text(), self.indent, self.file.clone(), self.current_range())
    }

    fn error_token(&mut self, code: ErrorCode, msg: String) -> Token {
        self.err(code, msg.clone());
        Token::new(TokenKind::Illegal, msg, self.indent, self.file.clone(), self.current_range())
    }

    fn current_range(&self) -> Range {
        Range::new(
            Position::new(self.start_line, self.start_column),
            Position::new(self.line, self.column),
        )
    }

    fn advance(&mut self) -> char {
        self.cur += 1;
        self.column += 1;
        let ch = self.src[self.cur - 1];
        if self.should_indent && !is_space(ch) {
            self.should_indent = false;
        }
        ch
    }

    fn peek(&self) -> char {
        if self.at_end() {
            '\0'
        } else {
            self.src[self.cur]
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.src.get(self.cur + 1).copied()
    }

    fn err(&mut self, code: ErrorCode, msg: String) {
        let msg = if self.mode.alias {
            let pattern: String = self.src.iter().collect();
            format!("Fehler im Alias '{}': {}", pattern, msg)
        } else {
            msg
        };
        self.errors.report(DdpError::new(code, self.current_range(), msg, self.file.clone()));
    }

    fn warn(&mut self, code: ErrorCode, msg: String) {
        self.errors
            .report(DdpError::warning(code, self.current_range(), msg, self.file.clone()));
    }

    fn increase_line_before_advance(&mut self) {
        self.line += 1;
        self.indent = 0;
        self.column = 0; // will be increased in advance()
        self.should_indent = true;
    }
}

/// Decode the contents of a string literal token (quotes and escapes).
pub fn unescape_string(literal: &str) -> String {
    let inner: Vec<char> = strip_quotes(literal, '"').chars().collect();
    decode_escapes(&inner, '"')
}

/// Decode a char literal token to its Unicode scalar.
pub fn char_literal_value(literal: &str) -> Option<char> {
    let inner: Vec<char> = strip_quotes(literal, '\'').chars().collect();
    decode_escapes(&inner, '\'').chars().next()
}

/// Strip exactly one quote on each side; escaped quotes in the content
/// must survive.
fn strip_quotes(literal: &str, quote: char) -> &str {
    let literal = literal.strip_prefix(quote).unwrap_or(literal);
    literal.strip_suffix(quote).unwrap_or(literal)
}

fn decode_escapes(chars: &[char], quote: char) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            let escaped = match chars[i + 1] {
                'a' => '\x07',
                'b' => '\x08',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '\\' => '\\',
                c if c == quote => quote,
                other => {
                    out.push('\\');
                    other
                }
            };
            out.push(escaped);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn is_alpha(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || matches!(ch, 'ä' | 'Ä' | 'ö' | 'Ö' | 'ü' | 'Ü' | 'ß')
}

fn is_alpha_numeric(ch: char) -> bool {
    is_alpha(ch) || ch.is_ascii_digit()
}

fn is_space(ch: char) -> bool {
    matches!(ch, ' ' | '\r' | '\n' | '\t')
}

fn is_upper(ch: char) -> bool {
    ch.is_ascii_uppercase() || matches!(ch, 'Ä' | 'Ö' | 'Ü')
}
