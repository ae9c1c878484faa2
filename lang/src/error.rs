//! Unified diagnostics for the DDP compiler.
//!
//! Every front-end stage reports `DdpError` values into a shared
//! `DiagnosticSink` and keeps going where possible; code emission is
//! suppressed once an error-severity diagnostic exists, but later stages
//! still run for diagnostic coverage.

#[cfg(test)]
mod tests;

use crate::lexer::token::Range;
use std::fmt;

/// Numeric diagnostic codes, grouped by compiler stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    // Lexical errors (1xxx)
    LexInvalidUtf8 = 1000,
    LexUnterminatedLiteral = 1001,
    LexUnknownEscape = 1002,
    LexMalformedIncludePath = 1003,
    LexCapitalization = 1004,
    LexUnexpectedCharacter = 1005,
    LexInvalidAliasParameter = 1006,
    LexCharLiteralTooLong = 1007,

    // Syntax errors (2xxx)
    SynUnexpectedToken = 2000,
    SynExpectedExpression = 2001,
    SynMalformedAlias = 2002,
    SynDuplicateAlias = 2003,
    SynExpectedAssignable = 2004,
    SynEmptyBlock = 2005,

    // Name resolution errors (3xxx)
    NameUndeclared = 3000,
    NameDuplicate = 3001,
    NameUnresolvedCall = 3002,
    NameReturnOutsideFunction = 3003,

    // Type errors (4xxx)
    TypeMismatch = 4000,
    TypeInvalidOperator = 4001,
    TypeInvalidCast = 4002,
    TypeBadReference = 4003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic: numeric code, source range, file and a
/// German-language message.
#[derive(Debug, Clone, PartialEq)]
pub struct DdpError {
    pub code: ErrorCode,
    pub severity: Severity,
    pub range: Range,
    pub file: String,
    pub msg: String,
}

impl DdpError {
    pub fn new(code: ErrorCode, range: Range, msg: impl Into<String>, file: impl Into<String>) -> Self {
        Self { code, severity: Severity::Error, range, file: file.into(), msg: msg.into() }
    }

    pub fn warning(code: ErrorCode, range: Range, msg: impl Into<String>, file: impl Into<String>) -> Self {
        Self { code, severity: Severity::Warning, range, file: file.into(), msg: msg.into() }
    }
}

impl fmt::Display for DdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "Fehler",
            Severity::Warning => "Warnung",
        };
        write!(
            f,
            "{}:{}:{}: {} [K{}]: {}",
            self.file,
            self.range.start.line,
            self.range.start.column,
            kind,
            self.code as u32,
            self.msg
        )
    }
}

impl std::error::Error for DdpError {}

/// Common message helper: "<got> gefunden, aber <expected> erwartet"
pub fn msg_got_expected(got: &str, expected: &str) -> String {
    format!("Es wurde '{}' gefunden, aber {} erwartet", got, expected)
}

/// Accumulates the diagnostics of a compilation.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<DdpError>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, err: DdpError) {
        self.diagnostics.push(err);
    }

    pub fn extend(&mut self, other: DiagnosticSink) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[DdpError] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drop diagnostics reported after `len`. Used to roll back trial
    /// parses during alias matching.
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    pub fn into_diagnostics(self) -> Vec<DdpError> {
        self.diagnostics
    }
}
