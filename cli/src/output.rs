//! Machine-readable diagnostic output for editors and CI systems.

use ddp_lang::error::{DdpError, Severity};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct JsonDiagnostic {
    pub code: u32,
    pub severity: &'static str,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl From<&DdpError> for JsonDiagnostic {
    fn from(err: &DdpError) -> Self {
        JsonDiagnostic {
            code: err.code as u32,
            severity: match err.severity {
                Severity::Error => "fehler",
                Severity::Warning => "warnung",
            },
            file: err.file.clone(),
            line: err.range.start.line,
            column: err.range.start.column,
            message: err.msg.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonBuildResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    pub diagnostics: Vec<JsonDiagnostic>,
}

pub fn print_json(success: bool, artifact: Option<&Path>, diagnostics: &[DdpError]) {
    let result = JsonBuildResult {
        success,
        artifact: artifact.map(|path| path.display().to_string()),
        diagnostics: diagnostics.iter().map(JsonDiagnostic::from).collect(),
    };
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("JSON-Ausgabe fehlgeschlagen: {}", err),
    }
}

/// Human-readable diagnostics go to stderr, errors and warnings alike.
pub fn print_human(diagnostics: &[DdpError]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}
