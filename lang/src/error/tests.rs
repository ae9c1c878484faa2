use super::*;
use crate::lexer::token::Position;

fn range() -> Range {
    Range::new(Position::new(3, 7), Position::new(3, 12))
}

#[test]
fn display_contains_location_code_and_message() {
    let err = DdpError::new(ErrorCode::SynUnexpectedToken, range(), "Unerwartetes Zeichen", "test.ddp");
    let rendered = err.to_string();
    assert_eq!(rendered, "test.ddp:3:7: Fehler [K2000]: Unerwartetes Zeichen");
}

#[test]
fn warnings_render_as_warnung() {
    let err = DdpError::warning(ErrorCode::LexCapitalization, range(), "Nach einem Punkt muss ein Großbuchstabe folgen", "t.ddp");
    assert!(err.to_string().contains("Warnung [K1004]"));
}

#[test]
fn sink_tracks_error_severity_only() {
    let mut sink = DiagnosticSink::new();
    assert!(!sink.has_errors());

    sink.report(DdpError::warning(ErrorCode::LexCapitalization, range(), "w", "t.ddp"));
    assert!(!sink.has_errors());

    sink.report(DdpError::new(ErrorCode::TypeMismatch, range(), "e", "t.ddp"));
    assert!(sink.has_errors());
    assert_eq!(sink.diagnostics().len(), 2);
}

#[test]
fn sink_extend_merges_in_order() {
    let mut outer = DiagnosticSink::new();
    outer.report(DdpError::new(ErrorCode::NameUndeclared, range(), "a", "t.ddp"));

    let mut inner = DiagnosticSink::new();
    inner.report(DdpError::new(ErrorCode::NameDuplicate, range(), "b", "t.ddp"));

    outer.extend(inner);
    let msgs: Vec<_> = outer.diagnostics().iter().map(|d| d.msg.as_str()).collect();
    assert_eq!(msgs, ["a", "b"]);
}
