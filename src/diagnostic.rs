//! Render-time diagnostics
//!
//! Rendering never stops because of a problem in a template. Each problem is
//! reported as a [`Diagnostic`] to a [`DiagnosticSink`] and the offending
//! expression contributes no output.

use std::fmt;
use std::sync::Arc;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::error::Span;

/// Line (1-based) and column (0-based, in characters) within a template body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Map a byte offset in `source` to a line and column
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count();
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// How serious a diagnostic is. Every render-time problem is an error that
/// is reported and rendered past; nothing reaches the caller as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What went wrong, with the structured arguments of the message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `name` is `super.t` for a failed super call
    #[error("no such template: {name}")]
    UnresolvedTemplate { name: String },

    #[error("passed {passed} arg(s) to template {template} with {declared} declared arg(s)")]
    ArityMismatch {
        template: String,
        passed: usize,
        declared: usize,
    },

    #[error("{template} template has {declared} arg(s) but mapped across {mapped} value(s)")]
    MapArityMismatch {
        template: String,
        declared: usize,
        mapped: usize,
    },

    #[error("attribute {name} isn't defined")]
    UndeclaredAttribute { name: String },

    #[error("function {function} expects a string not {found}")]
    TypeMismatch { function: String, found: String },
}

impl DiagnosticKind {
    /// Stable name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnresolvedTemplate { .. } => "UnresolvedTemplate",
            Self::ArityMismatch { .. } => "ArityMismatch",
            Self::MapArityMismatch { .. } => "MapArityMismatch",
            Self::UndeclaredAttribute { .. } => "UndeclaredAttribute",
            Self::TypeMismatch { .. } => "TypeMismatch",
        }
    }

    /// Message arguments in message order
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::UnresolvedTemplate { name } => vec![name.clone()],
            Self::ArityMismatch {
                template,
                passed,
                declared,
            } => vec![passed.to_string(), template.clone(), declared.to_string()],
            Self::MapArityMismatch {
                template,
                declared,
                mapped,
            } => vec![template.clone(), declared.to_string(), mapped.to_string()],
            Self::UndeclaredAttribute { name } => vec![name.clone()],
            Self::TypeMismatch { function, found } => vec![function.clone(), found.clone()],
        }
    }
}

/// One reported problem
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub location: Location,
    /// Display names of the templates being rendered, outermost first
    pub context: Vec<String>,
    /// Byte range in the body of the innermost template
    pub span: Span,
    source: Arc<str>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, context: Vec<String>, span: Span, source: Arc<str>) -> Self {
        let location = Location::from_offset(&source, span.start);
        Self {
            severity: Severity::Error,
            kind,
            location,
            context,
            span,
            source,
        }
    }

    pub fn args(&self) -> Vec<String> {
        self.kind.args()
    }

    /// Template body the location refers to
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the diagnostic as an ariadne report against its template body
    pub fn report(&self) -> String {
        let name = self
            .context
            .last()
            .cloned()
            .unwrap_or_else(|| "template".to_string());
        let name = name.as_str();
        let message = self.kind.to_string();

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, name, self.span.start)
            .with_message(&message)
            .with_note(format!("context [{}]", self.context.join(" ")))
            .with_label(
                Label::new((name, self.span.clone()))
                    .with_message(self.kind.name())
                    .with_color(Color::Yellow),
            )
            .finish()
            .write((name, Source::from(self.source.as_ref())), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "context [{}] {} {}",
            self.context.join(" "),
            self.location,
            self.kind
        )
    }
}

/// Receives diagnostics in discovery order
pub trait DiagnosticSink {
    fn receive(&mut self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(Diagnostic),
{
    fn receive(&mut self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// Collects every diagnostic
///
/// Its `Display` form writes one diagnostic per line, each line terminated
/// by a newline.
#[derive(Debug, Clone, Default)]
pub struct ErrorBuffer {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for ErrorBuffer {
    fn receive(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl fmt::Display for ErrorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// Forwards diagnostics to the `log` facade at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn receive(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(kind: DiagnosticKind, source: &str, span: Span) -> Diagnostic {
        Diagnostic::new(kind, vec!["t".into(), "u".into()], span, Arc::from(source))
    }

    #[test]
    fn test_location_from_offset() {
        assert_eq!(Location::from_offset("<foo()>", 0), Location::new(1, 0));
        assert_eq!(Location::from_offset("ab\ncd<x>", 5), Location::new(2, 2));
        assert_eq!(Location::from_offset("é<x>", 2), Location::new(1, 1));
    }

    #[test]
    fn test_display_format() {
        let d = diagnostic(
            DiagnosticKind::UndeclaredAttribute { name: "x".into() },
            "<x>",
            1..2,
        );
        assert_eq!(d.to_string(), "context [t u] 1:1 attribute x isn't defined");
    }

    #[test]
    fn test_every_diagnostic_is_an_error() {
        let d = diagnostic(
            DiagnosticKind::UnresolvedTemplate { name: "foo".into() },
            "<foo()>",
            0..1,
        );
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.severity.to_string(), "error");
    }

    #[test]
    fn test_args_are_structured() {
        let kind = DiagnosticKind::ArityMismatch {
            template: "u".into(),
            passed: 1,
            declared: 2,
        };
        assert_eq!(kind.args(), vec!["1", "u", "2"]);
        assert_eq!(kind.name(), "ArityMismatch");
    }

    #[test]
    fn test_error_buffer_lines() {
        let mut buffer = ErrorBuffer::new();
        buffer.receive(diagnostic(
            DiagnosticKind::UnresolvedTemplate { name: "foo".into() },
            "<foo()>",
            0..1,
        ));
        buffer.receive(diagnostic(
            DiagnosticKind::UndeclaredAttribute { name: "x".into() },
            "<foo()>",
            1..4,
        ));
        assert_eq!(buffer.len(), 2);
        assert_eq!(
            buffer.to_string(),
            "context [t u] 1:0 no such template: foo\ncontext [t u] 1:1 attribute x isn't defined\n"
        );
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |d: Diagnostic| seen.push(d.kind.name());
            sink.receive(diagnostic(
                DiagnosticKind::TypeMismatch {
                    function: "trim".into(),
                    found: "i64".into(),
                },
                "<trim(s)>",
                1..5,
            ));
        }
        assert_eq!(seen, vec!["TypeMismatch"]);
    }

    #[test]
    fn test_report_mentions_message() {
        let d = diagnostic(
            DiagnosticKind::UnresolvedTemplate { name: "foo".into() },
            "<foo()>",
            0..1,
        );
        assert!(d.report().contains("no such template: foo"));
    }
}
