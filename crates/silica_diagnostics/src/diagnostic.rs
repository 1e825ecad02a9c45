//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use silica_source::Span;

/// The visual style of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The main error location, underlined with `^^^^`.
    Primary,
    /// Additional context, underlined with `----`.
    Secondary,
}

/// An annotated source span within a diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// The span this label annotates.
    pub span: Span,
    /// The message displayed next to the underline.
    pub message: String,
    /// Primary or secondary.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label (the main error location).
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label (additional context).
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

/// A single text replacement within a suggested fix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Replacement {
    /// The span to replace.
    pub span: Span,
    /// The replacement text.
    pub new_text: String,
}

/// An auto-applicable fix: a description plus the replacements implementing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestedFix {
    /// What the fix does, e.g. "add a semicolon after this declaration".
    pub message: String,
    /// The replacements to apply.
    pub replacements: Vec<Replacement>,
}

impl SuggestedFix {
    /// A fix that inserts text at the start of `span`.
    pub fn insert_before(span: Span, text: impl Into<String>, message: impl Into<String>) -> Self {
        let point = Span::new(span.file, span.start, span.start);
        Self {
            message: message.into(),
            replacements: vec![Replacement {
                span: point,
                new_text: text.into(),
            }],
        }
    }
}

/// A structured diagnostic: severity, code, message, primary span, and
/// optional labels, notes, help, and fix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Stable code identifying the diagnostic kind.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// Where the problem was detected.
    pub primary_span: Span,
    /// Additional annotated spans.
    pub labels: Vec<Label>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions rendered as `help:` lines.
    pub help: Vec<String>,
    /// An auto-applicable fix, if one is known.
    pub fix: Option<SuggestedFix>,
}

impl Diagnostic {
    fn new(severity: Severity, code: DiagnosticCode, message: String, span: Span) -> Self {
        Self {
            severity,
            code,
            message,
            primary_span: span,
            labels: Vec::new(),
            notes: Vec::new(),
            help: Vec::new(),
            fix: None,
        }
    }

    /// Creates an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, code, message.into(), span)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, code, message.into(), span)
    }

    /// Adds a label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Attaches a suggested fix.
    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fix = Some(fix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_error() {
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Parse, 101),
            "expected ';'",
            Span::DUMMY,
        );
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.to_string(), "P101");
        assert!(diag.fix.is_none());
    }

    #[test]
    fn builder_methods_accumulate() {
        let diag = Diagnostic::warning(
            DiagnosticCode::new(Category::Warning, 301),
            "inferred latch for 'q'",
            Span::DUMMY,
        )
        .with_label(Label::primary(Span::DUMMY, "assigned here"))
        .with_note("'q' is not assigned on every path")
        .with_help("assign a default value before the if");
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn insert_before_fix() {
        let span = Span::new(silica_source::FileId::from_raw(0), 10, 14);
        let fix = SuggestedFix::insert_before(span, ";", "add a semicolon");
        assert_eq!(fix.replacements.len(), 1);
        assert_eq!(fix.replacements[0].span.start, 10);
        assert_eq!(fix.replacements[0].span.end, 10);
        assert_eq!(fix.replacements[0].new_text, ";");
    }
}
