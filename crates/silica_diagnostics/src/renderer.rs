//! Terminal rendering of diagnostics.

use crate::diagnostic::Diagnostic;
use crate::diagnostic::LabelStyle;
use silica_source::SourceDb;

/// Renders diagnostics in a rustc-style terminal format:
///
/// ```text
/// error[P101]: expected ';', found 'wire'
///   --> t.v:1:20
///    |
///  1 | module t; wire a  wire b; endmodule
///    |                   ^^^^ expected ';'
///    = help: add a semicolon after the previous declaration
/// ```
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Creates a renderer.
    pub fn new() -> Self {
        Self
    }

    /// Renders one diagnostic into a string.
    pub fn render(&self, diag: &Diagnostic, db: &SourceDb) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}[{}]: {}\n",
            diag.severity, diag.code, diag.message
        ));

        if !diag.primary_span.is_dummy() {
            let resolved = db.resolve(diag.primary_span);
            out.push_str(&format!("  --> {resolved}\n"));

            let file = db.file(diag.primary_span.file);
            let (line, col) = file.line_col(diag.primary_span.start);
            let line_num = line.to_string();
            let gutter = " ".repeat(line_num.len());
            let line_text = file.line_text(line);

            out.push_str(&format!("{gutter} |\n"));
            out.push_str(&format!("{line_num} | {line_text}\n"));

            // Caret line under the span (clamped to the excerpted line).
            let span_on_line = (diag.primary_span.len() as usize)
                .max(1)
                .min(line_text.len().saturating_sub(col as usize - 1).max(1));
            let carets = "^".repeat(span_on_line);
            let pad = " ".repeat(col as usize - 1);
            let primary_msg = diag
                .labels
                .iter()
                .find(|l| l.style == LabelStyle::Primary)
                .map(|l| format!(" {}", l.message))
                .unwrap_or_default();
            out.push_str(&format!("{gutter} | {pad}{carets}{primary_msg}\n"));
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        if let Some(fix) = &diag.fix {
            out.push_str(&format!("   = fix: {}\n", fix.message));
        }

        out
    }

    /// Renders every diagnostic in order, concatenated.
    pub fn render_all(&self, diags: &[Diagnostic], db: &SourceDb) -> String {
        diags.iter().map(|d| self.render(d, db)).collect()
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use crate::diagnostic::Label;
    use silica_source::Span;

    #[test]
    fn render_error_with_caret() {
        let mut db = SourceDb::new();
        let id = db.add_source("t.v", "module t; wire a  wire b; endmodule\n".to_string());
        // Span of the second `wire`
        let span = Span::new(id, 18, 22);
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Parse, 101),
            "expected ';', found 'wire'",
            span,
        )
        .with_label(Label::primary(span, "expected ';'"))
        .with_help("add a semicolon after the previous declaration");

        let rendered = TerminalRenderer::new().render(&diag, &db);
        assert!(rendered.contains("error[P101]: expected ';', found 'wire'"));
        assert!(rendered.contains("--> t.v:1:19"));
        assert!(rendered.contains("module t; wire a  wire b; endmodule"));
        assert!(rendered.contains("^^^^ expected ';'"));
        assert!(rendered.contains("= help: add a semicolon"));
    }

    #[test]
    fn render_dummy_span_skips_excerpt() {
        let db = SourceDb::new();
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Elab, 200),
            "no modules found",
            Span::DUMMY,
        );
        let rendered = TerminalRenderer::new().render(&diag, &db);
        assert!(rendered.contains("error[E200]: no modules found"));
        assert!(!rendered.contains("-->"));
    }

    #[test]
    fn caret_points_at_column() {
        let mut db = SourceDb::new();
        let id = db.add_source("t.v", "assign y = ;\n".to_string());
        let span = Span::new(id, 11, 12);
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Parse, 102),
            "expected expression",
            span,
        );
        let rendered = TerminalRenderer::new().render(&diag, &db);
        let caret_line = rendered
            .lines()
            .find(|l| l.contains('^'))
            .expect("caret line");
        // Column 12 → 11 spaces of padding after the gutter.
        assert_eq!(caret_line.find('^').unwrap(), caret_line.find('|').unwrap() + 2 + 11);
    }
}
