//! Diagnostic codes and constructors for elaboration.
//!
//! Error codes `E200`–`E211` cover fatal elaboration failures; warning codes
//! `W300`–`W305` cover non-fatal findings (inferred latches, undriven nets,
//! unused declarations, black boxes).

use silica_diagnostics::{Category, Diagnostic, DiagnosticCode};
use silica_source::Span;

/// No module to elaborate, or the requested top was not found.
pub const E200: DiagnosticCode = DiagnosticCode::new(Category::Elab, 200);
/// Port connection mismatch in an instantiation.
pub const E201: DiagnosticCode = DiagnosticCode::new(Category::Elab, 201);
/// Duplicate signal name within a module.
pub const E202: DiagnosticCode = DiagnosticCode::new(Category::Elab, 202);
/// Reference to an unknown signal.
pub const E204: DiagnosticCode = DiagnosticCode::new(Category::Elab, 204);
/// A net with more than one driver.
pub const E205: DiagnosticCode = DiagnosticCode::new(Category::Elab, 205);
/// A combinational cycle.
pub const E206: DiagnosticCode = DiagnosticCode::new(Category::Elab, 206);
/// Recursive module instantiation.
pub const E207: DiagnosticCode = DiagnosticCode::new(Category::Elab, 207);
/// Unknown port name in a named connection.
pub const E208: DiagnosticCode = DiagnosticCode::new(Category::Elab, 208);
/// Non-constant expression in a constant context.
pub const E209: DiagnosticCode = DiagnosticCode::new(Category::Elab, 209);
/// A construct outside the synthesizable subset.
pub const E210: DiagnosticCode = DiagnosticCode::new(Category::Elab, 210);
/// Division or modulo by zero during constant evaluation.
pub const E211: DiagnosticCode = DiagnosticCode::new(Category::Elab, 211);

/// Latch inferred in a combinational always block.
pub const W300: DiagnosticCode = DiagnosticCode::new(Category::Warning, 300);
/// A net read but never driven.
pub const W301: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);
/// Unknown module kept as a black box.
pub const W302: DiagnosticCode = DiagnosticCode::new(Category::Warning, 302);
/// A declared signal that is never used.
pub const W303: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);
/// Width mismatch across a connection or assignment.
pub const W304: DiagnosticCode = DiagnosticCode::new(Category::Warning, 304);
/// A declaration with no synthesis meaning (real/time/event).
pub const W305: DiagnosticCode = DiagnosticCode::new(Category::Warning, 305);

/// Unresolved signal reference.
pub fn unresolved_signal(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E204, format!("unresolved identifier `{name}`"), span)
        .with_help("declare the signal or check its spelling")
}

/// Non-constant expression where a constant is required.
pub fn not_constant(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E209, format!("{what} must be a constant expression"), span)
}

/// Unsupported construct within the synthesizable subset.
pub fn unsupported(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E210, format!("{what} is not supported in synthesis"), span)
}

/// Division by zero during constant evaluation.
pub fn divide_by_zero(span: Span) -> Diagnostic {
    Diagnostic::error(E211, "division by zero in constant expression", span)
}

/// Multi-driver conflict on a named net.
pub fn multi_driver(net: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E205, format!("net `{net}` has multiple drivers"), span)
}

/// Combinational cycle through the named cells.
pub fn combinational_cycle(path: &[String]) -> Diagnostic {
    Diagnostic::error(
        E206,
        format!("combinational cycle through: {}", path.join(" -> ")),
        Span::DUMMY,
    )
    .with_help("break the loop with a register or rework the logic")
}

/// Latch inference warning.
pub fn inferred_latch(signal: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W300,
        format!("`{signal}` is not assigned on every path; a latch was inferred"),
        span,
    )
    .with_help("assign a default value at the top of the block or cover every branch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_with_prefixes() {
        assert_eq!(E204.to_string(), "E204");
        assert_eq!(W300.to_string(), "W300");
    }

    #[test]
    fn cycle_message_names_cells() {
        let diag =
            combinational_cycle(&["a1".to_string(), "x2".to_string(), "a1".to_string()]);
        assert!(diag.message.contains("a1 -> x2 -> a1"));
        assert!(diag.severity.is_error());
    }

    #[test]
    fn latch_warning_is_nonfatal() {
        let diag = inferred_latch("q", Span::DUMMY);
        assert!(!diag.severity.is_error());
        assert!(diag.message.contains("latch"));
    }
}
