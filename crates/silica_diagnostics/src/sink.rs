//! Thread-safe diagnostic accumulator.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Accumulates diagnostics emitted during compilation.
///
/// The error count is tracked atomically so `has_errors` never takes the
/// lock. Emission order is preserved.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    /// Emits a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.diagnostics.lock().unwrap().push(diag);
    }

    /// Returns `true` if any error-severity diagnostic has been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    /// The error count is not reset.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap())
    }

    /// Returns a snapshot of the accumulated diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }

    /// Returns the first error-severity diagnostic, if any.
    pub fn first_error(&self) -> Option<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.severity.is_error())
            .cloned()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use silica_source::Span;

    fn err() -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::new(Category::Parse, 101),
            "boom",
            Span::DUMMY,
        )
    }

    fn warn() -> Diagnostic {
        Diagnostic::warning(
            DiagnosticCode::new(Category::Warning, 301),
            "meh",
            Span::DUMMY,
        )
    }

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.first_error().is_none());
        assert!(sink.take_all().is_empty());
    }

    #[test]
    fn warnings_are_not_errors() {
        let sink = DiagnosticSink::new();
        sink.emit(warn());
        assert!(!sink.has_errors());
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn first_error_skips_warnings() {
        let sink = DiagnosticSink::new();
        sink.emit(warn());
        sink.emit(err());
        let first = sink.first_error().unwrap();
        assert_eq!(first.message, "boom");
    }

    #[test]
    fn take_all_drains_in_order() {
        let sink = DiagnosticSink::new();
        sink.emit(err());
        sink.emit(warn());
        let all = sink.take_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "boom");
        assert!(sink.take_all().is_empty());
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn concurrent_emission() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..50 {
                        sink.emit(err());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.error_count(), 400);
    }
}
