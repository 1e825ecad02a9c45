//! Diagnostic creation, accumulation, and terminal rendering.
//!
//! Errors and warnings across the pipeline are structured [`Diagnostic`]
//! values: a severity, a stable code, a message, a primary span, and optional
//! labels, notes, help strings, and an auto-applicable fix. Stages emit into
//! a shared [`DiagnosticSink`]; the CLI renders the accumulated set with
//! [`TerminalRenderer`], which produces a rustc-style source excerpt with a
//! caret line.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Label, LabelStyle, Replacement, SuggestedFix};
pub use renderer::TerminalRenderer;
pub use severity::Severity;
pub use sink::DiagnosticSink;
