//! Verilog-2005 front-end: lexer, parser, AST, visitor, and pretty-printer.
//!
//! The pipeline is `lex` → [`VerilogParser`] → [`ast::VerilogSourceFile`].
//! Both stages report problems to a shared
//! [`DiagnosticSink`](silica_diagnostics::DiagnosticSink); the parser recovers
//! at statement/declaration boundaries and leaves `Error` nodes behind, so a
//! single pass reports the first error faithfully while still producing a
//! tree. Callers treat any error-severity diagnostic as a failed parse.

#![warn(missing_docs)]

pub mod ast;
pub mod decl;
pub mod expr;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod printer;
pub mod stmt;
pub mod token;
pub mod visitor;

pub use lexer::lex;
pub use parser::VerilogParser;

use silica_common::Interner;
use silica_diagnostics::DiagnosticSink;
use silica_source::FileId;

/// Lexes and parses a full source file in one call.
///
/// Convenience wrapper for the common case: tokens are produced, handed to a
/// [`VerilogParser`], and the resulting tree is returned. Diagnostics land in
/// `sink`; check [`DiagnosticSink::has_errors`] to decide whether the tree is
/// trustworthy.
pub fn parse(
    source: &str,
    file: FileId,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> ast::VerilogSourceFile {
    let tokens = lexer::lex(source, file, sink);
    VerilogParser::new(tokens, source, file, interner, sink).parse_source_file()
}
