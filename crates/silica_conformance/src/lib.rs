//! Conformance test helpers for the Silica pipeline.
//!
//! Wraps the full parse → elaborate flow into one call returning a
//! structured result, so integration tests can assert on netlist shape,
//! diagnostics, and exit outcomes without repeating the plumbing.

#![warn(missing_docs)]

use silica_common::Interner;
use silica_diagnostics::{Diagnostic, DiagnosticSink, Severity};
use silica_netlist::Netlist;
use silica_source::{FileId, SourceDb};
use silica_verilog_parser as vp;

/// Result of running source text through parse → elaborate.
pub struct PipelineResult {
    /// The elaborated netlist, when elaboration succeeded.
    pub netlist: Option<Netlist>,
    /// The fatal diagnostic, when it did not.
    pub error: Option<Diagnostic>,
    /// Every non-fatal diagnostic emitted along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// The parsed tree (present whenever parsing succeeded).
    pub ast: Option<vp::ast::VerilogSourceFile>,
    /// The session interner.
    pub interner: Interner,
    /// The source database (for rendering diagnostics in assertions).
    pub db: SourceDb,
    /// The file ID of the compiled source.
    pub file: FileId,
}

impl PipelineResult {
    /// The netlist, panicking with full context when elaboration failed.
    pub fn netlist(&self) -> &Netlist {
        match &self.netlist {
            Some(n) => n,
            None => panic!(
                "pipeline failed: {:?}; diagnostics: {:?}",
                self.error, self.diagnostics
            ),
        }
    }

    /// `true` if any error-severity diagnostic was produced.
    pub fn has_errors(&self) -> bool {
        self.error.is_some()
            || self
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error)
    }

    /// The warnings only.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }
}

/// Runs `source` through the full pipeline with an optional top module.
pub fn compile(source: &str, top: Option<&str>) -> PipelineResult {
    let interner = Interner::new();
    let sink = DiagnosticSink::new();
    let mut db = SourceDb::new();
    let file = db.add_source("test.v", source.to_string());

    let ast = vp::parse(source, file, &interner, &sink);
    if sink.has_errors() {
        return PipelineResult {
            netlist: None,
            error: sink.first_error(),
            diagnostics: sink.take_all(),
            ast: Some(ast),
            interner,
            db,
            file,
        };
    }

    let result = silica_elaborate::elaborate(&ast, top, &interner, &sink);
    let (netlist, error) = match result {
        Ok(n) => (Some(n), None),
        Err(e) => (None, Some(e)),
    };
    PipelineResult {
        netlist,
        error,
        diagnostics: sink.take_all(),
        ast: Some(ast),
        interner,
        db,
        file,
    }
}
