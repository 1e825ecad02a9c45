//! Source file management and span tracking.
//!
//! Tokens, AST nodes, and diagnostics all carry a [`Span`] — a byte range in
//! a file registered with the [`SourceDb`]. The database resolves spans to
//! 1-indexed line/column coordinates on demand, so position bookkeeping costs
//! nothing on the hot path.

#![warn(missing_docs)]

pub mod source_db;
pub mod source_file;
pub mod span;

pub use source_db::{ResolvedSpan, SourceDb};
pub use source_file::SourceFile;
pub use span::{FileId, Span};
