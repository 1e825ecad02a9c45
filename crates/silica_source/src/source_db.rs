//! Central database of source files for a compilation session.

use crate::source_file::SourceFile;
use crate::span::{FileId, Span};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A span resolved to human-readable coordinates. Lines and columns are
/// 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpan {
    /// Path of the containing file.
    pub path: PathBuf,
    /// Line of the first byte.
    pub line: u32,
    /// Column of the first byte.
    pub col: u32,
    /// Line of the last byte.
    pub end_line: u32,
    /// Column of the last byte.
    pub end_col: u32,
}

impl fmt::Display for ResolvedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.col)
    }
}

/// Owns all loaded source text and resolves spans to line/column coordinates.
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Loads a file from disk, returning its [`FileId`].
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.add_source(path.to_path_buf(), content))
    }

    /// Registers an in-memory source under the given display name.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content));
        id
    }

    /// Returns the [`SourceFile`] for an ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this database.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Resolves a span to line/column coordinates.
    pub fn resolve(&self, span: Span) -> ResolvedSpan {
        let file = self.file(span.file);
        let (line, col) = file.line_col(span.start);
        let (end_line, end_col) = file.line_col(span.end.saturating_sub(1).max(span.start));
        ResolvedSpan {
            path: file.path.clone(),
            line,
            col,
            end_line,
            end_col,
        }
    }

    /// Returns the source text a span covers.
    pub fn snippet(&self, span: Span) -> &str {
        self.file(span.file).snippet(span.start, span.end)
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_resolve() {
        let mut db = SourceDb::new();
        let id = db.add_source("t.v", "abc\ndef\nghi".to_string());
        let r = db.resolve(Span::new(id, 4, 7));
        assert_eq!(r.path, PathBuf::from("t.v"));
        assert_eq!((r.line, r.col), (2, 1));
        assert_eq!((r.end_line, r.end_col), (2, 3));
        assert_eq!(r.to_string(), "t.v:2:1");
    }

    #[test]
    fn snippet() {
        let mut db = SourceDb::new();
        let id = db.add_source("t.v", "module m; endmodule".to_string());
        assert_eq!(db.snippet(Span::new(id, 0, 6)), "module");
    }

    #[test]
    fn multiple_files() {
        let mut db = SourceDb::new();
        let a = db.add_source("a.v", "wire a;".to_string());
        let b = db.add_source("b.v", "wire b;".to_string());
        assert_ne!(a, b);
        assert_eq!(db.file(a).content, "wire a;");
        assert_eq!(db.file(b).content, "wire b;");
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.v");
        std::fs::write(&path, "module top; endmodule").unwrap();

        let mut db = SourceDb::new();
        let id = db.load_file(&path).unwrap();
        assert_eq!(db.file(id).content, "module top; endmodule");
    }
}
