//! A single source file with precomputed line starts.

use crate::span::FileId;
use std::path::PathBuf;

/// A source file loaded into the compilation session.
///
/// Line-start offsets are computed once at load so that line/column lookups
/// during diagnostic rendering are a binary search.
pub struct SourceFile {
    /// Identifier of this file within its [`SourceDb`](crate::SourceDb).
    pub id: FileId,
    /// Filesystem path, or a synthetic name for in-memory sources.
    pub path: PathBuf,
    /// Full text content.
    pub content: String,
    /// Byte offsets of each line start; the first entry is always 0.
    line_starts: Vec<u32>,
}

impl SourceFile {
    /// Creates a source file, computing its line-start table.
    pub fn new(id: FileId, path: PathBuf, content: String) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            id,
            path,
            content,
            line_starts,
        }
    }

    /// Converts a byte offset into 1-indexed `(line, column)` coordinates.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = line_idx as u32 + 1;
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the full text of the 1-indexed line, without its newline.
    pub fn line_text(&self, line: u32) -> &str {
        let idx = (line as usize).saturating_sub(1).min(self.line_starts.len() - 1);
        let start = self.line_starts[idx] as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&next| next as usize - 1)
            .unwrap_or(self.content.len());
        &self.content[start..end]
    }

    /// Returns the text between two byte offsets.
    pub fn snippet(&self, start: u32, end: u32) -> &str {
        &self.content[start as usize..end as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> SourceFile {
        SourceFile::new(FileId::from_raw(0), PathBuf::from("t.v"), content.into())
    }

    #[test]
    fn line_col_resolution() {
        let f = file("abc\ndef\nghi");
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_col(4), (2, 1));
        assert_eq!(f.line_col(5), (2, 2));
        assert_eq!(f.line_col(8), (3, 1));
    }

    #[test]
    fn line_text_lookup() {
        let f = file("module m;\nwire a;\nendmodule");
        assert_eq!(f.line_text(1), "module m;");
        assert_eq!(f.line_text(2), "wire a;");
        assert_eq!(f.line_text(3), "endmodule");
    }

    #[test]
    fn snippet_extraction() {
        let f = file("assign y = a;");
        assert_eq!(f.snippet(7, 8), "y");
    }

    #[test]
    fn empty_file() {
        let f = file("");
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_text(1), "");
    }
}
