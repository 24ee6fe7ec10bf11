use crate::document::Document;

/// Position in a text file (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
}

/// Byte offsets at which each line of a document starts
///
/// Marker searches run over the joined document text; this index maps the
/// byte offsets they produce back onto line indices.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(document: &Document) -> Self {
        let mut starts = Vec::with_capacity(document.len());
        let mut offset = 0;

        for line in document.lines() {
            starts.push(offset);
            offset += line.len();
        }

        Self { starts, text_len: offset }
    }

    /// Zero-based index of the line containing `byte_offset`
    ///
    /// Offsets at or past the end of the text map to the last line.
    pub fn line_of(&self, byte_offset: usize) -> usize {
        match self.starts.binary_search(&byte_offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// Byte offset where `line` starts; the text length for `line == len`
    pub fn line_start(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.text_len)
    }

    /// Convert a byte offset to a 1-indexed line and column
    pub fn position(&self, byte_offset: usize) -> Position {
        let line = self.line_of(byte_offset);
        let column = byte_offset.saturating_sub(self.line_start(line)) + 1;

        Position { line: line + 1, column }
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }
}
