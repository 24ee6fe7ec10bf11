use crate::error::{Result, SpliceError};

/// A text document held as an ordered sequence of lines
///
/// Every line keeps its own terminator (`\n` or `\r\n`), and only the last
/// line may lack one, so concatenating the lines reproduces the original
/// text byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// Split text into lines, keeping each line's terminator
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    /// Build a document from lines that already carry their terminators
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Reassemble the document text exactly as it was split
    pub fn to_text(&self) -> String {
        self.lines.concat()
    }

    /// BLAKE3 checksum (hex-encoded) of the document text
    pub fn checksum(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for line in &self.lines {
            hasher.update(line.as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// BLAKE3 checksum (hex-encoded) of arbitrary text
pub fn compute_checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Verify that a document's checksum matches the snapshot a plan was
/// written against
///
/// # Returns
/// * `Ok(())` if checksums match
/// * `Err(SpliceError::ChecksumMismatch)` if they don't
pub fn verify_checksum(actual_checksum: &str, expected_checksum: &str) -> Result<()> {
    if actual_checksum == expected_checksum {
        Ok(())
    } else {
        Err(SpliceError::ChecksumMismatch {
            expected: expected_checksum.to_string(),
            actual: actual_checksum.to_string(),
        })
    }
}
