use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::document::Document;

/// A document read from disk
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Path the document was read from
    pub path: PathBuf,
    /// The document's lines
    pub document: Document,
    /// Byte length of the content
    pub len: usize,
    /// BLAKE3 hash of the content (hex-encoded)
    pub checksum: String,
}

/// Error types for file operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid UTF-8 in file: {0}")]
    InvalidUtf8(String),
}

impl FileError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FileError::Io { path: path.into(), source }
    }
}

/// Read text from disk with UTF-8 validation
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String, FileError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Err(FileError::NotFound(path_ref.display().to_string()));
    }

    let bytes = fs::read(path_ref).map_err(|e| FileError::io(path_ref, e))?;

    String::from_utf8(bytes).map_err(|_| FileError::InvalidUtf8(path_ref.display().to_string()))
}

/// Read a whole document as lines, keeping every line terminator
///
/// # Returns
/// * `Ok(LoadedDocument)` - Document with metadata
/// * `Err(FileError)` - File not found, I/O error, or invalid UTF-8
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<LoadedDocument, FileError> {
    let path_ref = path.as_ref();
    let content = read_text(path_ref)?;
    let document = Document::from_text(&content);
    let checksum = document.checksum();

    debug!(path = %path_ref.display(), lines = document.len(), "read document");

    Ok(LoadedDocument {
        path: path_ref.to_path_buf(),
        len: content.len(),
        document,
        checksum,
    })
}

/// Write a document back verbatim
///
/// The text goes to a temporary file in the target's directory, which is then
/// renamed over the target, so a failed write never leaves a truncated file.
/// An existing target's permissions carry over to the new file.
pub fn write_document<P: AsRef<Path>>(path: P, document: &Document) -> Result<(), FileError> {
    let path_ref = path.as_ref();
    let dir = match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| FileError::io(dir, e))?;
    for line in document.lines() {
        temp.write_all(line.as_bytes())
            .map_err(|e| FileError::io(temp.path(), e))?;
    }
    if let Ok(metadata) = fs::metadata(path_ref) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| FileError::io(temp.path(), e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| FileError::io(temp.path(), e))?;
    temp.persist(path_ref)
        .map_err(|e| FileError::io(path_ref, e.error))?;

    debug!(path = %path_ref.display(), lines = document.len(), "wrote document");
    Ok(())
}
