//! Error types for splice operations
//!
//! Every variant is raised while the document is still only in memory, so an
//! error always means nothing was written.

/// Result type for splice operations
pub type Result<T> = std::result::Result<T, SpliceError>;

/// Errors that abort a relocation or substitution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpliceError {
    /// A required delimiter string is absent from the document
    #[error("Marker not found: {marker:?}")]
    MarkerNotFound { marker: String },

    /// Line offsets violate `0 <= start <= end <= len`
    #[error("Line range {start}..{end} out of bounds (document has {len} lines)")]
    RangeError { start: usize, end: usize, len: usize },

    /// The insertion point falls strictly inside the region being moved
    #[error("Insertion offset {at} lies inside the moved region {start}..{end}")]
    InsertionInsideRegion { at: usize, start: usize, end: usize },

    /// The extracted segment failed a declared content check
    #[error("Sentinel check failed: expected {check}, found {found:?}")]
    SentinelMismatch { check: String, found: String },

    /// A post-splice count or ordering check failed
    #[error("Invariant violated: {detail}")]
    InvariantViolation { detail: String },

    /// The document is not the snapshot the plan was written against
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl SpliceError {
    /// Stable name of the failure class, as shown in reports
    pub fn kind(&self) -> &'static str {
        match self {
            SpliceError::MarkerNotFound { .. } => "MarkerNotFound",
            SpliceError::RangeError { .. } | SpliceError::InsertionInsideRegion { .. } => {
                "RangeError"
            }
            SpliceError::SentinelMismatch { .. } => "SentinelMismatch",
            SpliceError::InvariantViolation { .. } => "InvariantViolation",
            SpliceError::ChecksumMismatch { .. } => "ChecksumMismatch",
        }
    }

    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        SpliceError::InvariantViolation { detail: detail.into() }
    }
}
