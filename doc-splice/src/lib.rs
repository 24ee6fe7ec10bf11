// Line-oriented document model
pub mod document;

// Byte offset to line conversion
pub mod position;

// Error taxonomy
pub mod error;

// Boundary location
pub mod locate;

// Segment extraction
pub mod extract;

// Sentinel checks
pub mod sentinel;

// Segment relocation engine
pub mod relocate;

// Block substitution engine
pub mod substitute;

// File operations module
pub mod file;

// JSON plan and report module
pub mod json;

// Re-exports
pub use document::{Document, compute_checksum, verify_checksum};
pub use position::{LineIndex, Position};
pub use error::{Result, SpliceError};
pub use locate::{Locator, Region, RegionSpec, resolve_region};
pub use extract::{Extraction, extract};
pub use sentinel::{SentinelCheck, verify_segment};
pub use relocate::{
    InsertionPoint, OrderCheck, Relocated, Relocation, RelocationReport,
    adjust_insertion, relocate,
};
pub use substitute::{Substituted, Substitution, SubstitutionReport, substitute};
pub use file::{LoadedDocument, FileError, read_document, read_text, write_document};
pub use json::{
    PlanRequest, PlanResponse, Operation, SubstitutionPlan, PlanError,
    generate_execution_id,
};
