//! Plan (request) and report (response) wire types
//!
//! A plan names one operation against one document. The response is what the
//! binary prints, either as JSON or as a short human summary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SpliceError;
use crate::file::{FileError, read_text};
use crate::relocate::{Relocation, RelocationReport};
use crate::substitute::{Substitution, SubstitutionReport};

fn auto_execution_id() -> String {
    "auto".to_string()
}

/// A single operation to run against the document
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    /// Caller-chosen id, or `"auto"` to generate one
    #[serde(default = "auto_execution_id")]
    pub execution_id: String,
    /// BLAKE3 checksum of the document snapshot the plan was written against
    #[serde(default)]
    pub expected_checksum: Option<String>,
    pub operation: Operation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Relocate(Relocation),
    Substitute(SubstitutionPlan),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Relocate(_) => "relocate",
            Operation::Substitute(_) => "substitute",
        }
    }
}

/// Substitution as written in a plan: the replacement is inline or in a file
#[derive(Debug, Clone, Deserialize)]
pub struct SubstitutionPlan {
    pub start_marker: String,
    pub end_marker: String,
    #[serde(default)]
    pub replacement: Option<String>,
    /// Relative paths resolve against the plan file's directory
    #[serde(default)]
    pub replacement_file: Option<PathBuf>,
}

impl SubstitutionPlan {
    /// Load the replacement text and build the substitution
    pub fn into_substitution(self, base_dir: &Path) -> Result<Substitution, PlanError> {
        let replacement = match (self.replacement, self.replacement_file) {
            (Some(text), None) => text,
            (None, Some(file)) => read_text(base_dir.join(file))?,
            (Some(_), Some(_)) => {
                return Err(PlanError::Replacement(
                    "both replacement and replacement_file are set".to_string(),
                ));
            }
            (None, None) => {
                return Err(PlanError::Replacement(
                    "one of replacement or replacement_file is required".to_string(),
                ));
            }
        };

        Ok(Substitution {
            start_marker: self.start_marker,
            end_marker: self.end_marker,
            replacement,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid plan: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid replacement: {0}")]
    Replacement(String),

    #[error(transparent)]
    File(#[from] FileError),
}

impl PlanRequest {
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of a run, success or failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanResponse {
    pub execution_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_before: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_after: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines_moved: Option<usize>,
    /// First and last moved line (1-indexed) in the original document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_from: Option<(usize, usize)>,
    /// 1-indexed line where the moved segment now starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_marker_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_marker_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_after: Option<String>,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanResponse {
    fn empty(execution_id: String, success: bool) -> Self {
        Self {
            execution_id,
            success,
            operation: None,
            lines_before: None,
            lines_after: None,
            lines_moved: None,
            moved_from: None,
            moved_to: None,
            start_marker_line: None,
            end_marker_line: None,
            checksum_before: None,
            checksum_after: None,
            written: false,
            error_kind: None,
            error: None,
        }
    }

    pub fn relocated(execution_id: String, report: &RelocationReport, written: bool) -> Self {
        Self {
            operation: Some("relocate".to_string()),
            lines_before: Some(report.lines_before),
            lines_after: Some(report.lines_after),
            lines_moved: Some(report.lines_moved),
            moved_from: Some((report.source.start + 1, report.source.end)),
            moved_to: Some(report.destination + 1),
            checksum_before: Some(report.checksum_before.clone()),
            checksum_after: Some(report.checksum_after.clone()),
            written,
            ..Self::empty(execution_id, true)
        }
    }

    pub fn substituted(execution_id: String, report: &SubstitutionReport, written: bool) -> Self {
        Self {
            operation: Some("substitute".to_string()),
            start_marker_line: Some(report.start_marker_line),
            end_marker_line: Some(report.end_marker_line),
            lines_before: Some(report.lines_before),
            lines_after: Some(report.lines_after),
            checksum_before: Some(report.checksum_before.clone()),
            checksum_after: Some(report.checksum_after.clone()),
            written,
            ..Self::empty(execution_id, true)
        }
    }

    pub fn failure(execution_id: String, kind: &str, error: String) -> Self {
        Self {
            error_kind: Some(kind.to_string()),
            error: Some(error),
            ..Self::empty(execution_id, false)
        }
    }

    pub fn from_splice_error(execution_id: String, err: &SpliceError) -> Self {
        Self::failure(execution_id, err.kind(), err.to_string())
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }
}

/// Generate a fresh execution id
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
