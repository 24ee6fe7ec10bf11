use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::error::{Result, SpliceError};
use crate::position::LineIndex;

/// How a region of lines is identified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSpec {
    /// Explicit zero-based, end-exclusive line offsets
    Offsets { start: usize, end: usize },
    /// The start marker's line is the first line of the region; the end
    /// marker's line is the first line after it
    Markers { start_marker: String, end_marker: String },
    /// Start marker plus a fixed end offset
    MarkerToOffset { start_marker: String, end: usize },
}

/// Resolved line range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Build a region, checking `start <= end <= len`
    pub fn checked(start: usize, end: usize, len: usize) -> Result<Self> {
        if start > end || end > len {
            return Err(SpliceError::RangeError { start, end, len });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Marker search over one document
///
/// Searches run over the joined text so a marker may span a line break; a
/// hit resolves to the line holding the marker's first byte.
pub struct Locator<'a> {
    document: &'a Document,
    text: String,
    index: LineIndex,
}

impl<'a> Locator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            text: document.to_text(),
            index: LineIndex::new(document),
        }
    }

    /// Index of the first line at or after `from_line` where `marker` occurs
    pub fn find_line(&self, marker: &str, from_line: usize) -> Result<usize> {
        let not_found = || SpliceError::MarkerNotFound { marker: marker.to_string() };

        if marker.is_empty() {
            return Err(not_found());
        }

        let from = self.index.line_start(from_line);
        let hit = self
            .text
            .get(from..)
            .and_then(|rest| rest.find(marker))
            .ok_or_else(not_found)?;

        Ok(self.index.line_of(from + hit))
    }

    /// Resolve a region descriptor into concrete line offsets
    pub fn resolve(&self, spec: &RegionSpec) -> Result<Region> {
        let len = self.document.len();

        let region = match spec {
            RegionSpec::Offsets { start, end } => Region::checked(*start, *end, len)?,
            RegionSpec::Markers { start_marker, end_marker } => {
                let start = self.find_line(start_marker, 0)?;
                let end = self.find_line(end_marker, start + 1)?;
                Region::checked(start, end, len)?
            }
            RegionSpec::MarkerToOffset { start_marker, end } => {
                let start = self.find_line(start_marker, 0)?;
                Region::checked(start, *end, len)?
            }
        };

        debug!(start = region.start, end = region.end, "resolved region");
        Ok(region)
    }
}

/// Resolve a region descriptor against a document
pub fn resolve_region(document: &Document, spec: &RegionSpec) -> Result<Region> {
    Locator::new(document).resolve(spec)
}
