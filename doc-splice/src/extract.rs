use crate::document::Document;
use crate::error::Result;
use crate::locate::Region;

/// A segment cut out of a document, and what is left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// `document[start..end]`
    pub segment: Vec<String>,
    /// `document[..start] + document[end..]`
    pub remainder: Vec<String>,
}

/// Split a document into the region's lines and the remaining lines
///
/// The document itself is left untouched so it stays available for the
/// post-splice comparison.
///
/// # Returns
/// * `Ok(Extraction)` - Segment and remainder as new sequences
/// * `Err(SpliceError::RangeError)` - Region does not fit the document
pub fn extract(document: &Document, region: Region) -> Result<Extraction> {
    let Region { start, end } = Region::checked(region.start, region.end, document.len())?;
    let lines = document.lines();

    let segment = lines[start..end].to_vec();

    let mut remainder = Vec::with_capacity(lines.len() - segment.len());
    remainder.extend_from_slice(&lines[..start]);
    remainder.extend_from_slice(&lines[end..]);

    Ok(Extraction { segment, remainder })
}
