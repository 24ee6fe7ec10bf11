//! Segment relocation
//!
//! Moves a contiguous run of lines to another position in the same document:
//! locate, extract, verify sentinels, splice, then check that the result is a
//! permutation of the input before handing it back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Result, SpliceError};
use crate::extract::{Extraction, extract};
use crate::locate::{Locator, Region, RegionSpec};
use crate::sentinel::{SentinelCheck, verify_segment};

/// Where the segment goes, in coordinates of the document before removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPoint {
    /// Line offset in the original document
    Offset(usize),
    /// Directly before the first line containing the marker
    BeforeMarker(String),
    /// Directly after the first line containing the marker
    AfterMarker(String),
}

/// Ordering check run on the spliced document
///
/// Scans `window` lines starting at the segment's new position; the first
/// line containing `first` must precede the first line containing `second`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCheck {
    pub first: String,
    pub second: String,
    pub window: usize,
}

impl OrderCheck {
    pub fn verify(&self, document: &Document, from: usize) -> Result<()> {
        let lines = document.lines();
        let from = from.min(lines.len());
        let to = from.saturating_add(self.window).min(lines.len());
        let window = &lines[from..to];

        let first = window.iter().position(|l| l.contains(self.first.as_str()));
        let second = window.iter().position(|l| l.contains(self.second.as_str()));

        match (first, second) {
            (Some(a), Some(b)) if a < b => {
                debug!(first = from + a, second = from + b, "order check passed");
                Ok(())
            }
            (Some(a), Some(b)) => Err(SpliceError::invariant(format!(
                "{:?} (line {}) does not precede {:?} (line {})",
                self.first,
                from + a + 1,
                self.second,
                from + b + 1
            ))),
            (None, _) => Err(SpliceError::invariant(format!(
                "{:?} not found within {} lines of line {}",
                self.first,
                self.window,
                from + 1
            ))),
            (_, None) => Err(SpliceError::invariant(format!(
                "{:?} not found within {} lines of line {}",
                self.second,
                self.window,
                from + 1
            ))),
        }
    }
}

/// A move of one region to a new position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub region: RegionSpec,
    pub insert_at: InsertionPoint,
    #[serde(default)]
    pub sentinels: Vec<SentinelCheck>,
    #[serde(default)]
    pub order_check: Option<OrderCheck>,
}

impl Relocation {
    pub fn new(region: RegionSpec, insert_at: InsertionPoint) -> Self {
        Self {
            region,
            insert_at,
            sentinels: Vec::new(),
            order_check: None,
        }
    }

    pub fn with_sentinel(mut self, check: SentinelCheck) -> Self {
        self.sentinels.push(check);
        self
    }

    pub fn with_order_check(mut self, check: OrderCheck) -> Self {
        self.order_check = Some(check);
        self
    }
}

/// Outcome of an accepted relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    /// Region the segment was taken from, in original coordinates
    pub source: Region,
    /// Index of the segment's first line in the result
    pub destination: usize,
    pub lines_moved: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    pub checksum_before: String,
    pub checksum_after: String,
}

impl RelocationReport {
    /// The relocation that moves the segment back, applied to the result
    pub fn inverse(&self) -> Relocation {
        let len = self.lines_moved;
        let back_to = if self.source.start <= self.destination {
            self.source.start
        } else {
            self.source.start + len
        };

        Relocation::new(
            RegionSpec::Offsets {
                start: self.destination,
                end: self.destination + len,
            },
            InsertionPoint::Offset(back_to),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Relocated {
    pub document: Document,
    pub report: RelocationReport,
}

/// Map an insertion offset from original coordinates onto the remainder
///
/// Lines before the removed region keep their index. Lines after it move up
/// by the region's length, so an offset at or past `region.end` has to be
/// decremented before it can index the remainder.
pub fn adjust_insertion(insert_at: usize, region: Region) -> usize {
    if insert_at >= region.end {
        insert_at - region.len()
    } else {
        insert_at
    }
}

/// Move a region of lines to a new position
///
/// # Returns
/// * `Ok(Relocated)` - New document and report; the input is untouched
/// * `Err(SpliceError)` - Any locate, range, sentinel or invariant failure
pub fn relocate(document: &Document, relocation: &Relocation) -> Result<Relocated> {
    let locator = Locator::new(document);
    let region = locator.resolve(&relocation.region)?;
    let insert_at = resolve_insertion(&locator, &relocation.insert_at)?;

    if insert_at > document.len() {
        return Err(SpliceError::RangeError {
            start: insert_at,
            end: insert_at,
            len: document.len(),
        });
    }
    if region.start < insert_at && insert_at < region.end {
        return Err(SpliceError::InsertionInsideRegion {
            at: insert_at,
            start: region.start,
            end: region.end,
        });
    }

    let Extraction { segment, remainder } = extract(document, region)?;
    verify_segment(&segment, &relocation.sentinels)?;

    let destination = adjust_insertion(insert_at, region);
    debug!(insert_at, destination, moved = segment.len(), "splicing segment");

    let lines_moved = segment.len();
    let mut lines = Vec::with_capacity(document.len());
    lines.extend_from_slice(&remainder[..destination]);
    lines.extend(segment);
    lines.extend_from_slice(&remainder[destination..]);
    let result = Document::from_lines(lines);

    verify_permutation(document, &result)?;
    verify_line_breaks(document, &result)?;
    if let Some(order) = &relocation.order_check {
        order.verify(&result, destination)?;
    }

    let report = RelocationReport {
        source: region,
        destination,
        lines_moved,
        lines_before: document.len(),
        lines_after: result.len(),
        checksum_before: document.checksum(),
        checksum_after: result.checksum(),
    };
    info!(
        from = region.start + 1,
        to = destination + 1,
        lines = lines_moved,
        "relocated segment"
    );

    Ok(Relocated { document: result, report })
}

fn resolve_insertion(locator: &Locator<'_>, point: &InsertionPoint) -> Result<usize> {
    match point {
        InsertionPoint::Offset(at) => Ok(*at),
        InsertionPoint::BeforeMarker(marker) => locator.find_line(marker, 0),
        InsertionPoint::AfterMarker(marker) => locator.find_line(marker, 0).map(|line| line + 1),
    }
}

/// The result must split back into the same number of lines once written
///
/// A final line without a terminator that is moved ahead of other lines
/// would merge with its new successor on disk.
fn verify_line_breaks(before: &Document, after: &Document) -> Result<()> {
    let written = Document::from_text(&after.to_text()).len();

    if written != before.len() {
        return Err(SpliceError::invariant(format!(
            "unterminated line moved off the end: {} lines would be written as {}",
            before.len(),
            written
        )));
    }
    Ok(())
}

/// Same number of lines, same multiset of lines
fn verify_permutation(before: &Document, after: &Document) -> Result<()> {
    if before.len() != after.len() {
        return Err(SpliceError::invariant(format!(
            "line count changed from {} to {}",
            before.len(),
            after.len()
        )));
    }

    let mut counts: HashMap<&str, i64> = HashMap::new();
    for line in before.lines() {
        *counts.entry(line.as_str()).or_default() += 1;
    }
    for line in after.lines() {
        *counts.entry(line.as_str()).or_default() -= 1;
    }

    if let Some((line, _)) = counts.iter().find(|(_, n)| **n != 0) {
        return Err(SpliceError::invariant(format!(
            "line content not preserved: {:?}",
            line.trim_end()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered(count: usize) -> Document {
        Document::from_lines((0..count).map(|i| format!("L{}\n", i)).collect())
    }

    fn lines(doc: &Document) -> Vec<&str> {
        doc.lines().iter().map(|l| l.trim_end()).collect()
    }

    fn offsets(start: usize, end: usize, at: usize) -> Relocation {
        Relocation::new(RegionSpec::Offsets { start, end }, InsertionPoint::Offset(at))
    }

    #[test]
    fn test_insert_before_region_is_not_adjusted() {
        let mut doc = numbered(10).into_lines();
        doc[3] = "A\n".to_string();
        doc[4] = "B\n".to_string();
        doc[5] = "C\n".to_string();
        let doc = Document::from_lines(doc);

        let moved = relocate(&doc, &offsets(3, 6, 1)).unwrap();

        assert_eq!(
            lines(&moved.document),
            vec!["L0", "A", "B", "C", "L1", "L2", "L6", "L7", "L8", "L9"]
        );
        assert_eq!(moved.report.destination, 1);
    }

    #[test]
    fn test_insert_after_region_is_shifted() {
        let doc = numbered(10);

        let moved = relocate(&doc, &offsets(3, 6, 8)).unwrap();

        assert_eq!(moved.report.destination, 5);
        assert_eq!(
            lines(&moved.document),
            vec!["L0", "L1", "L2", "L6", "L7", "L3", "L4", "L5", "L8", "L9"]
        );
    }

    #[test]
    fn test_adjust_insertion() {
        let region = Region { start: 3, end: 6 };

        assert_eq!(adjust_insertion(0, region), 0);
        assert_eq!(adjust_insertion(3, region), 3);
        assert_eq!(adjust_insertion(6, region), 3);
        assert_eq!(adjust_insertion(8, region), 5);
        assert_eq!(adjust_insertion(10, region), 7);
    }

    #[test]
    fn test_insert_at_end_of_document() {
        let doc = numbered(5);

        let moved = relocate(&doc, &offsets(0, 2, 5)).unwrap();

        assert_eq!(lines(&moved.document), vec!["L2", "L3", "L4", "L0", "L1"]);
    }

    #[test]
    fn test_insert_at_region_bounds_is_identity() {
        let doc = numbered(6);

        for at in [2, 4] {
            let moved = relocate(&doc, &offsets(2, 4, at)).unwrap();
            assert_eq!(moved.document, doc);
        }
    }

    #[test]
    fn test_insert_inside_region_rejected() {
        let doc = numbered(10);

        let result = relocate(&doc, &offsets(3, 6, 4));

        assert!(matches!(
            result,
            Err(SpliceError::InsertionInsideRegion { at: 4, start: 3, end: 6 })
        ));
    }

    #[test]
    fn test_insert_past_end_rejected() {
        let doc = numbered(4);

        let result = relocate(&doc, &offsets(0, 1, 9));

        assert!(matches!(result, Err(SpliceError::RangeError { start: 9, .. })));
    }

    #[test]
    fn test_length_and_content_conserved_for_every_target() {
        let doc = numbered(12);

        for at in (0..=12).filter(|at| !(4 < *at && *at < 7)) {
            let moved = relocate(&doc, &offsets(4, 7, at)).unwrap();

            assert_eq!(moved.document.len(), doc.len());
            let mut sorted_after = moved.document.lines().to_vec();
            let mut sorted_before = doc.lines().to_vec();
            sorted_after.sort();
            sorted_before.sort();
            assert_eq!(sorted_after, sorted_before);
        }
    }

    #[test]
    fn test_inverse_restores_original() {
        let doc = Document::from_text("a\r\nb\nc\nd\ne\nf\ng");

        for (start, end, at) in [(1, 3, 6), (4, 6, 0), (2, 5, 6), (0, 1, 3)] {
            let moved = relocate(&doc, &offsets(start, end, at)).unwrap();
            let back = relocate(&moved.document, &moved.report.inverse()).unwrap();

            assert_eq!(back.document.to_text(), doc.to_text());
        }
    }

    #[test]
    fn test_marker_region_before_marker() {
        let doc = Document::from_text(
            "<!-- LEADERBOARDS -->\n\
             <table></table>\n\
             <!-- BULLETIN -->\n\
             <ul></ul>\n\
             <!-- MEME -->\n\
             <img>\n\
             \n\
             <!-- FRIENDS -->\n",
        );
        let relocation = Relocation::new(
            RegionSpec::Markers {
                start_marker: "<!-- MEME -->".to_string(),
                end_marker: "<!-- FRIENDS -->".to_string(),
            },
            InsertionPoint::BeforeMarker("<!-- BULLETIN -->".to_string()),
        )
        .with_sentinel(SentinelCheck::FirstLineContains("MEME".to_string()))
        .with_sentinel(SentinelCheck::LenEquals(3))
        .with_order_check(OrderCheck {
            first: "MEME".to_string(),
            second: "BULLETIN".to_string(),
            window: 10,
        });

        let moved = relocate(&doc, &relocation).unwrap();

        assert_eq!(
            lines(&moved.document),
            vec![
                "<!-- LEADERBOARDS -->",
                "<table></table>",
                "<!-- MEME -->",
                "<img>",
                "",
                "<!-- BULLETIN -->",
                "<ul></ul>",
                "<!-- FRIENDS -->",
            ]
        );
        assert_eq!(moved.report.lines_moved, 3);
        assert_eq!(moved.report.lines_before, moved.report.lines_after);
        assert_ne!(moved.report.checksum_before, moved.report.checksum_after);
    }

    #[test]
    fn test_after_marker() {
        let doc = numbered(6);
        let relocation = Relocation::new(
            RegionSpec::Offsets { start: 4, end: 6 },
            InsertionPoint::AfterMarker("L0".to_string()),
        );

        let moved = relocate(&doc, &relocation).unwrap();

        assert_eq!(lines(&moved.document), vec!["L0", "L4", "L5", "L1", "L2", "L3"]);
    }

    #[test]
    fn test_sentinel_failure_aborts() {
        // Offsets drifted by one: the region starts on the line above the header
        let doc = Document::from_text("x\n\n<!-- MEME -->\nimg\n");
        let relocation = offsets(1, 3, 0)
            .with_sentinel(SentinelCheck::FirstLineContains("MEME".to_string()));

        let result = relocate(&doc, &relocation);

        assert!(matches!(result, Err(SpliceError::SentinelMismatch { .. })));
    }

    #[test]
    fn test_order_check_failure() {
        let doc = numbered(8);
        let relocation = offsets(5, 6, 1).with_order_check(OrderCheck {
            first: "L0".to_string(),
            second: "L5".to_string(),
            window: 4,
        });

        // L5 now sits at index 1 and L0 is before the scanned window
        let result = relocate(&doc, &relocation);

        assert!(matches!(result, Err(SpliceError::InvariantViolation { .. })));
    }

    #[test]
    fn test_order_check_wrong_order() {
        let doc = numbered(4);
        let check = OrderCheck {
            first: "L2".to_string(),
            second: "L1".to_string(),
            window: 4,
        };

        match check.verify(&doc, 0) {
            Err(SpliceError::InvariantViolation { detail }) => {
                assert!(detail.contains("does not precede"))
            }
            other => panic!("Expected InvariantViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_last_line_cannot_move_up() {
        let doc = Document::from_text("a\nb\nc");

        let result = relocate(&doc, &offsets(2, 3, 0));

        match result {
            Err(SpliceError::InvariantViolation { detail }) => {
                assert!(detail.contains("unterminated"))
            }
            other => panic!("Expected InvariantViolation, got {:?}", other.map(|r| r.report)),
        }
    }

    #[test]
    fn test_unterminated_last_line_stays_last() {
        let doc = Document::from_text("a\nb\nc");

        let moved = relocate(&doc, &offsets(0, 1, 2)).unwrap();

        assert_eq!(moved.document.to_text(), "b\na\nc");
    }

    #[test]
    fn test_verify_permutation_detects_lost_line() {
        let before = numbered(3);
        let after = Document::from_lines(vec!["L0\n".into(), "L1\n".into(), "L1\n".into()]);

        assert!(matches!(
            verify_permutation(&before, &after),
            Err(SpliceError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_relocation_deserializes_from_plan_json() {
        let json = r#"{
            "region": {"offsets": {"start": 3, "end": 6}},
            "insert_at": {"offset": 8}
        }"#;

        let relocation: Relocation = serde_json::from_str(json).unwrap();

        assert_eq!(relocation, offsets(3, 6, 8));
    }
}
