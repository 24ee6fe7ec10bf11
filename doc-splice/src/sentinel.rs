use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SpliceError};

/// Characters of the offending line quoted in a mismatch report
const SNIPPET_CHARS: usize = 50;

/// A content assertion on an extracted segment
///
/// Offsets and markers drift as a document is edited; these checks catch a
/// region that no longer covers what the caller thinks it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelCheck {
    FirstLineContains(String),
    LastLineContains(String),
    /// `offset` is relative to the segment start; negative values count
    /// back from the end (`-1` is the last line)
    LineContains { offset: i64, needle: String },
    LenEquals(usize),
    LenAtLeast(usize),
}

impl fmt::Display for SentinelCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelCheck::FirstLineContains(needle) => {
                write!(f, "first line contains {:?}", needle)
            }
            SentinelCheck::LastLineContains(needle) => {
                write!(f, "last line contains {:?}", needle)
            }
            SentinelCheck::LineContains { offset, needle } => {
                write!(f, "line {} contains {:?}", offset, needle)
            }
            SentinelCheck::LenEquals(n) => write!(f, "segment of exactly {} lines", n),
            SentinelCheck::LenAtLeast(n) => write!(f, "segment of at least {} lines", n),
        }
    }
}

impl SentinelCheck {
    /// Run this check against a segment
    pub fn check(&self, segment: &[String]) -> Result<()> {
        let found = match self {
            SentinelCheck::FirstLineContains(needle) => line_check(segment.first(), needle),
            SentinelCheck::LastLineContains(needle) => line_check(segment.last(), needle),
            SentinelCheck::LineContains { offset, needle } => {
                line_check(line_at(segment, *offset), needle)
            }
            SentinelCheck::LenEquals(n) => {
                (segment.len() != *n).then(|| format!("{} lines", segment.len()))
            }
            SentinelCheck::LenAtLeast(n) => {
                (segment.len() < *n).then(|| format!("{} lines", segment.len()))
            }
        };

        match found {
            None => Ok(()),
            Some(found) => Err(SpliceError::SentinelMismatch {
                check: self.to_string(),
                found,
            }),
        }
    }
}

/// Run every check in order, stopping at the first failure
pub fn verify_segment(segment: &[String], checks: &[SentinelCheck]) -> Result<()> {
    for check in checks {
        if let Err(e) = check.check(segment) {
            warn!(%check, "sentinel check failed");
            return Err(e);
        }
    }
    Ok(())
}

/// `None` on success, otherwise what was found instead
fn line_check(line: Option<&String>, needle: &str) -> Option<String> {
    match line {
        Some(line) if line.contains(needle) => None,
        Some(line) => Some(snippet(line)),
        None => Some("<out of range>".to_string()),
    }
}

fn line_at(segment: &[String], offset: i64) -> Option<&String> {
    if offset >= 0 {
        segment.get(usize::try_from(offset).ok()?)
    } else {
        let back = usize::try_from(offset.unsigned_abs()).ok()?;
        segment.len().checked_sub(back).and_then(|i| segment.get(i))
    }
}

fn snippet(line: &str) -> String {
    line.trim_end_matches(['\r', '\n']).chars().take(SNIPPET_CHARS).collect()
}
