use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Result, SpliceError};
use crate::position::LineIndex;

/// Replace the text strictly between two markers
///
/// The markers themselves are kept. `replacement` is inserted verbatim, so
/// any leading or trailing line breaks it needs must be part of the text or
/// of the markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub start_marker: String,
    pub end_marker: String,
    pub replacement: String,
}

/// Outcome of an accepted substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    /// 1-indexed line where the start marker begins
    pub start_marker_line: usize,
    /// 1-indexed line where the end marker begins
    pub end_marker_line: usize,
    pub old_body_bytes: usize,
    pub new_body_bytes: usize,
    /// Line breaks in the discarded body
    pub old_body_lines: usize,
    /// Line breaks in the replacement
    pub new_body_lines: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    pub checksum_before: String,
    pub checksum_after: String,
}

#[derive(Debug, Clone)]
pub struct Substituted {
    pub document: Document,
    pub report: SubstitutionReport,
}

/// Swap the body of a marker-delimited block
///
/// The end marker is searched from the end of the start marker onward.
///
/// # Returns
/// * `Ok(Substituted)` - New document and report
/// * `Err(SpliceError::MarkerNotFound)` - Either marker is absent
/// * `Err(SpliceError::InvariantViolation)` - Reassembly check failed
pub fn substitute(document: &Document, substitution: &Substitution) -> Result<Substituted> {
    let text = document.to_text();
    let Substitution { start_marker, end_marker, replacement } = substitution;

    let start_idx = find(&text, start_marker, 0)?;
    let body_start = start_idx + start_marker.len();
    let end_idx = find(&text, end_marker, body_start)?;
    debug!(body_start, body_end = end_idx, "located block body");

    let prefix = &text[..body_start];
    let old_body = &text[body_start..end_idx];
    let suffix = &text[end_idx..];

    let mut new_text = String::with_capacity(prefix.len() + replacement.len() + suffix.len());
    new_text.push_str(prefix);
    new_text.push_str(replacement);
    new_text.push_str(suffix);
    let result = Document::from_text(&new_text);

    let old_body_lines = count_breaks(old_body);
    let new_body_lines = count_breaks(replacement);
    verify_line_count(document.len(), old_body_lines, new_body_lines, result.len())?;

    let index = LineIndex::new(document);
    let report = SubstitutionReport {
        start_marker_line: index.position(start_idx).line,
        end_marker_line: index.position(end_idx).line,
        old_body_bytes: old_body.len(),
        new_body_bytes: replacement.len(),
        old_body_lines,
        new_body_lines,
        lines_before: document.len(),
        lines_after: result.len(),
        checksum_before: document.checksum(),
        checksum_after: result.checksum(),
    };
    info!(
        start_line = report.start_marker_line,
        end_line = report.end_marker_line,
        old_bytes = report.old_body_bytes,
        new_bytes = report.new_body_bytes,
        "substituted block"
    );

    Ok(Substituted { document: result, report })
}

fn find(text: &str, marker: &str, from: usize) -> Result<usize> {
    if marker.is_empty() {
        return Err(SpliceError::MarkerNotFound { marker: String::new() });
    }

    text.get(from..)
        .and_then(|rest| rest.find(marker))
        .map(|hit| from + hit)
        .ok_or_else(|| SpliceError::MarkerNotFound { marker: marker.to_string() })
}

fn count_breaks(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

fn verify_line_count(before: usize, old_body: usize, new_body: usize, after: usize) -> Result<()> {
    // The suffix starts with a non-empty end marker, so the final line's
    // terminator status is unchanged and only the body's breaks differ.
    let expected = (before + new_body)
        .checked_sub(old_body)
        .ok_or_else(|| SpliceError::invariant("body has more lines than the document"))?;

    if expected != after {
        return Err(SpliceError::invariant(format!(
            "expected {} lines after substitution, got {}",
            expected, after
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const START: &str = "  <!-- ===== MEME JAVASCRIPT ===== -->\n  <script>\n";
    const END: &str = "\n  </script>\n  <!-- ===== END MEME JAVASCRIPT ===== -->";

    fn page() -> Document {
        Document::from_text(
            "<body>\n\
             \x20 <!-- ===== MEME JAVASCRIPT ===== -->\n\
             \x20 <script>\n\
             \x20   console.log(\"old\");\n\
             \x20   broken();\n\
             \x20 </script>\n\
             \x20 <!-- ===== END MEME JAVASCRIPT ===== -->\n\
             </body>\n",
        )
    }

    fn substitution(replacement: &str) -> Substitution {
        Substitution {
            start_marker: START.to_string(),
            end_marker: END.to_string(),
            replacement: replacement.to_string(),
        }
    }

    #[test]
    fn test_replaces_body_only() {
        let doc = page();

        let done = substitute(&doc, &substitution("    fixed();")).unwrap();

        assert_eq!(
            done.document.to_text(),
            "<body>\n  <!-- ===== MEME JAVASCRIPT ===== -->\n  <script>\n    fixed();\n  </script>\n  <!-- ===== END MEME JAVASCRIPT ===== -->\n</body>\n"
        );
        assert_eq!(done.report.old_body_lines, 1);
        assert_eq!(done.report.new_body_lines, 0);
        assert_eq!(done.report.lines_before, 8);
        assert_eq!(done.report.lines_after, 7);
        assert_eq!(done.report.start_marker_line, 2);
        assert_eq!(done.report.end_marker_line, 5);
    }

    #[test]
    fn test_multi_line_replacement_grows_document() {
        let doc = page();

        let done = substitute(&doc, &substitution("    a();\n    b();\n    c();")).unwrap();

        assert_eq!(done.report.lines_after, 9);
        assert_eq!(done.document.len(), 9);
    }

    #[test]
    fn test_round_trip_restores_original() {
        let doc = page();

        let replaced = substitute(&doc, &substitution("    fixed();")).unwrap();
        let restored = substitute(
            &replaced.document,
            &substitution("    console.log(\"old\");\n    broken();"),
        )
        .unwrap();

        assert_eq!(restored.document.to_text(), doc.to_text());
    }

    #[test]
    fn test_outside_of_block_unchanged() {
        let doc = page();
        let text = doc.to_text();

        let done = substitute(&doc, &substitution("x")).unwrap();
        let new_text = done.document.to_text();

        let body_start = text.find(START).unwrap() + START.len();
        let body_end = text.find(END).unwrap();
        assert!(new_text.starts_with(&text[..body_start]));
        assert!(new_text.ends_with(&text[body_end..]));
    }

    #[test]
    fn test_missing_start_marker() {
        let doc = Document::from_text("<body>\n</body>\n");

        match substitute(&doc, &substitution("x")) {
            Err(SpliceError::MarkerNotFound { marker }) => assert_eq!(marker, START),
            other => panic!("Expected MarkerNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_end_marker_before_start_is_not_found() {
        let doc = Document::from_text("END\nSTART\nbody\n");
        let sub = Substitution {
            start_marker: "START\n".to_string(),
            end_marker: "END".to_string(),
            replacement: String::new(),
        };

        assert!(matches!(
            substitute(&doc, &sub),
            Err(SpliceError::MarkerNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_replacement_joins_markers() {
        let doc = Document::from_text("[[\nold\n]]\n");
        let sub = Substitution {
            start_marker: "[[\n".to_string(),
            end_marker: "]]".to_string(),
            replacement: String::new(),
        };

        let done = substitute(&doc, &sub).unwrap();

        assert_eq!(done.document.to_text(), "[[\n]]\n");
        assert_eq!(done.report.lines_after, 2);
    }

    #[test]
    fn test_crlf_document() {
        let doc = Document::from_text("<a>\r\nold\r\n</a>\r\n");
        let sub = Substitution {
            start_marker: "<a>\r\n".to_string(),
            end_marker: "</a>".to_string(),
            replacement: "new\r\nnewer\r\n".to_string(),
        };

        let done = substitute(&doc, &sub).unwrap();

        assert_eq!(done.document.to_text(), "<a>\r\nnew\r\nnewer\r\n</a>\r\n");
        assert_eq!(done.report.lines_after, 4);
    }

    #[test]
    fn test_line_count_mismatch_is_invariant_violation() {
        assert!(verify_line_count(8, 1, 0, 7).is_ok());
        assert!(matches!(
            verify_line_count(8, 1, 0, 8),
            Err(SpliceError::InvariantViolation { .. })
        ));
        assert!(matches!(
            verify_line_count(1, 3, 0, 0),
            Err(SpliceError::InvariantViolation { .. })
        ));
    }
}
