use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{ReelError, ReelResult},
    model::{BoundingBox, FrameRecord, PersonPosition, TraceDocument},
};

/// Separates frame blocks in the raw trace text.
const FRAME_SENTINEL: &str = "frameend";

const RATE_PREFIX: &str = "Frame rate: ";
const INDEX_PREFIX: &str = "Frame ";
const COUNT_PREFIX: &str = "Total count: ";

/// Data rows carry seven integers in the 2nd..=8th colon-delimited fields.
const PERSON_FIELDS: usize = 7;

/// Parse the raw trace text into an ordered [`TraceDocument`].
///
/// The grammar is fixed and positional: frame blocks separated by the
/// literal `frameend` sentinel, three header-line kinds matched by exact
/// prefix, and everything else treated as a person data row. Blocks carry
/// no cross-block state, so they are parsed in parallel and collected into
/// the frame-index-ordered map afterwards. Any malformed row aborts the
/// whole parse; a partially built document is never returned.
pub fn parse_trace(raw: &str) -> ReelResult<TraceDocument> {
    let mut blocks: Vec<&str> = raw.split(FRAME_SENTINEL).collect();
    // Whatever follows the last sentinel (typically whitespace) is discarded.
    blocks.pop();

    let parsed = blocks
        .par_iter()
        .map(|block| parse_block(block))
        .collect::<ReelResult<Vec<_>>>()?;

    let mut frames = BTreeMap::new();
    for (frame_index, record) in parsed {
        // Duplicate indices keep the later block, matching the legacy store.
        frames.insert(frame_index, record);
    }

    debug!(frames = frames.len(), "parsed trace");
    let doc = TraceDocument::new(frames);
    doc.validate();
    Ok(doc)
}

fn parse_block(block: &str) -> ReelResult<(u64, FrameRecord)> {
    let mut frame_index = 0u64;
    let mut frame_rate = 0f64;
    let mut people_count = 0u64;
    let mut people = Vec::new();

    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }

        // "Frame rate: " must be tested before "Frame ": the shorter prefix
        // shadows it.
        if let Some(rest) = line.strip_prefix(RATE_PREFIX) {
            frame_rate = rest
                .trim()
                .parse()
                .map_err(|_| ReelError::parse(frame_index, line))?;
            continue;
        }

        if let Some(rest) = line.strip_prefix(INDEX_PREFIX) {
            let head = rest.split(':').next().unwrap_or_default();
            frame_index = head
                .trim()
                .parse()
                .map_err(|_| ReelError::parse(frame_index, line))?;
            continue;
        }

        if let Some(rest) = line.strip_prefix(COUNT_PREFIX) {
            people_count = rest
                .trim()
                .parse()
                .map_err(|_| ReelError::parse(frame_index, line))?;
            continue;
        }

        people.push(parse_person_row(frame_index, line)?);
    }

    // A block missing a header keeps the zero default. Tolerated weak spot
    // of the format, not a fatal error.
    Ok((
        frame_index,
        FrameRecord {
            people_count,
            frame_rate,
            people,
        },
    ))
}

/// One person per row: fields are colon-separated, each value ends at the
/// first double space. Positionally: x, y, id, left, top, right, bottom.
fn parse_person_row(frame_index: u64, line: &str) -> ReelResult<PersonPosition> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < PERSON_FIELDS + 1 {
        return Err(ReelError::parse(frame_index, line));
    }

    let mut values = [0i64; PERSON_FIELDS];
    for (slot, field) in values.iter_mut().zip(&fields[1..=PERSON_FIELDS]) {
        let head = field.split("  ").next().unwrap_or_default();
        *slot = head
            .trim()
            .parse()
            .map_err(|_| ReelError::parse(frame_index, line))?;
    }

    let [x, y, id, left, top, right, bottom] = values;
    Ok(PersonPosition {
        id,
        x,
        y,
        bbox: BoundingBox {
            top,
            left,
            bottom,
            right,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Frame rate: 24.0\nFrame 1: foo\nTotal count: 2\na:100  :200  :1  :10  :20  :50  :60  \nb:300  :400  :2  :30  :40  :70  :80  \nframeend";

    #[test]
    fn parses_sample_block() {
        let doc = parse_trace(SAMPLE).unwrap();
        assert_eq!(doc.len(), 1);

        let rec = doc.get(1).unwrap();
        assert_eq!(rec.people_count, 2);
        assert_eq!(rec.frame_rate, 24.0);
        assert_eq!(rec.people.len(), 2);

        let a = &rec.people[0];
        assert_eq!((a.x, a.y, a.id), (100, 200, 1));
        assert_eq!(
            a.bbox,
            BoundingBox {
                left: 10,
                top: 20,
                right: 50,
                bottom: 60
            }
        );

        let b = &rec.people[1];
        assert_eq!((b.x, b.y, b.id), (300, 400, 2));
        assert_eq!(
            b.bbox,
            BoundingBox {
                left: 30,
                top: 40,
                right: 70,
                bottom: 80
            }
        );
    }

    #[test]
    fn rate_prefix_does_not_set_frame_index() {
        // "Frame rate: 24.0" also starts with "Frame "; the longer prefix
        // must win or the rate line would clobber the index.
        let doc = parse_trace("Frame 3: x\nFrame rate: 24.0\nframeend").unwrap();
        let rec = doc.get(3).unwrap();
        assert_eq!(rec.frame_rate, 24.0);
    }

    #[test]
    fn missing_headers_default_to_zero() {
        let doc = parse_trace("a:1  :2  :3  :4  :5  :6  :7  \nframeend").unwrap();
        let rec = doc.get(0).unwrap();
        assert_eq!(rec.people_count, 0);
        assert_eq!(rec.frame_rate, 0.0);
        assert_eq!(rec.people.len(), 1);
    }

    #[test]
    fn malformed_row_aborts_with_offending_line() {
        let trace = "Frame 2: x\nnot a person row\nframeend";
        let err = parse_trace(trace).unwrap_err();
        match err {
            ReelError::Parse { frame_index, line } => {
                assert_eq!(frame_index, 2);
                assert_eq!(line, "not a person row");
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn non_numeric_field_is_a_parse_error() {
        let trace = "Frame 1: x\na:100  :oops  :1  :2  :3  :4  :5  \nframeend";
        assert!(matches!(
            parse_trace(trace),
            Err(ReelError::Parse { frame_index: 1, .. })
        ));
    }

    #[test]
    fn trailing_content_after_last_sentinel_is_discarded() {
        let doc = parse_trace("Frame 1: x\nframeend\n   \n").unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn input_without_sentinel_yields_empty_document() {
        let doc = parse_trace("Frame 1: x\n").unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn one_record_per_distinct_frame_header() {
        let trace = "Frame 1: x\nTotal count: 0\nframeend\nFrame 2: x\nTotal count: 3\nframeend";
        let doc = parse_trace(trace).unwrap();
        assert_eq!(doc.frame_indices(), vec![1, 2]);
        assert_eq!(doc.get(2).unwrap().people_count, 3);
    }

    #[test]
    fn later_duplicate_block_wins() {
        let trace = "Frame 1: x\nTotal count: 1\nframeend\nFrame 1: x\nTotal count: 9\nframeend";
        let doc = parse_trace(trace).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get(1).unwrap().people_count, 9);
    }

    #[test]
    fn last_header_of_each_kind_wins_within_block() {
        let trace = "Frame rate: 24.0\nFrame rate: 30.0\nFrame 1: x\nTotal count: 2\nTotal count: 5\nframeend";
        let rec = parse_trace(trace).unwrap().get(1).cloned().unwrap();
        assert_eq!(rec.frame_rate, 30.0);
        assert_eq!(rec.people_count, 5);
    }
}
