use std::collections::BTreeMap;

use tracing::warn;

/// Axis-aligned box around one detected person, in raw-image pixel
/// coordinates. `left <= right` and `top <= bottom` hold for well-formed
/// input but are not guaranteed; renderers must tolerate violations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "bounding box top")]
    pub top: i64,
    #[serde(rename = "bounding box left")]
    pub left: i64,
    #[serde(rename = "bounding box bottom")]
    pub bottom: i64,
    #[serde(rename = "bounding box right")]
    pub right: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PersonPosition {
    pub id: i64,
    pub x: i64,
    pub y: i64,
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

/// One frame's worth of trace data.
///
/// The serde field names reproduce the legacy JSON contract verbatim; they
/// are display strings, not identifiers, and existing consumers depend on
/// them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRecord {
    #[serde(rename = "Number of people")]
    pub people_count: u64,
    #[serde(rename = "Frame rate")]
    pub frame_rate: f64,
    #[serde(rename = "People position")]
    pub people: Vec<PersonPosition>,
}

impl FrameRecord {
    /// `people_count` is recorded independently of the row data and has
    /// historically drifted; callers check rather than assume.
    pub fn count_is_consistent(&self) -> bool {
        self.people_count as usize == self.people.len()
    }

    /// Intended on-screen hold time for this frame, in seconds.
    pub fn display_duration_secs(&self) -> f64 {
        1.0 / self.frame_rate
    }
}

/// Ordered mapping from frame index to [`FrameRecord`], immutable once
/// built. Serializes as a JSON object keyed by frame-index strings.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TraceDocument(pub BTreeMap<u64, FrameRecord>);

impl TraceDocument {
    pub fn new(frames: BTreeMap<u64, FrameRecord>) -> Self {
        Self(frames)
    }

    pub fn get(&self, frame_index: u64) -> Option<&FrameRecord> {
        self.0.get(&frame_index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Frame indices in increasing order.
    pub fn frame_indices(&self) -> Vec<u64> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &FrameRecord)> {
        self.0.iter().map(|(&k, v)| (k, v))
    }

    /// Warns about frames whose recorded people count disagrees with the
    /// number of parsed rows. Returns how many frames disagreed.
    pub fn validate(&self) -> usize {
        let mut mismatches = 0usize;
        for (&index, record) in &self.0 {
            if !record.count_is_consistent() {
                warn!(
                    frame_index = index,
                    recorded = record.people_count,
                    actual = record.people.len(),
                    "people count disagrees with row data"
                );
                mismatches += 1;
            }
        }
        mismatches
    }
}
