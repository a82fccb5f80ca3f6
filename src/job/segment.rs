use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One timestamped, speaker-attributed span of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub id: String,
    /// Display string such as "01:23". Never parsed.
    pub start_time: String,
    pub speaker: String,
    pub text: String,
}

/// Fields of a segment that may be overwritten. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentPatch {
    pub speaker: Option<String>,
    pub text: Option<String>,
}

impl SegmentPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            speaker: None,
            text: Some(text.into()),
        }
    }

    pub fn speaker(speaker: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            text: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.speaker.is_none() && self.text.is_none()
    }

    fn apply(&self, segment: &TranscriptSegment) -> TranscriptSegment {
        TranscriptSegment {
            id: segment.id.clone(),
            start_time: segment.start_time.clone(),
            speaker: self
                .speaker
                .clone()
                .unwrap_or_else(|| segment.speaker.clone()),
            text: self.text.clone().unwrap_or_else(|| segment.text.clone()),
        }
    }
}

/// Position of `id` in store order.
pub fn position(segments: &[TranscriptSegment], id: &str) -> Option<usize> {
    segments.iter().position(|s| s.id == id)
}

/// Returns a new sequence with `patch` applied to the segment matching `id`.
/// Unknown ids yield an identical copy.
pub fn patched(
    segments: &[TranscriptSegment],
    id: &str,
    patch: &SegmentPatch,
) -> Vec<TranscriptSegment> {
    segments
        .iter()
        .map(|s| if s.id == id { patch.apply(s) } else { s.clone() })
        .collect()
}

/// The segment matching `id` together with its immediate neighbours in store order.
pub fn with_neighbours<'a>(
    segments: &'a [TranscriptSegment],
    id: &str,
) -> Option<(
    Option<&'a TranscriptSegment>,
    &'a TranscriptSegment,
    Option<&'a TranscriptSegment>,
)> {
    let index = position(segments, id)?;
    let previous = index.checked_sub(1).and_then(|i| segments.get(i));
    let next = segments.get(index + 1);
    Some((previous, &segments[index], next))
}

/// Checks the per-job identity invariant: every id non-empty and unique.
pub fn check_ids(segments: &[TranscriptSegment]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for segment in segments {
        if segment.id.trim().is_empty() {
            return Err("segment with empty id".to_string());
        }
        if !seen.insert(segment.id.as_str()) {
            return Err(format!("duplicate segment id '{}'", segment.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            id: id.to_string(),
            start_time: "00:00".to_string(),
            speaker: "Host".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_patched_changes_only_matching_text() {
        let segments = vec![seg("a", "hello"), seg("b", "world"), seg("c", "!")];
        let updated = patched(&segments, "b", &SegmentPatch::text("WORLD"));

        assert_eq!(updated[0], segments[0]);
        assert_eq!(updated[1].text, "WORLD");
        assert_eq!(updated[1].speaker, "Host");
        assert_eq!(updated[1].start_time, "00:00");
        assert_eq!(updated[2], segments[2]);
    }

    #[test]
    fn test_patched_speaker_keeps_text() {
        let segments = vec![seg("a", "hello")];
        let updated = patched(&segments, "a", &SegmentPatch::speaker("Guest"));
        assert_eq!(updated[0].speaker, "Guest");
        assert_eq!(updated[0].text, "hello");
    }

    #[test]
    fn test_patched_unknown_id_is_identical() {
        let segments = vec![seg("a", "hello"), seg("b", "world")];
        let updated = patched(&segments, "zzz", &SegmentPatch::text("nope"));
        assert_eq!(updated, segments);
    }

    #[test]
    fn test_with_neighbours_edges() {
        let segments = vec![seg("a", "1"), seg("b", "2"), seg("c", "3")];

        let (prev, current, next) = with_neighbours(&segments, "a").unwrap();
        assert!(prev.is_none());
        assert_eq!(current.id, "a");
        assert_eq!(next.unwrap().id, "b");

        let (prev, _, next) = with_neighbours(&segments, "c").unwrap();
        assert_eq!(prev.unwrap().id, "b");
        assert!(next.is_none());

        assert!(with_neighbours(&segments, "missing").is_none());
    }

    #[test]
    fn test_check_ids_rejects_duplicates_and_blanks() {
        assert!(check_ids(&[seg("a", "x"), seg("b", "y")]).is_ok());
        assert!(check_ids(&[]).is_ok());

        let err = check_ids(&[seg("a", "x"), seg("a", "y")]).unwrap_err();
        assert!(err.contains("duplicate"));

        let err = check_ids(&[seg("  ", "x")]).unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_segment_serializes_camel_case() {
        let json = serde_json::to_string(&seg("a", "hi")).unwrap();
        assert!(json.contains("\"startTime\":\"00:00\""));
    }
}
