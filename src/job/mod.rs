//! Transcription job model and its status transitions.
//!
//! A job is an immutable value: every transition or edit returns a new
//! `TranscriptionJob`, so a job held by the live session and the same job
//! held by the history ledger never alias.

pub mod link;
pub mod segment;

use serde::{Deserialize, Serialize};

pub use segment::{SegmentPatch, TranscriptSegment};

/// Title shown until metadata lookup resolves.
pub const PLACEHOLDER_TITLE: &str = "Indexing video contents...";
/// Author shown until metadata lookup resolves.
pub const PLACEHOLDER_AUTHOR: &str = "YouTube Creator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing"),
            Self::Completed => write!(f, "Completed"),
            Self::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub url: String,
}

impl VideoMetadata {
    pub fn placeholder(video_id: &str, url: &str) -> Self {
        Self {
            id: video_id.to_string(),
            title: PLACEHOLDER_TITLE.to_string(),
            author: PLACEHOLDER_AUTHOR.to_string(),
            thumbnail: link::thumbnail_url(video_id),
            url: url.to_string(),
        }
    }

    /// Replace the looked-up fields as a unit, keeping id and url.
    pub fn resolved(&self, title: String, author: String, thumbnail: String) -> Self {
        Self {
            id: self.id.clone(),
            title,
            author,
            thumbnail,
            url: self.url.clone(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.title == PLACEHOLDER_TITLE && self.author == PLACEHOLDER_AUTHOR
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJob {
    id: String,
    status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video: Option<VideoMetadata>,
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    /// Epoch milliseconds.
    created_at: i64,
}

impl TranscriptionJob {
    /// A freshly submitted job: processing, no segments yet.
    pub fn start(id: impl Into<String>, video: VideoMetadata, created_at: i64) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Processing,
            video: Some(video),
            segments: Vec::new(),
            summary: None,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn video(&self) -> Option<&VideoMetadata> {
        self.video.as_ref()
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn segment(&self, segment_id: &str) -> Option<&TranscriptSegment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    /// Best available title: resolved metadata, else the placeholder.
    pub fn title(&self) -> Option<&str> {
        self.video.as_ref().map(|v| v.title.as_str())
    }

    /// Replace the video metadata wholesale.
    pub fn with_video(&self, video: VideoMetadata) -> Self {
        Self {
            video: Some(video),
            ..self.clone()
        }
    }

    /// Transition to `Completed`. `completed_at` becomes the new `created_at`.
    /// Terminal jobs are returned unchanged.
    pub fn complete(
        &self,
        segments: Vec<TranscriptSegment>,
        summary: String,
        completed_at: i64,
    ) -> Self {
        if self.status.is_terminal() {
            tracing::warn!(job_id = %self.id, status = %self.status, "Ignoring completion of a finished job");
            return self.clone();
        }
        Self {
            status: JobStatus::Completed,
            segments,
            summary: Some(summary),
            created_at: completed_at,
            ..self.clone()
        }
    }

    /// Transition to `Error`. Terminal jobs are returned unchanged.
    pub fn fail(&self) -> Self {
        if self.status.is_terminal() {
            tracing::warn!(job_id = %self.id, status = %self.status, "Ignoring failure of a finished job");
            return self.clone();
        }
        Self {
            status: JobStatus::Error,
            ..self.clone()
        }
    }

    /// Whole-value segment edit. Unknown ids yield an equal job.
    pub fn with_segment_update(&self, segment_id: &str, patch: &SegmentPatch) -> Self {
        Self {
            segments: segment::patched(&self.segments, segment_id, patch),
            ..self.clone()
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn segment(id: &str, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            id: id.to_string(),
            start_time: "00:00".to_string(),
            speaker: "Host".to_string(),
            text: text.to_string(),
        }
    }

    /// A completed job with segments A("hello"), B("world"), C("!").
    pub fn completed_job(id: &str) -> TranscriptionJob {
        let video = VideoMetadata::placeholder("dQw4w9WgXcQ", "https://youtu.be/dQw4w9WgXcQ")
            .resolved(
                "Never Gonna Give You Up".to_string(),
                "Rick Astley".to_string(),
                "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            );
        TranscriptionJob::start(id, video, 1_000).complete(
            vec![
                segment("A", "hello"),
                segment("B", "world"),
                segment("C", "!"),
            ],
            "A song about commitment.".to_string(),
            2_000,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn processing_job() -> TranscriptionJob {
        TranscriptionJob::start(
            "job1",
            VideoMetadata::placeholder("dQw4w9WgXcQ", "https://youtu.be/dQw4w9WgXcQ"),
            1_000,
        )
    }

    #[test]
    fn test_start_is_processing_with_placeholder() {
        let job = processing_job();
        assert_eq!(job.status(), JobStatus::Processing);
        assert!(job.segments().is_empty());
        assert!(job.summary().is_none());
        let video = job.video().unwrap();
        assert!(video.is_placeholder());
        assert_eq!(video.id, "dQw4w9WgXcQ");
        assert_eq!(video.title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_resolved_replaces_lookup_fields_only() {
        let placeholder = VideoMetadata::placeholder("dQw4w9WgXcQ", "https://youtu.be/dQw4w9WgXcQ");
        let resolved = placeholder.resolved("T".into(), "A".into(), "https://thumb".into());
        assert_eq!(resolved.id, placeholder.id);
        assert_eq!(resolved.url, placeholder.url);
        assert_eq!(resolved.title, "T");
        assert!(!resolved.is_placeholder());
    }

    #[test]
    fn test_complete_refreshes_created_at() {
        let job = processing_job().complete(vec![segment("a", "hi")], "sum".into(), 5_000);
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.created_at(), 5_000);
        assert_eq!(job.summary(), Some("sum"));
        assert_eq!(job.segments().len(), 1);
    }

    #[test]
    fn test_terminal_states_are_monotonic() {
        let failed = processing_job().fail();
        assert_eq!(failed.status(), JobStatus::Error);
        let still_failed = failed.complete(vec![segment("a", "hi")], "sum".into(), 5_000);
        assert_eq!(still_failed, failed);

        let completed = completed_job("job2");
        assert_eq!(completed.fail(), completed);
    }

    #[test]
    fn test_segment_update_round_trip() {
        let job = completed_job("job1");
        let updated = job.with_segment_update("B", &SegmentPatch::text("WORLD"));

        assert_eq!(updated.segments()[0], job.segments()[0]);
        assert_eq!(updated.segments()[1].text, "WORLD");
        assert_eq!(updated.segments()[2], job.segments()[2]);
        assert_eq!(updated.id(), job.id());
        assert_eq!(updated.created_at(), job.created_at());
    }

    #[test]
    fn test_segment_update_unknown_id_is_noop() {
        let job = completed_job("job1");
        let updated = job.with_segment_update("nope", &SegmentPatch::text("x"));
        assert_eq!(updated, job);
    }

    #[test]
    fn test_deserialize_without_segments_defaults_empty() {
        let json = r#"{"id":"j","status":"error","createdAt":1}"#;
        let job: TranscriptionJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.status(), JobStatus::Error);
        assert!(job.segments().is_empty());
        assert!(job.video().is_none());
    }
}
