//! Plain-text and Markdown renderings of a job's transcript.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::job::{TranscriptSegment, TranscriptionJob};

const FALLBACK_TITLE: &str = "Transcription";
const FALLBACK_FILE_STEM: &str = "export";
const NO_SUMMARY: &str = "No summary available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Timestamped lines only
    Txt,
    /// Title, summary and bold-labelled transcript
    Md,
    /// Title and summary header with plain transcript lines, for pasting
    Copy,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Md | ExportFormat::Copy => "md",
        }
    }
}

pub fn render(job: &TranscriptionJob, format: ExportFormat) -> String {
    let segments = job.segments();
    match format {
        ExportFormat::Txt => plain_lines(segments),
        ExportFormat::Md => {
            let lines: Vec<String> = segments
                .iter()
                .map(|s| format!("**[{}] {}**: {}", s.start_time, s.speaker, s.text))
                .collect();
            format!(
                "{}## Transcript\n{}",
                header(job, job.summary().unwrap_or_default()),
                lines.join("\n\n")
            )
        }
        ExportFormat::Copy => {
            let summary = job
                .summary()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(NO_SUMMARY);
            format!("{}## Transcript\n{}", header(job, summary), plain_lines(segments))
        }
    }
}

fn header(job: &TranscriptionJob, summary: &str) -> String {
    format!(
        "# {}\n\n## Summary\n{}\n\n",
        job.title().unwrap_or(FALLBACK_TITLE),
        summary
    )
}

fn plain_lines(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}] {}: {}", s.start_time, s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `transcript-<video id>.<ext>`
pub fn default_file_name(job: &TranscriptionJob, format: ExportFormat) -> String {
    let stem = job
        .video()
        .map(|v| v.id.as_str())
        .filter(|id| !id.is_empty())
        .unwrap_or(FALLBACK_FILE_STEM);
    format!("transcript-{}.{}", stem, format.extension())
}

/// Render `job` and write it to `output`, or to the default file name in
/// `dir` when no output path is given. Returns the path written.
pub fn write_export(
    job: &TranscriptionJob,
    format: ExportFormat,
    output: Option<&Path>,
    dir: &Path,
) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => dir.join(default_file_name(job, format)),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, render(job, format))
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    tracing::info!(job_id = %job.id(), "Exported transcript to {}", path.display());
    Ok(path)
}
