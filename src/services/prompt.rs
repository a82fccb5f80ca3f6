use serde::Deserialize;

use crate::error::ServiceError;
use crate::job::TranscriptSegment;
use crate::services::{GeneratedTranscript, RewriteContext};

/// Shown to the rewriter in place of a missing neighbour.
const NO_NEIGHBOUR: &str = "None";

/// Build the (system, user) prompt pair for transcript generation.
pub fn build_generation_prompt(url: &str, title: &str) -> (String, String) {
    let system = "You are a professional transcriptionist. You produce speaker-attributed, \
                  timestamped transcripts of public videos and reply with JSON only."
        .to_string();

    let user = format!(
        "Generate a highly detailed, professional-grade transcript for the YouTube video titled \
         \"{title}\" located at {url}.\n\
         Use the actual content of the video or reliable published transcriptions.\n\n\
         Reply with a single JSON object of this shape:\n\
         {{\n  \"summary\": string,\n  \"segments\": [\n    {{ \"id\": string, \"startTime\": string, \
         \"speaker\": string, \"text\": string }}\n  ]\n}}\n\n\
         Rules:\n\
         - \"summary\" is a 2-paragraph executive summary of the video content.\n\
         - Segments are in chronological order.\n\
         - Each segment \"id\" is a unique string.\n\
         - \"startTime\" uses the format MM:SS.\n\
         - \"speaker\" is a label such as Host or Guest, or a name if it is known.\n\
         - \"text\" is the dialogue of that segment.",
        title = title,
        url = url,
    );

    (system, user)
}

/// Build the (system, user) prompt pair for refining one segment.
pub fn build_refinement_prompt(context: &RewriteContext) -> (String, String) {
    let system = "You are an expert transcript editor. You correct a single transcript segment \
                  and return only the corrected text."
        .to_string();

    let user = format!(
        "I am refining a specific segment of a video transcript to ensure high professional quality.\n\n\
         Video Context: \"{topic}\"\n\
         Previous Segment (for context): \"{previous}\"\n\
         Current Segment to Refine: \"{current}\"\n\
         Next Segment (for context): \"{next}\"\n\n\
         Please correct any grammatical errors, spelling mistakes, or nonsensical word choices. \
         Use the surrounding segments to ensure continuity and correct speaker transitions or references.\n\n\
         Return ONLY the corrected text for the \"Current Segment to Refine\". \
         Do not include the previous or next segments in your output.",
        topic = context.topic,
        previous = context.previous.as_deref().unwrap_or(NO_NEIGHBOUR),
        current = context.current,
        next = context.next.as_deref().unwrap_or(NO_NEIGHBOUR),
    );

    (system, user)
}

#[derive(Debug, Deserialize)]
struct RawTranscript {
    summary: String,
    segments: Vec<TranscriptSegment>,
}

/// Validate generator output against the expected shape. Anything else
/// (prose, missing fields, non-string values) is an invalid response.
pub fn parse_generated_transcript(raw: &str) -> Result<GeneratedTranscript, ServiceError> {
    let body = strip_code_fence(raw);
    let parsed: RawTranscript = serde_json::from_str(body).map_err(|e| {
        ServiceError::InvalidResponse(format!("transcript does not match expected shape: {}", e))
    })?;

    Ok(GeneratedTranscript {
        summary: parsed.summary.trim().to_string(),
        segments: parsed.segments,
    })
}

/// Rewriter output with surrounding whitespace trimmed. Empty output is an
/// invalid response; anything else is kept verbatim.
pub fn parse_refined_text(raw: &str) -> Result<String, ServiceError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidResponse(
            "rewriter returned no text".to_string(),
        ));
    }
    Ok(text.to_string())
}

// Models often wrap JSON in ```json ... ``` despite being asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Estimate token count from text (rough: ~4 chars per token for English).
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}
