//! External collaborators: metadata lookup, transcript generation and
//! segment rewriting. The session only sees these traits.

pub mod llm;
pub mod oembed;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::job::TranscriptSegment;

/// Looked-up video details. Applied to a job as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    pub title: String,
    pub author: String,
    pub thumbnail: String,
}

/// Validated generator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTranscript {
    pub summary: String,
    pub segments: Vec<TranscriptSegment>,
}

/// Everything the rewriter is told about the segment being refined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    /// Job summary, else the video title.
    pub topic: String,
    pub previous: Option<String>,
    pub current: String,
    pub next: Option<String>,
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    fn name(&self) -> &str;
    async fn resolve(&self, url: &str) -> Result<ResolvedMetadata, ServiceError>;
}

#[async_trait]
pub trait TranscriptGenerator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, url: &str, title: &str) -> Result<GeneratedTranscript, ServiceError>;
}

#[async_trait]
pub trait SegmentRewriter: Send + Sync {
    fn name(&self) -> &str;
    /// Replacement text for `context.current` only.
    async fn rewrite(&self, context: &RewriteContext) -> Result<String, ServiceError>;
}

/// The three collaborators a session calls out to.
#[derive(Clone)]
pub struct Services {
    pub metadata: Arc<dyn MetadataResolver>,
    pub generator: Arc<dyn TranscriptGenerator>,
    pub rewriter: Arc<dyn SegmentRewriter>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("metadata", &self.metadata.name())
            .field("generator", &self.generator.name())
            .field("rewriter", &self.rewriter.name())
            .finish()
    }
}

/// Stand-in for a collaborator that could not be built from config.
/// Every call fails with `NotConfigured`.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    reason: String,
}

impl Unconfigured {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> ServiceError {
        ServiceError::NotConfigured(self.reason.clone())
    }
}

#[async_trait]
impl MetadataResolver for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn resolve(&self, _url: &str) -> Result<ResolvedMetadata, ServiceError> {
        Err(self.error())
    }
}

#[async_trait]
impl TranscriptGenerator for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn generate(&self, _url: &str, _title: &str) -> Result<GeneratedTranscript, ServiceError> {
        Err(self.error())
    }
}

#[async_trait]
impl SegmentRewriter for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn rewrite(&self, _context: &RewriteContext) -> Result<String, ServiceError> {
        Err(self.error())
    }
}
