use serde::Serialize;
use thiserror::Error;

/// Coarse failure category, carried on notifications so the user-facing
/// layer can style them without matching on error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MetadataFetchFailure,
    GenerationFailure,
    RefinementFailure,
    PersistenceFailure,
}

/// Failures of the job lifecycle, converted at the boundary where the
/// external call is made. The session records them as status and
/// notifications; it never propagates them to its callers.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid video link: {0}")]
    InvalidInput(String),

    #[error("Metadata lookup failed: {0}")]
    MetadataFetch(#[source] ServiceError),

    #[error("Transcript generation failed: {0}")]
    Generation(#[source] ServiceError),

    #[error("Segment refinement failed: {0}")]
    Refinement(#[source] ServiceError),

    #[error("Stored record '{name}' is unreadable: {reason}")]
    Persistence { name: String, reason: String },
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::MetadataFetch(_) => ErrorKind::MetadataFetchFailure,
            Self::Generation(_) => ErrorKind::GenerationFailure,
            Self::Refinement(_) => ErrorKind::RefinementFailure,
            Self::Persistence { .. } => ErrorKind::PersistenceFailure,
        }
    }
}

/// Errors raised by the external collaborators (metadata lookup, LLM).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Service not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = JobError::InvalidInput("not a url".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = JobError::Generation(ServiceError::InvalidResponse("no segments".into()));
        assert_eq!(err.kind(), ErrorKind::GenerationFailure);

        let err = JobError::Persistence {
            name: "history".to_string(),
            reason: "expected array".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
    }

    #[test]
    fn test_display_includes_source_message() {
        let err = JobError::Refinement(ServiceError::ServerError {
            status: 503,
            message: "overloaded".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("refinement"));
        assert!(msg.contains("503"));
        assert!(msg.contains("overloaded"));
    }

    #[test]
    fn test_serde_kind_values() {
        let json = serde_json::to_string(&ErrorKind::MetadataFetchFailure).unwrap();
        assert_eq!(json, "\"metadata_fetch_failure\"");
    }
}
