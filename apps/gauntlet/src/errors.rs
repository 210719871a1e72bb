use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
///
/// Only setup failures and store I/O failures end up here. A failed review or
/// synthesis is persisted as an error placeholder and never becomes a
/// `GauntletError`.
#[derive(Debug, Error)]
pub enum GauntletError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),
}

/// Failure to read or write the artifact store. Always fatal for the run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the document and instruction collaborators.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to extract text from {path}: {message}")]
    Extraction { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_path() {
        let err = StoreError::io(
            "/tmp/outputs/run_1.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/outputs/run_1.md"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_ingest_error_converts_into_gauntlet_error() {
        let err: GauntletError = IngestError::NotFound(PathBuf::from("inputs/call.pdf")).into();
        assert!(matches!(err, GauntletError::Ingest(IngestError::NotFound(_))));
        assert_eq!(err.to_string(), "Not found: inputs/call.pdf");
    }
}
