//! Error types for the consistency engine.
//!
//! Errors fall into three groups:
//! - **Validation**: malformed transforms or messages, rejected before they reach a model
//! - **Protocol**: the authority and the local model disagree; fatal to the document session
//! - **Desynchronization**: an editor buffer diverged from the tracked content

use thiserror::Error;

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A transform field was missing or could not be coerced.
    #[error("invalid transform field `{field}`: {reason}")]
    InvalidTransform { field: &'static str, reason: String },

    /// An inbound message did not have the expected shape.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Inbound transforms did not continue from the expected version.
    #[error("received unexpected transform version: {}, expected: {expected}", display_version(.received))]
    VersionMismatch {
        expected: u64,
        received: Option<u64>,
    },

    /// A correction arrived while no send was in flight.
    #[error("received unexpected correction while {state}")]
    UnexpectedCorrection { state: crate::model::ModelState },

    /// A message referenced a document with no open model.
    #[error("document not subscribed: {0}")]
    UnknownDocument(String),

    /// The server reported an error and the connection was torn down.
    #[error("server error: {0}")]
    Server(String),

    /// The editor buffer no longer matches the tracked content.
    #[error("document {document_id} desynchronized: expected {expected} codepoints, editor has {actual}")]
    Desync {
        document_id: String,
        expected: usize,
        actual: usize,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection has been closed.
    #[error("connection closed")]
    Closed,
}

impl SyncError {
    /// Whether the document session must be discarded after this error.
    ///
    /// The only remedy for a fatal error is closing the document and
    /// subscribing again; nothing here retries.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::VersionMismatch { .. }
                | SyncError::UnexpectedCorrection { .. }
                | SyncError::Desync { .. }
                | SyncError::Server(_)
                | SyncError::Closed
        )
    }

    pub(crate) fn invalid_transform(field: &'static str, reason: impl Into<String>) -> Self {
        SyncError::InvalidTransform {
            field,
            reason: reason.into(),
        }
    }
}

fn display_version(version: &Option<u64>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}
