//! Error types for ingestion.

use std::fmt;

use cardvault_card::{CardError, FormatError, PayloadDecodeError, SchemaError};
use cardvault_core::CharacterId;
use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Boxed error used as the cause of a persistence failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which fingerprint collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// Same physical file (original fingerprint).
    Original,
    /// Same logical character (content fingerprint).
    Content,
}

impl DuplicateKind {
    /// Metric/log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed ingestion attempt. Each attempt yields exactly one of these.
///
/// No variant leaves partial state behind, except a [`IngestionError::Persistence`]
/// whose `compensation` is set: that reports a cleanup that did not complete.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The upload is not a valid PNG container.
    #[error("invalid card image: {0}")]
    Format(#[from] FormatError),

    /// The payload chunk exists but is corrupt.
    #[error("corrupt card payload: {0}")]
    PayloadDecode(#[from] PayloadDecodeError),

    /// The image carries no definition payload.
    #[error("no character definition found in PNG")]
    NoDefinitionFound,

    /// The payload is not a recognized definition.
    #[error("unsupported character definition: {0}")]
    UnsupportedDefinition(#[from] SchemaError),

    /// The content or the file was already ingested.
    #[error("duplicate {kind} of character {existing}")]
    DuplicateContent {
        /// The character that already holds the fingerprint.
        existing: CharacterId,
        /// Which fingerprint collided.
        kind: DuplicateKind,
    },

    /// A store or artifact operation failed.
    #[error("persistence failed: {message}")]
    Persistence {
        /// What was being attempted.
        message: String,
        /// The failure that aborted the attempt.
        #[source]
        source: Option<BoxError>,
        /// Set when a compensating cleanup also failed; describes that failure.
        compensation: Option<String>,
    },

    /// The character does not exist.
    #[error("character not found: {0}")]
    NotFound(CharacterId),
}

impl IngestionError {
    /// Creates a persistence error with a cause.
    #[must_use]
    pub fn persistence(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
            compensation: None,
        }
    }

    /// Attaches the failure of a compensating action.
    #[must_use]
    pub fn with_failed_compensation(self, failure: impl fmt::Display) -> Self {
        match self {
            Self::Persistence {
                message, source, ..
            } => Self::Persistence {
                message,
                source,
                compensation: Some(failure.to_string()),
            },
            other => Self::Persistence {
                message: "operation failed".to_string(),
                compensation: Some(failure.to_string()),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "format",
            Self::PayloadDecode(_) => "payload_decode",
            Self::NoDefinitionFound => "no_definition",
            Self::UnsupportedDefinition(_) => "unsupported_definition",
            Self::DuplicateContent { .. } => "duplicate",
            Self::Persistence { .. } => "persistence",
            Self::NotFound(_) => "not_found",
        }
    }

    /// Returns true if a compensating cleanup failed.
    #[must_use]
    pub const fn compensation_failed(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                compensation: Some(_),
                ..
            }
        )
    }
}

impl From<CardError> for IngestionError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::Format(e) => Self::Format(e),
            CardError::Payload(e) => Self::PayloadDecode(e),
            CardError::Schema(e) => Self::UnsupportedDefinition(e),
            CardError::NoDefinitionFound => Self::NoDefinitionFound,
        }
    }
}

impl From<StoreError> for IngestionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint, existing } => Self::DuplicateContent {
                existing,
                kind: constraint.duplicate_kind(),
            },
            StoreError::CharacterNotFound(id) => Self::NotFound(id),
            other => Self::persistence("store operation failed", other),
        }
    }
}

impl From<cardvault_core::Error> for IngestionError {
    fn from(err: cardvault_core::Error) -> Self {
        Self::persistence("artifact operation failed", err)
    }
}

/// Failure reported by an artifact hook. Logged, never returned to callers.
#[derive(Debug, Error)]
#[error("artifact hook failed: {message}")]
pub struct ArtifactHookError {
    /// Description of the failure.
    pub message: String,
}

impl ArtifactHookError {
    /// Creates a hook error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
