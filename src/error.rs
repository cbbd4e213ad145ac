use thiserror::Error;

use crate::types::TrackRole;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("{role} track is empty; alignment needs at least one cue on each side")]
    EmptyTrack { role: TrackRole },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl AlignmentError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn empty_track(role: TrackRole) -> Self {
        Self::EmptyTrack { role }
    }
}

/// Failure of a [`SimilarityProvider`](crate::SimilarityProvider) call.
///
/// Never surfaced by `align`: the provider guard turns every variant into a
/// lexical fallback.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimilarityError {
    #[error("similarity backend unavailable: {0}")]
    Unavailable(String),
    #[error("similarity backend failed: {0}")]
    Failed(String),
    #[error("similarity call exceeded its budget after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },
    #[error("similarity backend returned a non-finite score ({value})")]
    InvalidScore { value: f32 },
}

impl SimilarityError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }

    pub(crate) fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
