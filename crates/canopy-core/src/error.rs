// SPDX-FileCopyrightText: 2026 Canopy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Canopy control plane.

use thiserror::Error;

/// The primary error type used across all Canopy traits and core operations.
#[derive(Debug, Error)]
pub enum CanopyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Record store errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The coordination backend (queue or key tree) could not be reached.
    #[error("coordination service unavailable: {source}")]
    CoordinationUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A workflow could not be handed to the task runtime.
    #[error("failed to submit flow `{flow}`: {source}")]
    SubmissionFailed {
        flow: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No certificate info is stored for the hostname.
    #[error("no certificate info found for `{hostname}`")]
    RecordNotFound { hostname: String },

    /// Stored certificate info is missing fields required for provisioning.
    #[error("certificate info for `{hostname}` is missing {}", missing.join(", "))]
    InvalidRecord {
        hostname: String,
        missing: Vec<&'static str>,
    },

    /// Stored certificate info for one hostname does not decode.
    #[error("certificate info for `{hostname}` is unreadable: {detail}")]
    MalformedRecord { hostname: String, detail: String },

    /// Operator input was rejected. Each entry describes one offending item.
    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// `post_job` was called with a job type the controller does not know.
    #[error("job type `{0}` is not implemented")]
    UnknownJobType(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CanopyError {
    /// Builds a [`CanopyError::ValidationFailed`] from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            errors: vec![message.into()],
        }
    }

    /// HTTP-equivalent status for surfacing this error to an operator.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ValidationFailed { .. } | Self::UnknownJobType(_) => 400,
            Self::RecordNotFound { .. } => 404,
            Self::CoordinationUnavailable { .. } => 503,
            _ => 500,
        }
    }

    /// Returns `true` for errors caused by caller input rather than infrastructure.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
