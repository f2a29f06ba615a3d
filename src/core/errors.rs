//! MCL-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::curation::authorization::RejectionReason;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, CullError>;

/// Top-level error type for media_cull.
#[derive(Debug, Error)]
pub enum CullError {
    #[error("[MCL-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MCL-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MCL-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MCL-1101] validation failure for {field}: {details}")]
    Validation {
        field: &'static str,
        details: String,
    },

    #[error("[MCL-2001] deletion not authorized: {reason}")]
    Unauthorized { reason: RejectionReason },

    #[error("[MCL-2101] media server unreachable: {details}")]
    Connectivity { details: String },

    #[error("[MCL-3001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MCL-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MCL-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[MCL-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CullError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MCL-1001",
            Self::MissingConfig { .. } => "MCL-1002",
            Self::ConfigParse { .. } => "MCL-1003",
            Self::Validation { .. } => "MCL-1101",
            Self::Unauthorized { .. } => "MCL-2001",
            Self::Connectivity { .. } => "MCL-2101",
            Self::Serialization { .. } => "MCL-3001",
            Self::Io { .. } => "MCL-3002",
            Self::ChannelClosed { .. } => "MCL-3003",
            Self::Runtime { .. } => "MCL-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// The core never retries on its own; this only informs callers layered above it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connectivity { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether the failure is a policy decision (fail-closed before any side effect).
    #[must_use]
    pub const fn is_policy_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Validation { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for record/weight validation failures.
    #[must_use]
    pub fn validation(field: &'static str, details: impl Into<String>) -> Self {
        Self::Validation {
            field,
            details: details.into(),
        }
    }
}

impl From<RejectionReason> for CullError {
    fn from(reason: RejectionReason) -> Self {
        Self::Unauthorized { reason }
    }
}

impl From<serde_json::Error> for CullError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CullError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
