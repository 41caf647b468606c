use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable tag for each failure class, exposed to callers as `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownSubject,
    PreconditionFailed,
    InvalidInput,
    ProviderUnavailable,
    ProviderRejected,
    ProviderTimeout,
    NormalizationFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownSubject => "unknown_subject",
            Self::PreconditionFailed => "precondition_failed",
            Self::InvalidInput => "invalid_input",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderRejected => "provider_rejected",
            Self::ProviderTimeout => "provider_timeout",
            Self::NormalizationFailure => "normalization_failure",
        }
    }

    /// Whether the provider may have applied a side effect before failing.
    ///
    /// Callers should re-query status before retrying a stage that failed
    /// with one of these kinds.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::ProviderTimeout | Self::NormalizationFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestration errors. Every engine and provider operation returns one of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// `status` is set when the provider raised the rejection, `None` for
    /// local request validation.
    #[error("invalid input: {message}")]
    InvalidInput { status: Option<u16>, message: String },

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("provider rejected request (HTTP {status}, code {code:?}): {message}")]
    ProviderRejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("provider timed out after {timeout_secs}s: {operation}")]
    ProviderTimeout { operation: String, timeout_secs: u64 },

    #[error("normalization failure: {0}")]
    NormalizationFailure(String),
}

impl VerificationError {
    /// Local validation failure raised before any provider call.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSubject(_) => ErrorKind::UnknownSubject,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::ProviderRejected { .. } => ErrorKind::ProviderRejected,
            Self::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            Self::NormalizationFailure(_) => ErrorKind::NormalizationFailure,
        }
    }

    /// HTTP status the provider answered with, when there was an answer.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Self::InvalidInput { status, .. } => *status,
            Self::ProviderRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a provider 404, which deletion treats as "nothing to delete".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProviderRejected { status: 404, .. })
    }

    /// Message suitable for callers.
    ///
    /// Provider payloads are only passed through verbatim when `verbose` is
    /// set (non-production); otherwise a fixed description per kind is used.
    /// Local validation messages never contain provider data and are always
    /// returned as-is.
    pub fn public_message(&self, verbose: bool) -> String {
        match self {
            Self::UnknownSubject(_)
            | Self::PreconditionFailed(_)
            | Self::InvalidInput { status: None, .. } => self.to_string(),
            _ if verbose => self.to_string(),
            Self::InvalidInput { .. } => {
                "verification provider rejected the input as malformed".into()
            }
            Self::ProviderUnavailable(_) => "verification provider is unavailable".into(),
            Self::ProviderRejected { .. } => "verification provider rejected the request".into(),
            Self::ProviderTimeout { .. } => {
                "verification provider did not respond in time; re-query status before retrying"
                    .into()
            }
            Self::NormalizationFailure(_) => {
                "verification provider returned an unrecognized response".into()
            }
        }
    }
}
