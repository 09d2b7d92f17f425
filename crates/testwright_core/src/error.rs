//! Error types for the generation/repair pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type WrightResult<T> = Result<T, WrightError>;

/// Errors that can occur while generating or repairing a test.
#[derive(Error, Debug)]
pub enum WrightError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Input file is empty: {0}")]
    InputEmpty(PathBuf),

    #[error("Input '{what}' is too large: {size} bytes (limit {limit})")]
    InputTooLarge {
        what: String,
        size: usize,
        limit: usize,
    },

    #[error("Failed to read input {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No credential configured for {0}. Set the matching API key environment variable")]
    CredentialMissing(String),

    #[error("Authentication rejected by {provider} (HTTP {status})")]
    AuthFailed { provider: String, status: u16 },

    #[error("Rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("{provider} server error {status}: {body}")]
    ProviderServerError {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} rejected the request ({status}): {body}")]
    ProviderRequestRejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Could not reach {provider}: {message}")]
    ProviderUnreachable { provider: String, message: String },

    #[error("Malformed response from {provider}: {message}")]
    ProviderMalformedResponse { provider: String, message: String },

    #[error("Candidate failed validation: {}", reasons.join("; "))]
    ValidationFailed { reasons: Vec<String> },

    #[error("Generation failed after {attempts} attempt(s): {last_reason}")]
    GenerationFailed { attempts: u32, last_reason: String },

    #[error("Failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run timed out after {0:?}")]
    RunTimedOut(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WrightError {
    /// Create a malformed response error.
    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderMalformedResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unreachable provider error.
    pub fn unreachable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnreachable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt may succeed where this one failed.
    ///
    /// Provider and validation failures are retried. Authentication,
    /// credential, input and filesystem failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ProviderServerError { .. }
                | Self::ProviderRequestRejected { .. }
                | Self::ProviderUnreachable { .. }
                | Self::ProviderMalformedResponse { .. }
                | Self::ValidationFailed { .. }
        )
    }

    /// Process exit code for this error when it terminates a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InputNotFound(_)
            | Self::InputEmpty(_)
            | Self::InputTooLarge { .. }
            | Self::InputUnreadable { .. } => 4,
            Self::CredentialMissing(_) | Self::AuthFailed { .. } => 5,
            Self::BackupFailed { .. } | Self::WriteFailed { .. } => 6,
            Self::GenerationFailed { .. } | Self::ValidationFailed { .. } => 3,
            _ => 1,
        }
    }
}
