//! Error taxonomy for the summarisation pipeline
//!
//! Every error inside one cycle is caught at the orchestrator boundary and
//! translated into a cycle outcome plus a log line; nothing propagates to
//! presentation layers as a raw error. The single-message path is the one
//! exception and forwards its error to the requester.

use thiserror::Error;

/// Errors produced by the pipeline stages
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The user declined the interactive authorization prompt
    #[error("authorization prompt was cancelled by the user")]
    AuthCancelled,

    /// Silent token acquisition found no cached credential
    #[error("no cached credential available for silent acquisition")]
    NoToken,

    /// The mail provider answered with a non-success status.
    ///
    /// A 401 here means the token was already invalidated by the fetcher
    /// before this error surfaced.
    #[error("mail provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    /// The summarisation backend answered with a non-success status
    #[error("summarisation backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend response length did not match the request batch.
    ///
    /// The merge is positional, so a mismatched response is rejected
    /// outright rather than merged into corrupt results.
    #[error("backend returned {actual} summaries for a batch of {expected}")]
    BatchMismatch { expected: usize, actual: usize },

    /// Transport-level failure before any HTTP status was received
    #[error("network error: {0}")]
    Network(String),

    /// Failure in one of the injected state stores
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PipelineError {
    /// Build a provider error from a ureq failure, extracting the HTTP
    /// status when one was received.
    pub(crate) fn from_provider(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Provider {
                status,
                message: "request rejected by mail provider".into(),
            },
            other => Self::Network(other.to_string()),
        }
    }

    /// Build a backend error from a ureq failure
    pub(crate) fn from_backend(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Self::Backend {
                status,
                message: "request rejected by summarisation backend".into(),
            },
            other => Self::Network(other.to_string()),
        }
    }

    /// Whether this error invalidates currently displayed summaries.
    ///
    /// Auth-stage outcomes (cancelled prompt, silent miss) leave the
    /// session untouched; everything else clears it.
    pub fn clears_session(&self) -> bool {
        !matches!(self, Self::AuthCancelled | Self::NoToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_outcomes_preserve_session() {
        assert!(!PipelineError::AuthCancelled.clears_session());
        assert!(!PipelineError::NoToken.clears_session());
    }

    #[test]
    fn test_stage_failures_clear_session() {
        let err = PipelineError::Provider {
            status: 500,
            message: "boom".into(),
        };
        assert!(err.clears_session());
        assert!(
            PipelineError::BatchMismatch {
                expected: 3,
                actual: 2
            }
            .clears_session()
        );
    }
}
