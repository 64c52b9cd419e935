//! Error types for the request pipeline
//!
//! Each layer reports in its own terms: the crypto provider with
//! [`ProviderError`], the signing backend with [`BackendError`]. The
//! orchestrator folds both into [`CaError`], which keeps a malformed request,
//! a policy rejection and an infrastructure failure apart.

use std::time::Duration;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CaError>;

/// Why a well-formed request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// RSA modulus shorter than the configured minimum
    #[error("key too weak: {bits}-bit modulus, at least {minimum} bits required")]
    WeakKey {
        /// Measured modulus length
        bits: u32,
        /// Policy minimum
        minimum: u32,
    },

    /// The request carries a key this CA cannot measure
    #[error("unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    /// Name without a dot
    #[error("single-label name not eligible for issuance: {0}")]
    SingleLabelName(String),

    /// Name present in the denylist
    #[error("name denied by policy: {0}")]
    DeniedName(String),

    /// Wildcard name while wildcard rejection is enabled
    #[error("wildcard name not eligible for issuance: {0}")]
    WildcardName(String),

    /// Subject alternative name of a type other than DNS
    #[error("unsupported subject alternative name: {0}")]
    UnsupportedSubjectAltName(String),
}

impl RejectReason {
    /// Message that is safe to return to the requester.
    ///
    /// Denylist hits are reported as a generic ineligibility so the list
    /// itself cannot be probed.
    pub fn public_message(&self) -> String {
        match self {
            Self::DeniedName(_) => "name is not eligible for issuance".to_string(),
            other => other.to_string(),
        }
    }
}

/// Top-level error returned by policy evaluation and issuance
#[derive(Debug, Error)]
pub enum CaError {
    /// CSR syntax is invalid or required fields cannot be extracted
    #[error("malformed request: {0}")]
    MalformedInput(String),

    /// Request is well formed but violates CA policy
    #[error("policy violation: {0}")]
    PolicyViolation(RejectReason),

    /// Provider or backend could not complete an operation
    #[error("provider failure: {0}")]
    ProviderFailure(String),

    /// Backend ran but did not produce a certificate
    #[error("issuance failed: {0}")]
    IssuanceFailure(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl CaError {
    /// Only infrastructure failures may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderFailure(_))
    }

    /// Rejection reason, when this is a policy violation
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::PolicyViolation(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<RejectReason> for CaError {
    fn from(reason: RejectReason) -> Self {
        Self::PolicyViolation(reason)
    }
}

/// Failure reported by a crypto provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Input could not be decoded or did not verify
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Input is well formed but uses something the provider cannot handle
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The provider itself failed
    #[error("provider failed: {0}")]
    Failed(String),

    /// The call did not finish in time and was abandoned
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// Operation name
        operation: &'static str,
        /// Configured bound
        elapsed: Duration,
    },

    /// Staging or process I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for CaError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Malformed(msg) => Self::MalformedInput(msg),
            ProviderError::Unsupported(msg) => Self::MalformedInput(format!("unsupported: {msg}")),
            other @ (ProviderError::Failed(_)
            | ProviderError::Timeout { .. }
            | ProviderError::Io(_)) => Self::ProviderFailure(other.to_string()),
        }
    }
}

/// Failure reported by a CA backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend re-check refused the request
    #[error("backend rejected request: {0}")]
    Rejected(RejectReason),

    /// External signer exited unsuccessfully
    #[error("signer exited with status {0}")]
    Status(String),

    /// Signer reported success but wrote nothing
    #[error("signer produced no certificate")]
    EmptyOutput,

    /// In-process signing failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// Backend call did not finish in time
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    /// Staging or process I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for CaError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(reason) => Self::PolicyViolation(reason),
            other @ (BackendError::Timeout(_) | BackendError::Io(_)) => {
                Self::ProviderFailure(other.to_string())
            }
            other @ (BackendError::Status(_)
            | BackendError::EmptyOutput
            | BackendError::Signing(_)) => Self::IssuanceFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_onto_taxonomy() {
        let malformed: CaError = ProviderError::Malformed("bad der".into()).into();
        assert!(matches!(malformed, CaError::MalformedInput(_)));

        let timeout: CaError = ProviderError::Timeout {
            operation: "check_syntax",
            elapsed: Duration::from_millis(5),
        }
        .into();
        assert!(matches!(timeout, CaError::ProviderFailure(_)));
        assert!(timeout.is_retryable());
        assert!(!malformed.is_retryable());
    }

    #[test]
    fn backend_errors_map_onto_taxonomy() {
        let status: CaError = BackendError::Status("exit status: 2".into()).into();
        assert!(matches!(status, CaError::IssuanceFailure(_)));

        let timeout: CaError = BackendError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(timeout, CaError::ProviderFailure(_)));

        let rejected: CaError = BackendError::Rejected(RejectReason::WeakKey {
            bits: 1024,
            minimum: 2000,
        })
        .into();
        assert_eq!(
            rejected.reject_reason(),
            Some(&RejectReason::WeakKey {
                bits: 1024,
                minimum: 2000
            })
        );
    }

    #[test]
    fn denied_names_are_not_revealed_publicly() {
        let reason = RejectReason::DeniedName("google.com".into());
        assert!(!reason.public_message().contains("google.com"));
        assert!(reason.to_string().contains("google.com"));

        let single = RejectReason::SingleLabelName("localhost".into());
        assert!(single.public_message().contains("localhost"));
    }
}
