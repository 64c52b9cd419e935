//! Tri-state outcome of a policy evaluation

use crate::error::CaError;

/// Result of evaluating a request against CA policy
#[derive(Debug)]
pub enum PolicyDecision {
    /// Every check passed
    Accept,
    /// The request is malformed or violates policy; retrying will not help
    Reject(CaError),
    /// A provider failed or timed out, so no decision could be reached
    Indeterminate(CaError),
}

impl PolicyDecision {
    /// Classify the outcome of a policy check
    pub fn from_result<T>(result: Result<T, CaError>) -> Self {
        match result {
            Ok(_) => Self::Accept,
            Err(e) if e.is_retryable() => Self::Indeterminate(e),
            Err(e) => Self::Reject(e),
        }
    }

    /// True for [`PolicyDecision::Accept`]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// The error behind a rejection or an indeterminate outcome
    pub fn error(&self) -> Option<&CaError> {
        match self {
            Self::Accept => None,
            Self::Reject(e) | Self::Indeterminate(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;

    #[test]
    fn errors_split_by_retryability() {
        assert!(PolicyDecision::from_result(Ok::<_, CaError>(())).is_accept());

        let malformed = PolicyDecision::from_result::<()>(Err(CaError::MalformedInput(
            "bad".into(),
        )));
        assert!(matches!(malformed, PolicyDecision::Reject(_)));

        let weak = PolicyDecision::from_result::<()>(Err(RejectReason::WeakKey {
            bits: 1024,
            minimum: 2000,
        }
        .into()));
        assert!(matches!(weak, PolicyDecision::Reject(CaError::PolicyViolation(_))));

        let failed =
            PolicyDecision::from_result::<()>(Err(CaError::ProviderFailure("timeout".into())));
        assert!(matches!(failed, PolicyDecision::Indeterminate(_)));
        assert!(failed.error().is_some());
    }
}
