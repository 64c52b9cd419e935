//! CA signing backends
//!
//! A backend turns an already validated request into a certificate. Two are
//! provided: [`LocalAuthority`] signs in process with `rcgen`, and
//! [`ScriptBackend`] hands the request to an external signing program.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::config::SubmissionMode;
use crate::error::BackendError;
use crate::types::{Certificate, Csr};

pub mod local;
pub mod script;

pub use local::LocalAuthority;
pub use script::ScriptBackend;

/// A request that passed every policy check
#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    /// The requester's CSR as received
    pub csr: Csr,
    /// Named issuance track, e.g. `chocolate`
    pub track: String,
    /// Whether the backend may copy the CSR or must rebuild it
    pub submission: SubmissionMode,
    /// Validated common name, if the request had one
    pub common_name: Option<String>,
    /// Validated DNS subject alternative names
    pub dns_names: BTreeSet<String>,
    /// Measured modulus length of the subject key
    pub modulus_bits: u32,
    /// Requested certificate lifetime
    pub validity_days: u32,
}

impl IssuanceRequest {
    /// Every validated name, CN included
    pub fn names(&self) -> BTreeSet<String> {
        let mut names = self.dns_names.clone();
        if let Some(cn) = &self.common_name {
            names.insert(cn.clone());
        }
        names
    }

    /// Name to put in the subject: the CN, else the first DNS name
    pub fn primary_name(&self) -> Option<&str> {
        self.common_name
            .as_deref()
            .or_else(|| self.dns_names.iter().next().map(String::as_str))
    }
}

/// Produces certificates for validated requests.
///
/// Issuance is not idempotent: each call may produce a distinct certificate.
#[async_trait]
pub trait CaBackend: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Sign the request
    async fn issue(&self, request: &IssuanceRequest) -> Result<Certificate, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_name_prefers_common_name() {
        let mut request = IssuanceRequest {
            csr: Csr::from("csr"),
            track: "chocolate".into(),
            submission: SubmissionMode::Reconstructed,
            common_name: None,
            dns_names: ["b.example.com".to_string(), "a.example.com".to_string()]
                .into_iter()
                .collect(),
            modulus_bits: 2048,
            validity_days: 90,
        };
        assert_eq!(request.primary_name(), Some("a.example.com"));

        request.common_name = Some("example.com".into());
        assert_eq!(request.primary_name(), Some("example.com"));
        assert_eq!(request.names().len(), 3);
    }
}
