//! Crypto provider capability
//!
//! Everything that touches PKCS#10 parsing or RSA arithmetic goes through a
//! [`CryptoProvider`]. Two implementations ship with the crate:
//!
//! - [`NativeProvider`]: in-process decoding with `x509-cert` and RSA math
//!   with `rsa`; the default.
//! - [`OpensslProvider`]: drives the `openssl` command line tool and scrapes
//!   its text output; kept for deployments that must match OpenSSL exactly.
//!
//! Callers normally hold a [`ProviderAdapter`], which bounds every call with a
//! timeout and offers the collapsed `bool`/`Option` view alongside the tagged
//! results.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{Csr, EncryptedBlob, PrivateKey, PublicKey, SignedBlob};

pub mod adapter;
pub mod native;
pub mod openssl;
pub mod text;

pub use adapter::ProviderAdapter;
pub use native::NativeProvider;
pub use openssl::OpensslProvider;

/// Identity claims carried by a CSR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectNames {
    /// The single subject common name; `None` when there are zero or several
    pub common_name: Option<String>,
    /// DNS entries of the subject alternative name extension
    pub dns_names: BTreeSet<String>,
    /// SAN entries of any other type, rendered for diagnostics
    pub unsupported: Vec<String>,
    /// Every CN value in the subject, in order, however many there are
    pub subject_common_names: Vec<String>,
}

impl SubjectNames {
    /// Every hostname the request asks for: the CN plus all DNS SANs
    pub fn names(&self) -> BTreeSet<String> {
        let mut names = self.dns_names.clone();
        if let Some(cn) = &self.common_name {
            names.insert(cn.clone());
        }
        names
    }

    /// True when the request names no host at all
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none() && self.dns_names.is_empty()
    }
}

/// Cryptographic operations the CA depends on.
///
/// Implementations report failures precisely; collapsing them into
/// `false`/`None` is the adapter's job.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Accept the bytes as a structurally valid PKCS#10 request
    async fn check_syntax(&self, csr: &Csr) -> Result<(), ProviderError>;

    /// Public key embedded in the request, PEM encoded
    async fn extract_public_key(&self, csr: &Csr) -> Result<PublicKey, ProviderError>;

    /// RSA modulus length of a PEM public key
    async fn inspect_modulus_bits(&self, key: &PublicKey) -> Result<u32, ProviderError>;

    /// Subject in the legacy `subject=/C=../CN=..` one-line form
    async fn extract_subject(&self, csr: &Csr) -> Result<String, ProviderError>;

    /// Common name and subject alternative names of the request
    async fn subject_names(&self, csr: &Csr) -> Result<SubjectNames, ProviderError>;

    /// Check the request's self-signature against its embedded key
    async fn verify_proof_of_possession(&self, csr: &Csr) -> Result<(), ProviderError>;

    /// RSA PKCS#1 v1.5 signature over raw data
    async fn sign(&self, key: &PrivateKey, data: &[u8]) -> Result<SignedBlob, ProviderError>;

    /// Recover the data a signature was made over
    async fn verify(&self, key: &PublicKey, signature: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// RSA PKCS#1 v1.5 encryption
    async fn encrypt(&self, key: &PublicKey, data: &[u8]) -> Result<EncryptedBlob, ProviderError>;

    /// RSA PKCS#1 v1.5 decryption
    async fn decrypt(&self, key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_merge_common_name_and_dns_entries() {
        let names = SubjectNames {
            common_name: Some("example.com".into()),
            dns_names: ["www.example.com".to_string(), "example.com".to_string()]
                .into_iter()
                .collect(),
            unsupported: vec![],
            subject_common_names: vec!["example.com".into()],
        };
        let all: Vec<_> = names.names().into_iter().collect();
        assert_eq!(all, vec!["example.com", "www.example.com"]);
        assert!(!names.is_empty());
        assert!(SubjectNames::default().is_empty());
    }
}
