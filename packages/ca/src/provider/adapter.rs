//! Timeout-bounded access to a crypto provider
//!
//! Each call runs under `tokio::time::timeout`. An elapsed bound is reported
//! as [`ProviderError::Timeout`] and the provider future is dropped, which
//! cancels it (external processes are spawned with `kill_on_drop`).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{CryptoProvider, SubjectNames};
use crate::error::ProviderError;
use crate::types::{Csr, EncryptedBlob, PrivateKey, PublicKey, SignedBlob};

/// Default bound for a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Wraps a [`CryptoProvider`] with per-call timeouts
#[derive(Debug)]
pub struct ProviderAdapter<P> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P> Clone for ProviderAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            timeout: self.timeout,
        }
    }
}

impl<P: CryptoProvider> ProviderAdapter<P> {
    /// Adapter with the default timeout
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Set the per-call bound
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Per-call bound in effect
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "{} provider: {operation} exceeded {:?}",
                    self.provider.name(),
                    self.timeout
                );
                Err(ProviderError::Timeout {
                    operation,
                    elapsed: self.timeout,
                })
            }
        }
    }

    /// Tagged syntax check
    pub async fn try_check_syntax(&self, csr: &Csr) -> Result<(), ProviderError> {
        self.bounded("check_syntax", self.provider.check_syntax(csr))
            .await
    }

    /// Tagged public key extraction
    pub async fn try_extract_public_key(&self, csr: &Csr) -> Result<PublicKey, ProviderError> {
        self.bounded("extract_public_key", self.provider.extract_public_key(csr))
            .await
    }

    /// Tagged modulus inspection
    pub async fn try_inspect_modulus_bits(&self, key: &PublicKey) -> Result<u32, ProviderError> {
        self.bounded("inspect_modulus_bits", self.provider.inspect_modulus_bits(key))
            .await
    }

    /// Tagged subject extraction
    pub async fn try_extract_subject(&self, csr: &Csr) -> Result<String, ProviderError> {
        self.bounded("extract_subject", self.provider.extract_subject(csr))
            .await
    }

    /// Tagged name extraction
    pub async fn try_subject_names(&self, csr: &Csr) -> Result<SubjectNames, ProviderError> {
        self.bounded("subject_names", self.provider.subject_names(csr))
            .await
    }

    /// Tagged self-signature check
    pub async fn try_verify_proof_of_possession(&self, csr: &Csr) -> Result<(), ProviderError> {
        self.bounded(
            "verify_proof_of_possession",
            self.provider.verify_proof_of_possession(csr),
        )
        .await
    }

    /// Tagged signing
    pub async fn try_sign(
        &self,
        key: &PrivateKey,
        data: &[u8],
    ) -> Result<SignedBlob, ProviderError> {
        self.bounded("sign", self.provider.sign(key, data)).await
    }

    /// Tagged signature recovery
    pub async fn try_verify(
        &self,
        key: &PublicKey,
        signature: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        self.bounded("verify", self.provider.verify(key, signature))
            .await
    }

    /// Tagged encryption
    pub async fn try_encrypt(
        &self,
        key: &PublicKey,
        data: &[u8],
    ) -> Result<EncryptedBlob, ProviderError> {
        self.bounded("encrypt", self.provider.encrypt(key, data))
            .await
    }

    /// Tagged decryption
    pub async fn try_decrypt(
        &self,
        key: &PrivateKey,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        self.bounded("decrypt", self.provider.decrypt(key, data))
            .await
    }

    /// True iff the provider accepts the CSR as valid PKCS#10
    pub async fn check_syntax(&self, csr: &Csr) -> bool {
        collapse("check_syntax", self.try_check_syntax(csr).await).is_some()
    }

    /// Embedded public key, or `None` on any failure
    pub async fn extract_public_key(&self, csr: &Csr) -> Option<PublicKey> {
        collapse("extract_public_key", self.try_extract_public_key(csr).await)
    }

    /// Modulus length, or `None`; never a default value
    pub async fn inspect_modulus_bits(&self, key: &PublicKey) -> Option<u32> {
        collapse("inspect_modulus_bits", self.try_inspect_modulus_bits(key).await)
    }

    /// Raw subject line, or `None`
    pub async fn extract_subject(&self, csr: &Csr) -> Option<String> {
        collapse("extract_subject", self.try_extract_subject(csr).await)
    }

    /// Signature over `data`, or `None`
    pub async fn sign(&self, key: &PrivateKey, data: &[u8]) -> Option<SignedBlob> {
        collapse("sign", self.try_sign(key, data).await)
    }

    /// Recovered data iff the signature is valid under `key`
    pub async fn verify(&self, key: &PublicKey, signature: &[u8]) -> Option<Vec<u8>> {
        collapse("verify", self.try_verify(key, signature).await)
    }

    /// Ciphertext, or `None`
    pub async fn encrypt(&self, key: &PublicKey, data: &[u8]) -> Option<EncryptedBlob> {
        collapse("encrypt", self.try_encrypt(key, data).await)
    }

    /// Plaintext, or `None`
    pub async fn decrypt(&self, key: &PrivateKey, data: &[u8]) -> Option<Vec<u8>> {
        collapse("decrypt", self.try_decrypt(key, data).await)
    }
}

fn collapse<T>(operation: &str, result: Result<T, ProviderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{operation} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NativeProvider;

    #[tokio::test]
    async fn collapsed_view_hides_failure_kind() {
        let adapter = ProviderAdapter::new(NativeProvider::new());
        let garbage = Csr::from("definitely not a certificate request");

        assert!(!adapter.check_syntax(&garbage).await);
        assert!(adapter.extract_public_key(&garbage).await.is_none());
        assert!(adapter.extract_subject(&garbage).await.is_none());
        assert!(matches!(
            adapter.try_check_syntax(&garbage).await,
            Err(ProviderError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn modulus_of_unparseable_key_is_none() {
        let adapter = ProviderAdapter::new(NativeProvider::new());
        let key = PublicKey::from("-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n");
        assert_eq!(adapter.inspect_modulus_bits(&key).await, None);
    }

    #[test]
    fn timeout_is_configurable() {
        let adapter =
            ProviderAdapter::new(NativeProvider::new()).with_timeout(Duration::from_millis(250));
        assert_eq!(adapter.timeout(), Duration::from_millis(250));
        assert_eq!(adapter.clone().timeout(), Duration::from_millis(250));
    }
}
