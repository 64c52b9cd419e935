//! In-process crypto provider
//!
//! PKCS#10 decoding uses `x509-cert`/`der`, key measurement walks the DER of
//! the `RSAPublicKey` directly and the RSA primitives come from `rsa`. Modular
//! exponentiation runs on the blocking pool so it never stalls the runtime.

use async_trait::async_trait;

use super::{CryptoProvider, SubjectNames};
use crate::error::ProviderError;
use crate::types::{Csr, EncryptedBlob, PrivateKey, PublicKey, SignedBlob};

pub(crate) mod csr;
pub(crate) mod key_size;
pub(crate) mod rsa_ops;

/// Provider backed by pure-Rust decoders and RSA arithmetic
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProvider;

impl NativeProvider {
    /// Create the provider
    pub fn new() -> Self {
        Self
    }
}

/// Run CPU-bound work on the blocking pool
async fn blocking<T, F>(operation: &'static str, work: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProviderError::Failed(format!("{operation} task failed: {e}")))?
}

/// PEM armour with LF line endings
pub(crate) fn pem_encode(tag: &str, der: &[u8]) -> String {
    pem::encode_config(
        &pem::Pem::new(tag, der.to_vec()),
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

#[async_trait]
impl CryptoProvider for NativeProvider {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn check_syntax(&self, csr: &Csr) -> Result<(), ProviderError> {
        csr::decode_csr(csr.as_bytes()).map(|_| ())
    }

    async fn extract_public_key(&self, csr: &Csr) -> Result<PublicKey, ProviderError> {
        let request = csr::decode_csr(csr.as_bytes())?;
        csr::public_key_pem(&request).map(PublicKey::from)
    }

    async fn inspect_modulus_bits(&self, key: &PublicKey) -> Result<u32, ProviderError> {
        key_size::modulus_bits_of_pem(key.as_bytes())
    }

    async fn extract_subject(&self, csr: &Csr) -> Result<String, ProviderError> {
        let request = csr::decode_csr(csr.as_bytes())?;
        Ok(csr::subject_line(&request.info.subject))
    }

    async fn subject_names(&self, csr: &Csr) -> Result<SubjectNames, ProviderError> {
        let request = csr::decode_csr(csr.as_bytes())?;
        csr::subject_names(&request)
    }

    async fn verify_proof_of_possession(&self, csr: &Csr) -> Result<(), ProviderError> {
        let bytes = csr.as_bytes().to_vec();
        blocking("verify_proof_of_possession", move || {
            let request = csr::decode_csr(&bytes)?;
            csr::verify_self_signature(&request)
        })
        .await
    }

    async fn sign(&self, key: &PrivateKey, data: &[u8]) -> Result<SignedBlob, ProviderError> {
        let key = key.clone();
        let data = data.to_vec();
        blocking("sign", move || rsa_ops::sign(&key, &data).map(SignedBlob::from)).await
    }

    async fn verify(&self, key: &PublicKey, signature: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let key = key.clone();
        let signature = signature.to_vec();
        blocking("verify", move || rsa_ops::recover(&key, &signature)).await
    }

    async fn encrypt(&self, key: &PublicKey, data: &[u8]) -> Result<EncryptedBlob, ProviderError> {
        let key = key.clone();
        let data = data.to_vec();
        blocking("encrypt", move || {
            rsa_ops::encrypt(&key, &data).map(EncryptedBlob::from)
        })
        .await
    }

    async fn decrypt(&self, key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let key = key.clone();
        let data = data.to_vec();
        blocking("decrypt", move || rsa_ops::decrypt(&key, &data)).await
    }
}
