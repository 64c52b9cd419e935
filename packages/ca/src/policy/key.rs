//! Key strength policy

use crate::config::DEFAULT_MIN_MODULUS_BITS;
use crate::error::{CaError, ProviderError, RejectReason};
use crate::provider::{CryptoProvider, ProviderAdapter};
use crate::types::{Csr, PublicKey};

/// Minimum RSA modulus length gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    min_modulus_bits: u32,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MODULUS_BITS)
    }
}

impl KeyPolicy {
    /// Policy requiring at least `min_modulus_bits`
    pub fn new(min_modulus_bits: u32) -> Self {
        Self { min_modulus_bits }
    }

    /// Configured minimum
    pub fn min_modulus_bits(&self) -> u32 {
        self.min_modulus_bits
    }

    /// An unknown length is never acceptable
    pub fn accepts_bits(&self, bits: Option<u32>) -> bool {
        bits.is_some_and(|bits| bits >= self.min_modulus_bits)
    }

    /// Reject a measured length below the minimum
    ///
    /// # Errors
    ///
    /// Returns `RejectReason::WeakKey` carrying both values.
    pub fn check_bits(&self, bits: u32) -> Result<(), RejectReason> {
        if bits >= self.min_modulus_bits {
            Ok(())
        } else {
            Err(RejectReason::WeakKey {
                bits,
                minimum: self.min_modulus_bits,
            })
        }
    }

    /// Collapsed check of a public key
    pub async fn is_acceptable<P: CryptoProvider>(
        &self,
        adapter: &ProviderAdapter<P>,
        key: &PublicKey,
    ) -> bool {
        self.accepts_bits(adapter.inspect_modulus_bits(key).await)
    }

    /// Measure a public key and apply the minimum
    ///
    /// # Errors
    ///
    /// A key the provider cannot measure as RSA is a policy violation;
    /// other provider errors keep their kind.
    pub async fn evaluate_key<P: CryptoProvider>(
        &self,
        adapter: &ProviderAdapter<P>,
        key: &PublicKey,
    ) -> Result<u32, CaError> {
        let bits = adapter
            .try_inspect_modulus_bits(key)
            .await
            .map_err(|e| match e {
                ProviderError::Unsupported(msg) => {
                    CaError::PolicyViolation(RejectReason::UnsupportedKeyAlgorithm(msg))
                }
                other => other.into(),
            })?;
        self.check_bits(bits)?;
        Ok(bits)
    }

    /// Collapsed check of the key inside a CSR; syntax is checked first
    pub async fn is_csr_key_acceptable<P: CryptoProvider>(
        &self,
        adapter: &ProviderAdapter<P>,
        csr: &Csr,
    ) -> bool {
        if !adapter.check_syntax(csr).await {
            return false;
        }
        let Some(key) = adapter.extract_public_key(csr).await else {
            return false;
        };
        self.is_acceptable(adapter, &key).await
    }

    /// Syntax check, key extraction and strength check, in that order
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; the key is never inspected
    /// for a request that failed the syntax check.
    pub async fn evaluate_csr_key<P: CryptoProvider>(
        &self,
        adapter: &ProviderAdapter<P>,
        csr: &Csr,
    ) -> Result<u32, CaError> {
        adapter.try_check_syntax(csr).await?;
        let key = adapter.try_extract_public_key(csr).await?;
        self.evaluate_key(adapter, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let policy = KeyPolicy::default();
        assert!(policy.accepts_bits(Some(2000)));
        assert!(policy.accepts_bits(Some(4096)));
        assert!(!policy.accepts_bits(Some(1999)));
        assert!(!policy.accepts_bits(None));
    }

    #[test]
    fn weak_key_reports_both_lengths() {
        let policy = KeyPolicy::new(3072);
        assert_eq!(
            policy.check_bits(2048),
            Err(RejectReason::WeakKey {
                bits: 2048,
                minimum: 3072
            })
        );
        assert!(policy.check_bits(3072).is_ok());
    }
}
