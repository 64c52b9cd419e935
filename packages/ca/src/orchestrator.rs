//! Request validation and issuance pipeline
//!
//! `validate` runs every check in a fixed order: syntax, identity, key
//! strength, proof of possession, then the name policy on every name. Key
//! material and names are never looked at before the syntax check has
//! passed. Every name, including each subject CN when there are several, must
//! be printable ASCII and pass the name policy. `issue` calls the backend at
//! most once per invocation.

use std::sync::Arc;

use crate::backend::{CaBackend, IssuanceRequest};
use crate::config::CaConfig;
use crate::error::{BackendError, CaError, RejectReason, Result};
use crate::inspector::CsrInspector;
use crate::policy::{KeyPolicy, NamePolicy, PolicyDecision};
use crate::provider::{CryptoProvider, ProviderAdapter};
use crate::types::{Certificate, Csr};

struct Inner<P, B> {
    adapter: ProviderAdapter<P>,
    backend: B,
    key_policy: KeyPolicy,
    name_policy: NamePolicy,
    config: CaConfig,
}

/// Validates requests and drives issuance
pub struct IssuanceOrchestrator<P, B> {
    inner: Arc<Inner<P, B>>,
}

impl<P, B> Clone for IssuanceOrchestrator<P, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, B> std::fmt::Debug for IssuanceOrchestrator<P, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceOrchestrator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Names become IA5String entries in the certificate
fn ensure_printable_ascii(name: &str) -> Result<()> {
    if name.bytes().all(|b| b.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(CaError::MalformedInput(format!(
            "name {name:?} is not a printable ASCII hostname"
        )))
    }
}

impl<P: CryptoProvider, B: CaBackend> IssuanceOrchestrator<P, B> {
    /// Build a pipeline from a provider, a backend and a configuration
    ///
    /// # Errors
    ///
    /// Returns `CaError::Config` if the configuration is invalid.
    pub fn new(provider: P, backend: B, config: CaConfig) -> Result<Self> {
        config.validate()?;
        let adapter = ProviderAdapter::new(provider).with_timeout(config.provider_timeout());
        tracing::debug!(
            "Issuance pipeline ready: provider={}, backend={}, track={}",
            adapter.provider().name(),
            backend.name(),
            config.issuance_track
        );
        Ok(Self {
            inner: Arc::new(Inner {
                adapter,
                backend,
                key_policy: KeyPolicy::new(config.min_modulus_bits),
                name_policy: NamePolicy::from_config(&config),
                config,
            }),
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &CaConfig {
        &self.inner.config
    }

    /// The timeout-bounded provider
    pub fn provider(&self) -> &ProviderAdapter<P> {
        &self.inner.adapter
    }

    /// Collapsed key strength check of a request
    pub async fn is_csr_key_acceptable(&self, csr: &Csr) -> bool {
        self.inner
            .key_policy
            .is_csr_key_acceptable(&self.inner.adapter, csr)
            .await
    }

    /// Run every policy check without issuing
    ///
    /// # Errors
    ///
    /// `MalformedInput` for requests that do not parse or name nothing,
    /// `PolicyViolation` for refused keys and names, `ProviderFailure` when
    /// the provider failed or timed out.
    pub async fn validate(&self, csr: &Csr) -> Result<IssuanceRequest> {
        let inner = &self.inner;
        let id = csr.fingerprint();

        inner.adapter.try_check_syntax(csr).await?;
        tracing::debug!("[{id}] syntax ok");

        let names = CsrInspector::new(&inner.adapter).subject_names(csr).await?;
        if let Some(entry) = names.unsupported.first() {
            return Err(RejectReason::UnsupportedSubjectAltName(entry.clone()).into());
        }
        if names.is_empty() {
            return Err(CaError::MalformedInput(
                "request names no host".to_string(),
            ));
        }

        let modulus_bits = inner
            .key_policy
            .evaluate_csr_key(&inner.adapter, csr)
            .await?;
        tracing::debug!("[{id}] key ok ({modulus_bits} bits)");

        if inner.config.require_proof_of_possession {
            inner.adapter.try_verify_proof_of_possession(csr).await?;
        }

        // Every subject CN, including each of several
        for name in names.names().iter().chain(&names.subject_common_names) {
            ensure_printable_ascii(name)?;
            inner.name_policy.evaluate(name)?;
        }

        Ok(IssuanceRequest {
            csr: csr.clone(),
            track: inner.config.issuance_track.clone(),
            submission: inner.config.submission,
            common_name: names.common_name,
            dns_names: names.dns_names,
            modulus_bits,
            validity_days: inner.config.validity_days,
        })
    }

    /// Tri-state view of [`validate`](Self::validate)
    pub async fn evaluate(&self, csr: &Csr) -> PolicyDecision {
        PolicyDecision::from_result(self.validate(csr).await)
    }

    /// Validate and, if everything passes, issue exactly once
    ///
    /// # Errors
    ///
    /// Any validation error, or the backend failure folded into `CaError`.
    /// No certificate is returned unless the backend succeeded with
    /// non-empty output.
    pub async fn issue(&self, csr: &Csr) -> Result<Certificate> {
        let id = csr.fingerprint();
        let request = match self.validate(csr).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("[{id}] request refused: {e}");
                return Err(e);
            }
        };

        let timeout = self.inner.config.backend_timeout();
        let certificate =
            match tokio::time::timeout(timeout, self.inner.backend.issue(&request)).await {
                Ok(Ok(certificate)) => certificate,
                Ok(Err(e)) => {
                    tracing::warn!("[{id}] {} backend failed: {e}", self.inner.backend.name());
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::warn!("[{id}] backend timed out after {timeout:?}");
                    return Err(BackendError::Timeout(timeout).into());
                }
            };

        if certificate.is_empty() {
            return Err(CaError::IssuanceFailure(
                "backend returned an empty certificate".to_string(),
            ));
        }
        tracing::info!(
            "[{id}] issued certificate for {} on track {}",
            request.primary_name().unwrap_or_default(),
            request.track
        );
        Ok(certificate)
    }
}
