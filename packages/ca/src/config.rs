//! CA policy configuration
//!
//! Defaults reproduce the policy the CA has always enforced. Hardening
//! switches exist for the known gaps but stay off until explicitly enabled,
//! since turning them on changes which names can be issued.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CaError, Result};

/// Minimum RSA modulus length accepted for a subject key
pub const DEFAULT_MIN_MODULUS_BITS: u32 = 2000;

/// Names refused regardless of validation outcome
pub const DEFAULT_DENYLIST: &[&str] = &["google.com", "www.google.com"];

/// What the backend is asked to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Pass the requester's CSR through; the backend copies its contents
    Raw,
    /// Backend builds the certificate only from validated fields
    Reconstructed,
}

/// Configuration for policy evaluation and issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaConfig {
    /// Minimum accepted RSA modulus length in bits
    pub min_modulus_bits: u32,
    /// Exact names that may never be issued
    pub denylist: Vec<String>,
    /// Compare denylist entries ignoring ASCII case
    pub case_insensitive_denylist: bool,
    /// Refuse names containing a `*` label
    pub reject_wildcards: bool,
    /// Upper bound for each crypto provider call, in milliseconds
    pub provider_timeout_ms: u64,
    /// Upper bound for the backend signing call, in milliseconds
    pub backend_timeout_ms: u64,
    /// Issuance track handed to the backend
    pub issuance_track: String,
    /// Raw or reconstructed submission to the backend
    pub submission: SubmissionMode,
    /// Verify the CSR self-signature before issuing
    pub require_proof_of_possession: bool,
    /// Lifetime of issued certificates
    pub validity_days: u32,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            min_modulus_bits: DEFAULT_MIN_MODULUS_BITS,
            denylist: DEFAULT_DENYLIST.iter().map(|s| (*s).to_string()).collect(),
            case_insensitive_denylist: false,
            reject_wildcards: false,
            provider_timeout_ms: 10_000,
            backend_timeout_ms: 30_000,
            issuance_track: "chocolate".to_string(),
            submission: SubmissionMode::Reconstructed,
            require_proof_of_possession: true,
            validity_days: 90,
        }
    }
}

impl CaConfig {
    /// Parse a JSON document; absent fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `CaError::Config` if the JSON is malformed or the resulting
    /// configuration fails [`CaConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaError::Config(format!("Invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CaError::Config` if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            CaError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        tracing::debug!("Loaded CA configuration from {}", path.display());
        Self::from_json_str(&contents)
    }

    /// Reject settings that would disable a check or hang a request
    ///
    /// # Errors
    ///
    /// Returns `CaError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.min_modulus_bits == 0 {
            return Err(CaError::Config(
                "min_modulus_bits must be greater than zero".to_string(),
            ));
        }
        if self.provider_timeout_ms == 0 {
            return Err(CaError::Config(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.backend_timeout_ms == 0 {
            return Err(CaError::Config(
                "backend_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.issuance_track.trim().is_empty() {
            return Err(CaError::Config("issuance_track must not be empty".to_string()));
        }
        if self.validity_days == 0 {
            return Err(CaError::Config(
                "validity_days must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Provider call bound
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Backend call bound
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_established_policy() {
        let config = CaConfig::default();
        assert_eq!(config.min_modulus_bits, 2000);
        assert_eq!(config.denylist, vec!["google.com", "www.google.com"]);
        assert!(!config.case_insensitive_denylist);
        assert!(!config.reject_wildcards);
        assert_eq!(config.submission, SubmissionMode::Reconstructed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config =
            CaConfig::from_json_str(r#"{"min_modulus_bits": 3072, "submission": "raw"}"#)
                .expect("valid config");
        assert_eq!(config.min_modulus_bits, 3072);
        assert_eq!(config.submission, SubmissionMode::Raw);
        assert_eq!(config.issuance_track, "chocolate");
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let err = CaConfig::from_json_str(r#"{"provider_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, CaError::Config(msg) if msg.contains("provider_timeout_ms")));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            CaConfig::from_json_str("{not json"),
            Err(CaError::Config(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ca.json");
        tokio::fs::write(&path, r#"{"issuance_track": "vanilla"}"#)
            .await
            .expect("write config");

        let config = CaConfig::load(&path).await.expect("load");
        assert_eq!(config.issuance_track, "vanilla");

        let missing = CaConfig::load(dir.path().join("absent.json")).await;
        assert!(matches!(missing, Err(CaError::Config(_))));
    }
}
