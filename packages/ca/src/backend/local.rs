//! In-process certificate authority
//!
//! Signs validated requests with `rcgen`. The subject key is measured again
//! here before signing, so a backend handed an unvalidated request still
//! refuses weak keys.

use std::fmt;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
    SerialNumber,
};
use rcgen::string::Ia5String;

use super::{CaBackend, IssuanceRequest};
use crate::config::{SubmissionMode, DEFAULT_MIN_MODULUS_BITS};
use crate::error::{BackendError, ProviderError, RejectReason};
use crate::provider::native::{csr, key_size, pem_encode};
use crate::types::Certificate;

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// A CA certificate and key that sign in process
pub struct LocalAuthority {
    issuer: Issuer<'static, KeyPair>,
    certificate_pem: String,
    min_modulus_bits: u32,
}

impl fmt::Debug for LocalAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAuthority")
            .field("min_modulus_bits", &self.min_modulus_bits)
            .finish_non_exhaustive()
    }
}

impl LocalAuthority {
    /// Create a fresh self-signed CA named `common_name`
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Signing` if key generation or self-signing
    /// fails.
    pub fn generate(common_name: &str) -> Result<Self, BackendError> {
        let key_pair = KeyPair::generate()
            .map_err(|e| BackendError::Signing(format!("CA key generation failed: {e}")))?;

        let mut params = CertificateParams::default();
        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::CommonName, common_name);
        params.distinguished_name = distinguished_name;
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        setup_validity_period(&mut params, 10 * 365);

        let certificate = params
            .self_signed(&key_pair)
            .map_err(|e| BackendError::Signing(format!("CA self-signing failed: {e}")))?;
        let certificate_pem = certificate.pem();

        tracing::info!("Generated local CA '{common_name}'");
        Ok(Self {
            issuer: Issuer::new(params, key_pair),
            certificate_pem,
            min_modulus_bits: DEFAULT_MIN_MODULUS_BITS,
        })
    }

    /// Load an existing CA certificate and private key
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Signing` if either PEM cannot be used.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> Result<Self, BackendError> {
        let key_pair = KeyPair::from_pem(private_key_pem)
            .map_err(|e| BackendError::Signing(format!("invalid CA key: {e}")))?;
        let issuer = Issuer::from_ca_cert_pem(certificate_pem, key_pair)
            .map_err(|e| BackendError::Signing(format!("invalid CA certificate: {e}")))?;
        Ok(Self {
            issuer,
            certificate_pem: certificate_pem.to_string(),
            min_modulus_bits: DEFAULT_MIN_MODULUS_BITS,
        })
    }

    /// Minimum subject key length enforced at signing time
    #[must_use]
    pub fn with_min_modulus_bits(mut self, bits: u32) -> Self {
        self.min_modulus_bits = bits;
        self
    }

    /// The CA certificate, PEM encoded
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Decode the request and re-measure its key
    fn recheck(&self, request: &IssuanceRequest) -> Result<String, BackendError> {
        let der = csr::request_der(request.csr.as_bytes())
            .map_err(|e| BackendError::Signing(e.to_string()))?;
        let decoded = csr::decode_csr(&der).map_err(|e| BackendError::Signing(e.to_string()))?;

        let bits = match key_size::modulus_bits_of_owned(&decoded.info.public_key) {
            Ok(bits) => bits,
            Err(ProviderError::Unsupported(msg)) => {
                return Err(BackendError::Rejected(
                    RejectReason::UnsupportedKeyAlgorithm(msg),
                ))
            }
            Err(e) => return Err(BackendError::Signing(e.to_string())),
        };
        if bits < self.min_modulus_bits {
            return Err(BackendError::Rejected(RejectReason::WeakKey {
                bits,
                minimum: self.min_modulus_bits,
            }));
        }

        Ok(pem_encode("CERTIFICATE REQUEST", &der))
    }

    fn sign(&self, request: &IssuanceRequest) -> Result<String, BackendError> {
        let normalized = self.recheck(request)?;
        let mut csr_params = CertificateSigningRequestParams::from_pem(&normalized)
            .map_err(|e| BackendError::Signing(format!("Failed to parse CSR: {e}")))?;

        if request.submission == SubmissionMode::Reconstructed {
            csr_params.params = reconstructed_params(request)?;
        }
        csr_params.params.serial_number = Some(random_serial());
        setup_validity_period(&mut csr_params.params, request.validity_days);

        let certificate = csr_params
            .signed_by(&self.issuer)
            .map_err(|e| BackendError::Signing(format!("Failed to sign certificate: {e}")))?;
        Ok(certificate.pem())
    }
}

/// Parameters holding only the validated names
fn reconstructed_params(request: &IssuanceRequest) -> Result<CertificateParams, BackendError> {
    let mut params = CertificateParams::default();

    let mut distinguished_name = DistinguishedName::new();
    if let Some(name) = request.primary_name() {
        distinguished_name.push(DnType::CommonName, name);
    }
    params.distinguished_name = distinguished_name;

    let mut san_entries = Vec::new();
    for name in request.names() {
        let ia5: Ia5String = name
            .clone()
            .try_into()
            .map_err(|e| BackendError::Signing(format!("invalid DNS name {name}: {e}")))?;
        san_entries.push(SanType::DnsName(ia5));
    }
    params.subject_alt_names = san_entries;

    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.use_authority_key_identifier_extension = true;
    Ok(params)
}

/// 128-bit positive serial number
fn random_serial() -> SerialNumber {
    let mut bytes = rand::random::<[u8; 16]>();
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    SerialNumber::from(bytes.to_vec())
}

fn setup_validity_period(params: &mut CertificateParams, valid_for_days: u32) {
    let now = SystemTime::now();
    params.not_before = now.into();
    params.not_after =
        (now + Duration::from_secs(u64::from(valid_for_days) * SECONDS_PER_DAY)).into();
}

#[async_trait]
impl CaBackend for LocalAuthority {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn issue(&self, request: &IssuanceRequest) -> Result<Certificate, BackendError> {
        let pem = self.sign(request)?;
        tracing::debug!(
            "local CA signed {} name(s) on track {}",
            request.names().len(),
            request.track
        );
        Ok(Certificate::from(pem.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_are_positive_and_distinct() {
        let a = random_serial();
        let b = random_serial();
        assert_ne!(a, b);
        let bytes = a.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0] & 0x80, 0);
    }

    #[test]
    fn generated_authority_exports_its_certificate() {
        let authority = LocalAuthority::generate("Test CA").expect("generate");
        assert!(authority
            .certificate_pem()
            .starts_with("-----BEGIN CERTIFICATE-----"));

        let reloaded = LocalAuthority::from_pem(authority.certificate_pem(), "not a key");
        assert!(matches!(reloaded, Err(BackendError::Signing(_))));
    }
}
