//! Client-side helpers: RSA key generation and PKCS#10 request construction
//!
//! The CA never needs these to validate or issue, but a requester does, and
//! so does anything that exercises the pipeline end to end.

use const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION;
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{
    Any, BitString, Ia5String, OctetString, PrintableStringRef, SetOfVec, Utf8StringRef,
};
use der::{Decode, Encode};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::attr::{Attribute, AttributeTypeAndValue};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};
use x509_cert::request::{CertReq, CertReqInfo, ExtensionReq, Version};

use crate::error::{CaError, ProviderError, Result};
use crate::provider::native::{pem_encode, rsa_ops};
use crate::types::{Csr, PrivateKey, PublicKey};

const OID_CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_C: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_O: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");

/// Generate an RSA private key, PKCS#8 PEM encoded
///
/// # Errors
///
/// Returns `ProviderError::Failed` if generation or encoding fails.
pub fn generate_rsa_key(bits: usize) -> std::result::Result<PrivateKey, ProviderError> {
    let key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| ProviderError::Failed(format!("RSA key generation failed: {e}")))?;
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| ProviderError::Failed(format!("private key encoding failed: {e}")))?;
    Ok(PrivateKey::new(pem.as_bytes().to_vec()))
}

/// Public half of a private key, as a `PUBLIC KEY` PEM block
///
/// # Errors
///
/// Returns `ProviderError::Malformed` if the private key cannot be parsed.
pub fn public_key_of(key: &PrivateKey) -> std::result::Result<PublicKey, ProviderError> {
    let private_key = rsa_ops::parse_private_key(key)?;
    let pem = private_key
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| ProviderError::Failed(format!("public key encoding failed: {e}")))?;
    Ok(PublicKey::from(pem.as_str()))
}

fn encoding_error(e: der::Error) -> CaError {
    CaError::MalformedInput(format!("cannot encode request: {e}"))
}

#[derive(Debug, Clone)]
enum NameValue {
    Utf8(String),
    Printable(String),
}

/// Builds a PKCS#10 request signed with SHA-256 and RSA
#[derive(Debug, Clone, Default)]
pub struct CsrBuilder {
    subject: Vec<(ObjectIdentifier, NameValue)>,
    alt_names: Vec<GeneralNameSpec>,
}

#[derive(Debug, Clone)]
enum GeneralNameSpec {
    Dns(String),
    Email(String),
}

impl CsrBuilder {
    /// Empty subject, no extensions
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a common name; calling twice yields a subject with two CNs
    #[must_use]
    pub fn common_name(mut self, cn: impl Into<String>) -> Self {
        self.subject.push((OID_CN, NameValue::Utf8(cn.into())));
        self
    }

    /// Append an organization name
    #[must_use]
    pub fn organization(mut self, o: impl Into<String>) -> Self {
        self.subject.push((OID_O, NameValue::Utf8(o.into())));
        self
    }

    /// Append a two-letter country code
    #[must_use]
    pub fn country(mut self, c: impl Into<String>) -> Self {
        self.subject.push((OID_C, NameValue::Printable(c.into())));
        self
    }

    /// Append any subject attribute as a UTF8String
    #[must_use]
    pub fn attribute(mut self, oid: ObjectIdentifier, value: impl Into<String>) -> Self {
        self.subject.push((oid, NameValue::Utf8(value.into())));
        self
    }

    /// Request a DNS subject alternative name
    #[must_use]
    pub fn dns_name(mut self, name: impl Into<String>) -> Self {
        self.alt_names.push(GeneralNameSpec::Dns(name.into()));
        self
    }

    /// Request an email subject alternative name
    #[must_use]
    pub fn email(mut self, address: impl Into<String>) -> Self {
        self.alt_names.push(GeneralNameSpec::Email(address.into()));
        self
    }

    fn subject(&self) -> Result<RdnSequence> {
        let mut rdns = Vec::with_capacity(self.subject.len());
        for (oid, value) in &self.subject {
            let value = match value {
                NameValue::Utf8(s) => {
                    Any::encode_from(&Utf8StringRef::new(s).map_err(encoding_error)?)
                }
                NameValue::Printable(s) => {
                    Any::encode_from(&PrintableStringRef::new(s).map_err(encoding_error)?)
                }
            }
            .map_err(encoding_error)?;
            let atv = AttributeTypeAndValue { oid: *oid, value };
            let set = SetOfVec::try_from(vec![atv]).map_err(encoding_error)?;
            rdns.push(RelativeDistinguishedName(set));
        }
        Ok(RdnSequence(rdns))
    }

    fn attributes(&self) -> Result<SetOfVec<Attribute>> {
        if self.alt_names.is_empty() {
            return Ok(SetOfVec::new());
        }

        let mut general_names = Vec::with_capacity(self.alt_names.len());
        for spec in &self.alt_names {
            general_names.push(match spec {
                GeneralNameSpec::Dns(name) => {
                    GeneralName::DnsName(Ia5String::new(name).map_err(encoding_error)?)
                }
                GeneralNameSpec::Email(address) => {
                    GeneralName::Rfc822Name(Ia5String::new(address).map_err(encoding_error)?)
                }
            });
        }
        let san = SubjectAltName(general_names)
            .to_der()
            .map_err(encoding_error)?;
        let extension = Extension {
            extn_id: SubjectAltName::OID,
            critical: false,
            extn_value: OctetString::new(san).map_err(encoding_error)?,
        };
        let request = Any::encode_from(&ExtensionReq(vec![extension])).map_err(encoding_error)?;
        let attribute = Attribute {
            oid: ExtensionReq::OID,
            values: SetOfVec::try_from(vec![request]).map_err(encoding_error)?,
        };
        SetOfVec::try_from(vec![attribute]).map_err(encoding_error)
    }

    /// Sign the request with `key` and return it PEM encoded
    ///
    /// # Errors
    ///
    /// Returns `CaError::MalformedInput` if the key cannot be parsed or a
    /// field cannot be encoded.
    pub fn build(&self, key: &PrivateKey) -> Result<Csr> {
        let private_key = rsa_ops::parse_private_key(key)?;
        let spki_der = private_key
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| CaError::MalformedInput(format!("cannot encode public key: {e}")))?;
        let public_key =
            SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).map_err(encoding_error)?;

        let info = CertReqInfo {
            version: Version::V1,
            subject: self.subject()?,
            public_key,
            attributes: self.attributes()?,
        };
        let message = info.to_der().map_err(encoding_error)?;
        let signature = SigningKey::<Sha256>::new(private_key).sign(&message).to_bytes();

        let request = CertReq {
            info,
            algorithm: AlgorithmIdentifierOwned {
                oid: SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(Any::null()),
            },
            signature: BitString::from_bytes(&signature).map_err(encoding_error)?,
        };
        let der = request.to_der().map_err(encoding_error)?;
        Ok(Csr::from(pem_encode("CERTIFICATE REQUEST", &der).as_str()))
    }
}
