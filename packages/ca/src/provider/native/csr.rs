//! PKCS#10 request decoding and inspection

use const_oid::db::rfc5912::{
    RSA_ENCRYPTION, SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION,
    SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use der::{Any, Decode, Encode};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, ExtensionReq};

use super::pem_encode;
use crate::error::ProviderError;
use crate::provider::SubjectNames;

const OID_CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// PEM labels a request may be armoured with
const CSR_PEM_LABELS: &[&str] = &["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// DER of a request given as PEM or DER; the structure is not checked
pub(crate) fn request_der(bytes: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &bytes[start..]);
    if trimmed.is_empty() {
        return Err(ProviderError::Malformed("empty request".to_string()));
    }
    if !trimmed.starts_with(b"-----BEGIN ") {
        return Ok(bytes.to_vec());
    }

    let block = pem::parse(trimmed)
        .map_err(|e| ProviderError::Malformed(format!("invalid PEM: {e}")))?;
    if !CSR_PEM_LABELS.contains(&block.tag()) {
        return Err(ProviderError::Malformed(format!(
            "unexpected PEM label: {}",
            block.tag()
        )));
    }
    Ok(block.into_contents())
}

/// Decode PEM or DER bytes into a certificate request
pub(crate) fn decode_csr(bytes: &[u8]) -> Result<CertReq, ProviderError> {
    CertReq::from_der(&request_der(bytes)?)
        .map_err(|e| ProviderError::Malformed(format!("invalid PKCS#10 structure: {e}")))
}

/// Subject public key info of the request as a `PUBLIC KEY` PEM block
pub(crate) fn public_key_pem(request: &CertReq) -> Result<String, ProviderError> {
    let der = request
        .info
        .public_key
        .to_der()
        .map_err(|e| ProviderError::Malformed(format!("unencodable public key: {e}")))?;
    Ok(pem_encode("PUBLIC KEY", &der))
}

fn attribute_short_name(oid: &ObjectIdentifier) -> String {
    match oid.to_string().as_str() {
        "2.5.4.3" => "CN".to_string(),
        "2.5.4.6" => "C".to_string(),
        "2.5.4.7" => "L".to_string(),
        "2.5.4.8" => "ST".to_string(),
        "2.5.4.10" => "O".to_string(),
        "2.5.4.11" => "OU".to_string(),
        "2.5.4.5" => "serialNumber".to_string(),
        "1.2.840.113549.1.9.1" => "emailAddress".to_string(),
        other => other.to_string(),
    }
}

/// Text of a directory string, if it is one of the common string types
fn attribute_text(value: &Any) -> Option<String> {
    if let Ok(s) = Utf8StringRef::try_from(value) {
        Some(s.to_string())
    } else if let Ok(s) = PrintableStringRef::try_from(value) {
        Some(s.to_string())
    } else if let Ok(s) = Ia5StringRef::try_from(value) {
        Some(s.to_string())
    } else {
        None
    }
}

/// Render a subject in the legacy one-line form, `subject=/C=US/CN=host`.
///
/// Multi-valued RDNs join their members with `+`; values that are not
/// strings are shown as `#` followed by the hex of their DER.
pub(crate) fn subject_line(subject: &Name) -> String {
    let mut line = String::from("subject=");
    for rdn in &subject.0 {
        let members: Vec<String> = rdn
            .0
            .iter()
            .map(|atv| {
                let value = attribute_text(&atv.value).unwrap_or_else(|| {
                    format!("#{}", hex::encode(atv.value.to_der().unwrap_or_default()))
                });
                format!("{}={value}", attribute_short_name(&atv.oid))
            })
            .collect();
        line.push('/');
        line.push_str(&members.join("+"));
    }
    line
}

/// Every common name attribute in the subject
fn common_names(subject: &Name) -> Result<Vec<String>, ProviderError> {
    subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|atv| atv.oid == OID_CN)
        .map(|atv| {
            attribute_text(&atv.value).ok_or_else(|| {
                ProviderError::Malformed("common name is not a directory string".to_string())
            })
        })
        .collect()
}

/// Subject alternative names requested through the extensionRequest attribute
fn requested_alt_names(request: &CertReq) -> Result<Vec<GeneralName>, ProviderError> {
    let mut names = Vec::new();
    for attribute in request.info.attributes.iter() {
        if attribute.oid != ExtensionReq::OID {
            continue;
        }
        for value in attribute.values.iter() {
            let encoded = value
                .to_der()
                .map_err(|e| ProviderError::Malformed(format!("extension request: {e}")))?;
            let extensions = ExtensionReq::from_der(&encoded)
                .map_err(|e| ProviderError::Malformed(format!("extension request: {e}")))?;
            for extension in extensions.0 {
                if extension.extn_id != SubjectAltName::OID {
                    continue;
                }
                let san = SubjectAltName::from_der(extension.extn_value.as_bytes()).map_err(
                    |e| ProviderError::Malformed(format!("subject alternative name: {e}")),
                )?;
                names.extend(san.0);
            }
        }
    }
    Ok(names)
}

fn describe_general_name(name: &GeneralName) -> String {
    match name {
        GeneralName::Rfc822Name(email) => format!("email:{email}"),
        GeneralName::UniformResourceIdentifier(uri) => format!("URI:{uri}"),
        GeneralName::IpAddress(ip) => format!("IP:{}", hex::encode(ip.as_bytes())),
        GeneralName::DirectoryName(dn) => format!("DirName:{dn}"),
        GeneralName::RegisteredId(oid) => format!("RID:{oid}"),
        GeneralName::OtherName(other) => format!("othername:{}", other.type_id),
        GeneralName::EdiPartyName(_) => "EdiPartyName".to_string(),
        GeneralName::DnsName(dns) => format!("DNS:{dns}"),
    }
}

/// Names the request claims: the single CN plus SAN entries split by type
pub(crate) fn subject_names(request: &CertReq) -> Result<SubjectNames, ProviderError> {
    let mut names = SubjectNames::default();

    let cns = common_names(&request.info.subject)?;
    if cns.len() == 1 {
        names.common_name = cns.first().cloned();
    } else if cns.len() > 1 {
        tracing::debug!("request carries {} common names", cns.len());
    }
    names.subject_common_names = cns;

    for general_name in requested_alt_names(request)? {
        match general_name {
            GeneralName::DnsName(dns) => {
                names.dns_names.insert(dns.to_string());
            }
            other => names.unsupported.push(describe_general_name(&other)),
        }
    }
    Ok(names)
}

fn verify_with<D>(
    key: RsaPublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), ProviderError>
where
    D: sha2::Digest + AssociatedOid,
{
    VerifyingKey::<D>::new(key)
        .verify(message, signature)
        .map_err(|_| ProviderError::Malformed("request signature does not verify".to_string()))
}

/// Check the request is signed by the private half of its own key
pub(crate) fn verify_self_signature(request: &CertReq) -> Result<(), ProviderError> {
    let spki = &request.info.public_key;
    if spki.algorithm.oid != RSA_ENCRYPTION {
        return Err(ProviderError::Unsupported(format!(
            "key algorithm {}",
            super::key_size::algorithm_name(&spki.algorithm.oid)
        )));
    }

    let spki_der = spki
        .to_der()
        .map_err(|e| ProviderError::Malformed(format!("unencodable public key: {e}")))?;
    let key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| ProviderError::Malformed(format!("invalid RSA public key: {e}")))?;

    let message = request
        .info
        .to_der()
        .map_err(|e| ProviderError::Malformed(format!("unencodable request info: {e}")))?;
    let raw_signature = request
        .signature
        .as_bytes()
        .ok_or_else(|| ProviderError::Malformed("signature has unused bits".to_string()))?;
    let signature = Signature::try_from(raw_signature)
        .map_err(|e| ProviderError::Malformed(format!("invalid signature: {e}")))?;

    let algorithm = request.algorithm.oid;
    if algorithm == SHA_256_WITH_RSA_ENCRYPTION {
        verify_with::<Sha256>(key, &message, &signature)
    } else if algorithm == SHA_384_WITH_RSA_ENCRYPTION {
        verify_with::<Sha384>(key, &message, &signature)
    } else if algorithm == SHA_512_WITH_RSA_ENCRYPTION {
        verify_with::<Sha512>(key, &message, &signature)
    } else {
        Err(ProviderError::Unsupported(format!(
            "signature algorithm {algorithm}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_garbage_input_is_malformed() {
        assert!(matches!(decode_csr(b""), Err(ProviderError::Malformed(_))));
        assert!(matches!(decode_csr(b"  \n"), Err(ProviderError::Malformed(_))));
        assert!(matches!(
            decode_csr(b"not a request"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_pem_label_is_malformed() {
        let block = pem_encode("CERTIFICATE", &[0x30, 0x00]);
        let err = decode_csr(block.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("CERTIFICATE"));
    }

    #[test]
    fn short_names_cover_common_attributes() {
        assert_eq!(attribute_short_name(&OID_CN), "CN");
        let unknown = ObjectIdentifier::new_unwrap("1.2.3.4");
        assert_eq!(attribute_short_name(&unknown), "1.2.3.4");
    }
}
