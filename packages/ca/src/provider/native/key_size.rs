//! Public key measurement
//!
//! Walks the DER of an `RSAPublicKey` to the modulus and counts its
//! significant bits. Nothing is defaulted: a key that cannot be measured is
//! an error, never a zero.

use const_oid::db::rfc5912::{ID_DSA, ID_EC_PUBLIC_KEY, RSA_ENCRYPTION};
use const_oid::db::rfc8410::{ID_ED_25519, ID_ED_448, ID_X_25519, ID_X_448};
use const_oid::ObjectIdentifier;
use der::{Decode, Encode, Reader, SliceReader, Tag};
use spki::SubjectPublicKeyInfoRef;

use crate::error::ProviderError;

/// Human readable name of a public key algorithm
pub(crate) fn algorithm_name(oid: &ObjectIdentifier) -> String {
    if *oid == RSA_ENCRYPTION {
        "RSA".to_string()
    } else if *oid == ID_DSA {
        "DSA".to_string()
    } else if *oid == ID_EC_PUBLIC_KEY {
        "ECDSA".to_string()
    } else if *oid == ID_ED_25519 {
        "Ed25519".to_string()
    } else if *oid == ID_ED_448 {
        "Ed448".to_string()
    } else if *oid == ID_X_25519 {
        "X25519".to_string()
    } else if *oid == ID_X_448 {
        "X448".to_string()
    } else {
        oid.to_string()
    }
}

/// Bit length of a big-endian unsigned integer, ignoring leading zero bytes
pub(crate) fn compute_bit_length(bytes: &[u8]) -> Option<u32> {
    let start = bytes.iter().position(|&b| b != 0)?;
    let effective = &bytes[start..];
    let high_bits = 8u32 - effective[0].leading_zeros();
    let rest_bits = u32::try_from((effective.len() - 1) * 8).ok()?;
    Some(high_bits + rest_bits)
}

/// Modulus length of a DER `RSAPublicKey ::= SEQUENCE { modulus, exponent }`
pub(crate) fn extract_rsa_key_size(key_bytes: &[u8]) -> Option<u32> {
    let mut reader = SliceReader::new(key_bytes).ok()?;

    let sequence_header = reader.peek_header().ok()?;
    if sequence_header.tag != Tag::Sequence {
        return None;
    }
    let header_len = sequence_header.encoded_len().ok()?;
    reader.read_slice(header_len).ok()?;

    let modulus_header = reader.peek_header().ok()?;
    if modulus_header.tag != Tag::Integer {
        return None;
    }
    let modulus_header_len = modulus_header.encoded_len().ok()?;
    reader.read_slice(modulus_header_len).ok()?;

    let modulus_bytes = reader.read_slice(modulus_header.length).ok()?;
    compute_bit_length(modulus_bytes)
}

/// Modulus length of a DER `SubjectPublicKeyInfo`
pub(crate) fn modulus_bits_of_spki(der: &[u8]) -> Result<u32, ProviderError> {
    let spki = SubjectPublicKeyInfoRef::from_der(der)
        .map_err(|e| ProviderError::Malformed(format!("invalid public key info: {e}")))?;

    if spki.algorithm.oid != RSA_ENCRYPTION {
        return Err(ProviderError::Unsupported(format!(
            "{} keys cannot be measured",
            algorithm_name(&spki.algorithm.oid)
        )));
    }

    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| ProviderError::Malformed("public key has unused bits".to_string()))?;
    extract_rsa_key_size(key_bytes)
        .ok_or_else(|| ProviderError::Malformed("RSA modulus not found".to_string()))
}

/// Modulus length of a PEM public key, `PUBLIC KEY` or `RSA PUBLIC KEY`
pub(crate) fn modulus_bits_of_pem(pem_bytes: &[u8]) -> Result<u32, ProviderError> {
    let block = pem::parse(pem_bytes)
        .map_err(|e| ProviderError::Malformed(format!("invalid PEM: {e}")))?;
    match block.tag() {
        "PUBLIC KEY" => modulus_bits_of_spki(block.contents()),
        "RSA PUBLIC KEY" => extract_rsa_key_size(block.contents())
            .ok_or_else(|| ProviderError::Malformed("RSA modulus not found".to_string())),
        other => Err(ProviderError::Malformed(format!(
            "unexpected PEM label: {other}"
        ))),
    }
}

/// Re-encode an SPKI so callers holding an owned value can measure it
pub(crate) fn modulus_bits_of_owned(
    spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<u32, ProviderError> {
    let der = spki
        .to_der()
        .map_err(|e| ProviderError::Malformed(format!("unencodable public key: {e}")))?;
    modulus_bits_of_spki(&der)
}
