//! RSA PKCS#1 v1.5 primitives over raw data
//!
//! Signing does not hash or wrap the input in a `DigestInfo`; it pads and
//! exponentiates exactly the bytes given, so `recover` returns them again.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::error::ProviderError;
use crate::types::{PrivateKey, PublicKey};

/// Minimum run of `0xFF` bytes in a type 1 padding block
const MIN_PADDING_LEN: usize = 8;

pub(crate) fn parse_private_key(key: &PrivateKey) -> Result<RsaPrivateKey, ProviderError> {
    let block = pem::parse(key.as_bytes())
        .map_err(|e| ProviderError::Malformed(format!("invalid private key PEM: {e}")))?;
    let der = Zeroizing::new(block.contents().to_vec());
    match block.tag() {
        "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(&der)
            .map_err(|e| ProviderError::Malformed(format!("invalid PKCS#8 key: {e}"))),
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| ProviderError::Malformed(format!("invalid PKCS#1 key: {e}"))),
        other => Err(ProviderError::Malformed(format!(
            "unexpected private key label: {other}"
        ))),
    }
}

pub(crate) fn parse_public_key(key: &PublicKey) -> Result<RsaPublicKey, ProviderError> {
    let block = pem::parse(key.as_bytes())
        .map_err(|e| ProviderError::Malformed(format!("invalid public key PEM: {e}")))?;
    match block.tag() {
        "PUBLIC KEY" => RsaPublicKey::from_public_key_der(block.contents()).map_err(|e| {
            ProviderError::Unsupported(format!("not an RSA subject public key: {e}"))
        }),
        "RSA PUBLIC KEY" => RsaPublicKey::from_pkcs1_der(block.contents())
            .map_err(|e| ProviderError::Malformed(format!("invalid PKCS#1 public key: {e}"))),
        other => Err(ProviderError::Malformed(format!(
            "unexpected public key label: {other}"
        ))),
    }
}

/// Type 1 padded private-key operation over `data`
pub(crate) fn sign(key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let private_key = parse_private_key(key)?;
    private_key
        .sign(Pkcs1v15Sign::new_unprefixed(), data)
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => {
                ProviderError::Malformed("data too long for key size".to_string())
            }
            other => ProviderError::Failed(format!("signing failed: {other}")),
        })
}

/// Public-key operation that returns the data a signature was made over.
///
/// Fails when the signature length differs from the modulus length, when
/// the representative is out of range or when the padding is not a valid
/// type 1 block.
pub(crate) fn recover(key: &PublicKey, signature: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let public_key = parse_public_key(key)?;
    let k = public_key.size();
    if signature.len() != k {
        return Err(ProviderError::Malformed(format!(
            "signature is {} bytes, key requires {k}",
            signature.len()
        )));
    }

    let s = BigUint::from_bytes_be(signature);
    if &s >= public_key.n() {
        return Err(ProviderError::Malformed(
            "signature representative out of range".to_string(),
        ));
    }
    let m = s.modpow(public_key.e(), public_key.n()).to_bytes_be();
    if m.len() > k {
        return Err(ProviderError::Malformed("invalid signature".to_string()));
    }
    let mut block = vec![0u8; k - m.len()];
    block.extend_from_slice(&m);

    strip_type1_padding(&block)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| ProviderError::Malformed("signature does not verify".to_string()))
}

/// `00 01 FF..FF 00 || data`, with at least eight `FF` bytes
fn strip_type1_padding(block: &[u8]) -> Option<&[u8]> {
    let rest = block.strip_prefix(&[0x00, 0x01])?;
    let separator = rest.iter().position(|&b| b != 0xff)?;
    if separator < MIN_PADDING_LEN || rest[separator] != 0x00 {
        return None;
    }
    Some(&rest[separator + 1..])
}

pub(crate) fn encrypt(key: &PublicKey, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let public_key = parse_public_key(key)?;
    public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => {
                ProviderError::Malformed("data too long for key size".to_string())
            }
            other => ProviderError::Failed(format!("encryption failed: {other}")),
        })
}

pub(crate) fn decrypt(key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let private_key = parse_private_key(key)?;
    private_key
        .decrypt(Pkcs1v15Encrypt, data)
        .map_err(|_| ProviderError::Malformed("decryption failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type1_padding_requires_eight_ff_bytes() {
        let mut block = vec![0x00, 0x01];
        block.extend([0xff; 8]);
        block.push(0x00);
        block.extend(b"abc");
        assert_eq!(strip_type1_padding(&block), Some(&b"abc"[..]));

        let mut short = vec![0x00, 0x01];
        short.extend([0xff; 7]);
        short.push(0x00);
        short.extend(b"abc");
        assert_eq!(strip_type1_padding(&short), None);
    }

    #[test]
    fn type1_padding_rejects_wrong_block_type() {
        let mut block = vec![0x00, 0x02];
        block.extend([0xff; 8]);
        block.push(0x00);
        assert_eq!(strip_type1_padding(&block), None);

        let mut no_separator = vec![0x00, 0x01];
        no_separator.extend([0xff; 12]);
        assert_eq!(strip_type1_padding(&no_separator), None);
    }

    #[test]
    fn garbage_keys_are_malformed() {
        let key = PrivateKey::from("not a key");
        assert!(matches!(sign(&key, b"x"), Err(ProviderError::Malformed(_))));
        let public = PublicKey::from("not a key");
        assert!(matches!(
            encrypt(&public, b"x"),
            Err(ProviderError::Malformed(_))
        ));
    }
}
