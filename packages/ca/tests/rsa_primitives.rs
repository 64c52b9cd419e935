//! Sign, verify, encrypt and decrypt through the provider adapter

mod common;

use common::{good_csr, STRONG_KEY, WEAK_KEY};
use cryypt_ca::{
    generate_rsa_key, public_key_of, CryptoProvider, Csr, NativeProvider, OpensslProvider,
    ProviderAdapter, ProviderError,
};

fn native() -> ProviderAdapter<NativeProvider> {
    ProviderAdapter::new(NativeProvider::new())
}

fn openssl_available() -> bool {
    std::process::Command::new("openssl")
        .arg("version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_verify_recovers_signed_data() {
    let adapter = native();
    let public = public_key_of(&STRONG_KEY).expect("public key");
    let message = b"challenge-token-3f9a";

    let signature = adapter
        .sign(&STRONG_KEY, message)
        .await
        .expect("signing should succeed");
    assert_eq!(signature.len(), 256);

    let recovered = adapter.verify(&public, signature.as_bytes()).await;
    assert_eq!(recovered.as_deref(), Some(&message[..]));
}

#[tokio::test]
async fn test_verify_fails_for_other_key_or_tampered_signature() {
    let adapter = native();
    let other = generate_rsa_key(2048).expect("second key");
    let other_public = public_key_of(&other).expect("public key");
    let public = public_key_of(&STRONG_KEY).expect("public key");

    let signature = adapter
        .sign(&STRONG_KEY, b"payload")
        .await
        .expect("signing should succeed");
    assert_eq!(adapter.verify(&other_public, signature.as_bytes()).await, None);

    let mut tampered = signature.into_vec();
    tampered[100] ^= 0x01;
    assert_eq!(adapter.verify(&public, &tampered).await, None);

    assert_eq!(adapter.verify(&public, b"short").await, None);
}

#[tokio::test]
async fn test_sign_rejects_data_longer_than_one_block() {
    let adapter = native();
    let too_long = vec![0x42u8; 250];
    assert!(adapter.sign(&STRONG_KEY, &too_long).await.is_none());
    assert!(matches!(
        adapter.try_sign(&STRONG_KEY, &too_long).await,
        Err(ProviderError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_encrypt_then_decrypt_round_trips() {
    let adapter = native();
    let public = public_key_of(&STRONG_KEY).expect("public key");
    let plaintext = b"session secret";

    let ciphertext = adapter
        .encrypt(&public, plaintext)
        .await
        .expect("encryption should succeed");
    assert_ne!(ciphertext.as_bytes(), plaintext);

    let decrypted = adapter
        .decrypt(&STRONG_KEY, ciphertext.as_bytes())
        .await
        .expect("decryption should succeed");
    assert_eq!(decrypted, plaintext);

    assert!(adapter.decrypt(&WEAK_KEY, ciphertext.as_bytes()).await.is_none());
}

#[tokio::test]
async fn test_check_syntax_is_idempotent() {
    let adapter = native();
    let csr = good_csr();
    let garbage = Csr::from("garbage");

    assert!(adapter.check_syntax(&csr).await);
    assert!(adapter.check_syntax(&csr).await);
    assert!(!adapter.check_syntax(&garbage).await);
    assert!(!adapter.check_syntax(&garbage).await);
}

#[tokio::test]
async fn test_modulus_bits_of_extracted_keys() {
    let adapter = native();
    let strong = adapter
        .extract_public_key(&good_csr())
        .await
        .expect("public key");
    assert_eq!(adapter.inspect_modulus_bits(&strong).await, Some(2048));

    let weak = public_key_of(&WEAK_KEY).expect("public key");
    assert_eq!(adapter.inspect_modulus_bits(&weak).await, Some(1024));
}

#[tokio::test]
async fn test_der_request_is_accepted() {
    let adapter = native();
    let pem_csr = good_csr();
    let block = pem::parse(pem_csr.as_bytes()).expect("PEM");
    let der_csr = Csr::new(block.into_contents());

    assert!(!der_csr.is_pem());
    assert!(adapter.check_syntax(&der_csr).await);
    assert_eq!(
        adapter.extract_subject(&der_csr).await.as_deref(),
        Some("subject=/C=US/CN=example.com")
    );
}

#[tokio::test]
async fn test_openssl_provider_agrees_with_native() {
    if !openssl_available() {
        return;
    }
    let native = native();
    let openssl = ProviderAdapter::new(OpensslProvider::default());
    let csr = good_csr();
    let public = public_key_of(&STRONG_KEY).expect("public key");

    assert!(openssl.check_syntax(&csr).await);
    assert!(!openssl.check_syntax(&Csr::from("garbage")).await);
    assert_eq!(
        openssl.extract_subject(&csr).await,
        native.extract_subject(&csr).await
    );
    assert_eq!(openssl.inspect_modulus_bits(&public).await, Some(2048));

    let der_csr = Csr::new(
        pem::parse(csr.as_bytes())
            .expect("PEM")
            .into_contents(),
    );
    assert!(openssl.check_syntax(&der_csr).await);
    assert_eq!(
        openssl.extract_subject(&der_csr).await,
        native.extract_subject(&der_csr).await
    );

    let names = openssl
        .provider()
        .subject_names(&csr)
        .await
        .expect("names");
    assert_eq!(names.common_name.as_deref(), Some("example.com"));
    assert!(names.dns_names.contains("www.example.com"));
    assert!(openssl
        .try_verify_proof_of_possession(&csr)
        .await
        .is_ok());

    let signature = native
        .sign(&STRONG_KEY, b"cross-check")
        .await
        .expect("native signature");
    assert_eq!(
        openssl.verify(&public, signature.as_bytes()).await.as_deref(),
        Some(&b"cross-check"[..])
    );

    let ciphertext = openssl
        .encrypt(&public, b"to native")
        .await
        .expect("openssl encryption");
    assert_eq!(
        native.decrypt(&STRONG_KEY, ciphertext.as_bytes()).await.as_deref(),
        Some(&b"to native"[..])
    );
}
