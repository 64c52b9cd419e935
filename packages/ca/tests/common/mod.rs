//! Shared fixtures for the integration tests

#![allow(dead_code)]

use cryypt_ca::{generate_rsa_key, CsrBuilder, Csr, PrivateKey};
use once_cell::sync::Lazy;

/// 2048-bit key, generated once per test binary
pub static STRONG_KEY: Lazy<PrivateKey> =
    Lazy::new(|| generate_rsa_key(2048).expect("Failed to generate 2048-bit key"));

/// 1024-bit key, below the default minimum
pub static WEAK_KEY: Lazy<PrivateKey> =
    Lazy::new(|| generate_rsa_key(1024).expect("Failed to generate 1024-bit key"));

/// Request for `cn` with the given DNS names, signed by `key`
pub fn csr_for(key: &PrivateKey, cn: &str, dns: &[&str]) -> Csr {
    let mut builder = CsrBuilder::new().country("US").common_name(cn);
    for name in dns {
        builder = builder.dns_name(*name);
    }
    builder.build(key).expect("Failed to build CSR")
}

/// Request for `example.com` and `www.example.com` with a strong key
pub fn good_csr() -> Csr {
    csr_for(&STRONG_KEY, "example.com", &["www.example.com"])
}
