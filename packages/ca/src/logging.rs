//! Logging setup and log-safe identifiers
//!
//! Library code emits `tracing` events; with no subscriber installed they are
//! forwarded to the `log` facade, which `init` wires to `env_logger`.
//! Configure levels via `RUST_LOG`, e.g. `RUST_LOG=cryypt_ca=debug`.

use sha2::{Digest, Sha256};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialize logging once at process startup
pub fn init() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::from_default_env()
            .format_timestamp_micros()
            .init();

        log::info!("Structured logging initialized");
    });
}

/// Initialize logging for tests without clashing with other test threads
pub fn init_test() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

/// Short SHA-256 fingerprint used to correlate a request across log lines.
///
/// Request bytes and key material are never logged directly.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint(b"csr bytes");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint(b"csr bytes"));
        assert_ne!(a, fingerprint(b"other bytes"));
    }

    #[test]
    fn init_is_idempotent() {
        init_test();
        init_test();
    }
}
