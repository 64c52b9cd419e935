//! Crypto provider that shells out to the `openssl` binary
//!
//! Every operation runs one `openssl` subcommand with the untrusted input on
//! stdin. A call succeeds only if the process exits cleanly and writes
//! nothing to stderr. Keys for the RSA primitives are staged in
//! [`SecretFile`]s that are wiped on drop.

use std::path::PathBuf;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::text::{
    common_name_from_subject_line, common_names_from_subject_line, parse_modulus_bits,
    parse_san_entries, parse_subject_line,
};
use super::{CryptoProvider, SubjectNames};
use crate::error::ProviderError;
use crate::staging::SecretFile;
use crate::types::{Csr, EncryptedBlob, PrivateKey, PublicKey, SignedBlob};

/// Provider driving the OpenSSL command line tool
#[derive(Debug, Clone)]
pub struct OpensslProvider {
    binary: PathBuf,
}

impl Default for OpensslProvider {
    fn default() -> Self {
        Self::new("openssl")
    }
}

impl OpensslProvider {
    /// Use the given `openssl` executable
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Executable this provider runs
    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    async fn run(&self, args: &[&str], input: &[u8]) -> Result<Output, ProviderError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProviderError::Failed(format!("cannot run {}: {e}", self.binary.display()))
            })?;

        let stdin = child.stdin.take();
        let payload = input.to_vec();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A child that exits without reading its input closes the pipe
                let _ = stdin.write_all(&payload).await;
                let _ = stdin.shutdown().await;
            }
        };
        let (_, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        tracing::trace!(
            "openssl {} exited with {} ({} bytes out, {} bytes err)",
            args.first().copied().unwrap_or_default(),
            output.status,
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(output)
    }

    /// Run and require a clean exit with empty stderr and non-empty stdout
    async fn run_clean(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let output = self.run(args, input).await?;
        if !output.status.success() || !output.stderr.is_empty() {
            return Err(ProviderError::Malformed(stderr_summary(&output)));
        }
        if output.stdout.is_empty() {
            return Err(ProviderError::Malformed(format!(
                "openssl {} produced no output",
                args.join(" ")
            )));
        }
        Ok(output.stdout)
    }

    async fn run_text(&self, args: &[&str], input: &[u8]) -> Result<String, ProviderError> {
        let stdout = self.run_clean(args, input).await?;
        String::from_utf8(stdout)
            .map_err(|_| ProviderError::Failed("openssl output is not UTF-8".to_string()))
    }

    async fn text_dump(&self, csr: &Csr) -> Result<String, ProviderError> {
        self.run_text(&req_args(csr, &["-noout", "-text"]), csr.as_bytes())
            .await
    }

    async fn with_key<T>(
        &self,
        key_pem: &[u8],
        args: &[&str],
        input: &[u8],
        wrap: impl FnOnce(Vec<u8>) -> T,
    ) -> Result<T, ProviderError> {
        let staged = SecretFile::with_contents(key_pem)?;
        let key_path = staged.path().to_string_lossy().into_owned();
        let mut full_args = vec!["pkeyutl"];
        full_args.extend_from_slice(args);
        full_args.extend_from_slice(&["-inkey", key_path.as_str()]);
        let output = self.run_clean(&full_args, input).await?;
        Ok(wrap(output))
    }
}

/// `req` arguments for `csr`, reading DER when the request is not PEM
fn req_args<'a>(csr: &Csr, args: &[&'a str]) -> Vec<&'a str> {
    let mut full = vec!["req"];
    full.extend_from_slice(args);
    if !csr.is_pem() {
        full.extend_from_slice(&["-inform", "DER"]);
    }
    full
}

fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr.lines().next().unwrap_or_default().trim();
    if first.is_empty() {
        format!("openssl exited with {}", output.status)
    } else {
        format!("openssl: {first}")
    }
}

#[async_trait]
impl CryptoProvider for OpensslProvider {
    fn name(&self) -> &'static str {
        "openssl"
    }

    async fn check_syntax(&self, csr: &Csr) -> Result<(), ProviderError> {
        let output = self.run(&req_args(csr, &["-noout"]), csr.as_bytes()).await?;
        if output.status.success() && output.stderr.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Malformed(stderr_summary(&output)))
        }
    }

    async fn extract_public_key(&self, csr: &Csr) -> Result<PublicKey, ProviderError> {
        self.run_clean(&req_args(csr, &["-pubkey", "-noout"]), csr.as_bytes())
            .await
            .map(PublicKey::from)
    }

    async fn inspect_modulus_bits(&self, key: &PublicKey) -> Result<u32, ProviderError> {
        let text = self
            .run_text(&["rsa", "-pubin", "-text", "-noout"], key.as_bytes())
            .await
            .map_err(|e| match e {
                ProviderError::Malformed(msg) => {
                    ProviderError::Unsupported(format!("not an RSA public key: {msg}"))
                }
                other => other,
            })?;
        parse_modulus_bits(&text)
            .ok_or_else(|| ProviderError::Malformed("modulus length not reported".to_string()))
    }

    async fn extract_subject(&self, csr: &Csr) -> Result<String, ProviderError> {
        let text = self
            .run_text(
                &req_args(csr, &["-subject", "-noout", "-nameopt", "compat"]),
                csr.as_bytes(),
            )
            .await?;
        parse_subject_line(&text)
            .ok_or_else(|| ProviderError::Malformed("no subject line in output".to_string()))
    }

    async fn subject_names(&self, csr: &Csr) -> Result<SubjectNames, ProviderError> {
        let subject = self.extract_subject(csr).await?;
        let dump = self.text_dump(csr).await?;
        let (dns_names, unsupported) = parse_san_entries(&dump);
        Ok(SubjectNames {
            common_name: common_name_from_subject_line(&subject),
            dns_names,
            unsupported,
            subject_common_names: common_names_from_subject_line(&subject),
        })
    }

    async fn verify_proof_of_possession(&self, csr: &Csr) -> Result<(), ProviderError> {
        // `req -verify` reports success on stderr, so only the status counts
        let output = self
            .run(&req_args(csr, &["-verify", "-noout"]), csr.as_bytes())
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProviderError::Malformed(stderr_summary(&output)))
        }
    }

    async fn sign(&self, key: &PrivateKey, data: &[u8]) -> Result<SignedBlob, ProviderError> {
        self.with_key(key.as_bytes(), &["-sign"], data, SignedBlob::from)
            .await
    }

    async fn verify(&self, key: &PublicKey, signature: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.with_key(
            key.as_bytes(),
            &["-verifyrecover", "-pubin"],
            signature,
            |data| data,
        )
        .await
    }

    async fn encrypt(&self, key: &PublicKey, data: &[u8]) -> Result<EncryptedBlob, ProviderError> {
        self.with_key(
            key.as_bytes(),
            &["-encrypt", "-pubin"],
            data,
            EncryptedBlob::from,
        )
        .await
    }

    async fn decrypt(&self, key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.with_key(key.as_bytes(), &["-decrypt"], data, |data| data)
            .await
    }
}
