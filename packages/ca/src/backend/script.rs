//! Backend that delegates signing to an external program
//!
//! The program is called as `<program> -<track> <csr_path> <cert_path>`.
//! Zero exit status with a non-empty output file is success; anything else
//! is a failure and whatever was written is discarded.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CaBackend, IssuanceRequest};
use crate::config::SubmissionMode;
use crate::error::BackendError;
use crate::staging::SecretFile;
use crate::types::Certificate;

/// Environment variable carrying the validated common name
pub const SUBJECT_CN_ENV: &str = "CA_SUBJECT_CN";

/// Environment variable carrying the validated DNS names, comma separated
pub const SUBJECT_ALT_NAMES_ENV: &str = "CA_SUBJECT_ALT_NAMES";

/// Runs a signing script per request
#[derive(Debug, Clone)]
pub struct ScriptBackend {
    program: PathBuf,
}

impl ScriptBackend {
    /// Backend invoking `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The signing program
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

#[async_trait]
impl CaBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn issue(&self, request: &IssuanceRequest) -> Result<Certificate, BackendError> {
        let csr_file = SecretFile::with_contents(request.csr.as_bytes())?;
        let cert_file = SecretFile::empty()?;

        let mut command = Command::new(&self.program);
        command
            .arg(format!("-{}", request.track))
            .arg(csr_file.path())
            .arg(cert_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if request.submission == SubmissionMode::Reconstructed {
            command.env(SUBJECT_CN_ENV, request.primary_name().unwrap_or_default());
            let alt_names: Vec<String> = request.names().into_iter().collect();
            command.env(SUBJECT_ALT_NAMES_ENV, alt_names.join(","));
        }

        let output = command.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.lines().next().unwrap_or_default()
            );
            return Err(BackendError::Status(output.status.to_string()));
        }

        let certificate = cert_file.read().await?;
        if certificate.is_empty() {
            return Err(BackendError::EmptyOutput);
        }
        Ok(Certificate::from(certificate))
    }
}
