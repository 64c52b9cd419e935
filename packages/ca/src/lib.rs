#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::result_large_err)]

//! Policy enforcement and RSA primitives for a domain-validation CA
//!
//! A PKCS#10 request flows through the [`IssuanceOrchestrator`]:
//!
//! 1. the [`CryptoProvider`] checks its syntax,
//! 2. the [`CsrInspector`] reads the common name and DNS names,
//! 3. [`KeyPolicy`] measures the RSA modulus,
//! 4. [`NamePolicy`] checks every name,
//! 5. a [`CaBackend`] signs it.
//!
//! Every provider and backend call is bounded by a timeout. Failures are
//! reported as [`CaError`], which keeps malformed input, policy rejections
//! and infrastructure failures apart.
//!
//! ```no_run
//! use cryypt_ca::{CaConfig, Csr, IssuanceOrchestrator, LocalAuthority, NativeProvider};
//!
//! # async fn run(pem: &str) -> cryypt_ca::Result<()> {
//! cryypt_ca::logging::init();
//! let backend = LocalAuthority::generate("Example DV CA")?;
//! let ca = IssuanceOrchestrator::new(NativeProvider::new(), backend, CaConfig::default())?;
//! let certificate = ca.issue(&Csr::from(pem)).await?;
//! # let _ = certificate;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod inspector;
pub mod logging;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod request;
pub mod staging;
pub mod types;

pub use backend::{CaBackend, IssuanceRequest, LocalAuthority, ScriptBackend};
pub use config::{CaConfig, SubmissionMode};
pub use error::{BackendError, CaError, ProviderError, RejectReason, Result};
pub use inspector::{CsrInspector, SubjectNames};
pub use orchestrator::IssuanceOrchestrator;
pub use policy::{KeyPolicy, NamePolicy, PolicyDecision};
pub use provider::{CryptoProvider, NativeProvider, OpensslProvider, ProviderAdapter};
pub use request::{generate_rsa_key, public_key_of, CsrBuilder};
pub use types::{Certificate, Csr, EncryptedBlob, PrivateKey, PublicKey, SignedBlob};
