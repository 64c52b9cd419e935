//! Identity claims of a certificate request

use crate::error::{CaError, ProviderError};
use crate::provider::text::{common_name_from_subject_line, common_names_from_subject_line};
use crate::provider::{CryptoProvider, ProviderAdapter};
use crate::types::Csr;

pub use crate::provider::SubjectNames;

/// Reads the names a CSR asks to be certified for
#[derive(Debug)]
pub struct CsrInspector<'a, P> {
    adapter: &'a ProviderAdapter<P>,
}

impl<'a, P: CryptoProvider> CsrInspector<'a, P> {
    /// Inspect through the given provider
    pub fn new(adapter: &'a ProviderAdapter<P>) -> Self {
        Self { adapter }
    }

    /// Common name from the legacy subject line; `None` unless exactly one
    pub async fn common_name(&self, csr: &Csr) -> Option<String> {
        let subject = self.adapter.extract_subject(csr).await?;
        common_name_from_subject_line(&subject)
    }

    /// Common name and subject alternative names from the decoded request.
    ///
    /// When the provider has no structured decoder the legacy subject line
    /// is used instead, which yields the common name and no SANs.
    ///
    /// # Errors
    ///
    /// Propagates provider failures in the `CaError` taxonomy.
    pub async fn subject_names(&self, csr: &Csr) -> Result<SubjectNames, CaError> {
        match self.adapter.try_subject_names(csr).await {
            Ok(names) => Ok(names),
            Err(ProviderError::Unsupported(reason)) => {
                tracing::debug!(
                    "structured name decoding unavailable ({reason}), using subject line"
                );
                let subject = self.adapter.try_extract_subject(csr).await?;
                Ok(SubjectNames {
                    common_name: common_name_from_subject_line(&subject),
                    subject_common_names: common_names_from_subject_line(&subject),
                    ..SubjectNames::default()
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
