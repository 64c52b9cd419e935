//! Which hostnames the domain-validation track may issue for
//!
//! The policy refuses single-label names and denylisted names and accepts
//! everything else. There is no FQDN or public suffix validation. Denylist
//! matching is exact and case-sensitive unless case-insensitive matching is
//! switched on, and wildcard names are accepted unless wildcard rejection is
//! switched on.

use std::collections::HashSet;

use crate::config::{CaConfig, DEFAULT_DENYLIST};
use crate::error::RejectReason;

/// Allow-by-default name policy with an explicit denylist
#[derive(Debug, Clone)]
pub struct NamePolicy {
    denylist: HashSet<String>,
    case_insensitive_denylist: bool,
    reject_wildcards: bool,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

impl NamePolicy {
    /// Policy refusing exactly the given names
    pub fn new<I, S>(denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denylist: denylist.into_iter().map(Into::into).collect(),
            case_insensitive_denylist: false,
            reject_wildcards: false,
        }
    }

    /// Policy as configured
    pub fn from_config(config: &CaConfig) -> Self {
        Self::new(config.denylist.iter().cloned())
            .with_case_insensitive_denylist(config.case_insensitive_denylist)
            .with_wildcard_rejection(config.reject_wildcards)
    }

    /// Match denylist entries ignoring ASCII case
    #[must_use]
    pub fn with_case_insensitive_denylist(mut self, enabled: bool) -> Self {
        self.case_insensitive_denylist = enabled;
        self
    }

    /// Refuse names with a `*` in any label
    #[must_use]
    pub fn with_wildcard_rejection(mut self, enabled: bool) -> Self {
        self.reject_wildcards = enabled;
        self
    }

    fn is_denied(&self, name: &str) -> bool {
        if self.case_insensitive_denylist {
            self.denylist
                .iter()
                .any(|denied| denied.eq_ignore_ascii_case(name))
        } else {
            self.denylist.contains(name)
        }
    }

    /// Check one name
    ///
    /// # Errors
    ///
    /// Returns the first rule the name breaks: missing dot, denylist, then
    /// wildcard.
    pub fn evaluate(&self, name: &str) -> Result<(), RejectReason> {
        if !name.contains('.') {
            return Err(RejectReason::SingleLabelName(name.to_string()));
        }
        if self.is_denied(name) {
            return Err(RejectReason::DeniedName(name.to_string()));
        }
        if self.reject_wildcards && name.split('.').any(|label| label.contains('*')) {
            return Err(RejectReason::WildcardName(name.to_string()));
        }
        Ok(())
    }

    /// True iff the name may be issued
    pub fn may_issue(&self, name: &str) -> bool {
        self.evaluate(name).is_ok()
    }
}
