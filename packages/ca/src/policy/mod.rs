//! Issuance policy
//!
//! [`KeyPolicy`] gates on key strength, [`NamePolicy`] on which hostnames
//! this CA will vouch for. Both are allow-by-default apart from what they
//! explicitly refuse.

pub mod decision;
pub mod key;
pub mod name;

pub use decision::PolicyDecision;
pub use key::KeyPolicy;
pub use name::NamePolicy;
