//! # Service Error Taxonomy
//!
//! Every fallible operation in the library returns [`ServiceError`]. The three
//! variants map one-to-one onto the failure classes callers have to tell apart:
//!
//! - **Validation**: malformed or out-of-range input. Raised before any
//!   upstream call is made.
//! - **Upstream**: transport failure or non-success response from the weather
//!   or tide provider. Never cached, never retried.
//! - **Domain**: internal misuse such as an unmapped vessel class or harbor.

use thiserror::Error;

/// Errors surfaced by the normalizers, the route planner and the catalogs.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Input rejected before doing any work
    #[error("validation error: {0}")]
    Validation(String),

    /// Weather or tide provider failed (network, status, or payload)
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Lookup or invariant failure inside the domain tables
    #[error("domain error: {0}")]
    Domain(String),
}

impl ServiceError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Upstream(_) => "UPSTREAM_ERROR",
            ServiceError::Domain(_) => "DOMAIN_ERROR",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}
