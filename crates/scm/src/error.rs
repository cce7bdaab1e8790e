//! Error types for provider clients.

use thiserror::Error;

use crate::Backend;

/// Errors returned by [`crate::ProviderClient`] implementations.
///
/// Every backend maps its HTTP failures onto these variants, so callers never
/// inspect provider-specific response shapes.
#[derive(Debug, Error)]
pub enum ScmError {
    /// The provider rejected the credential (401/403).
    #[error("{provider} rejected the request credentials ({status})")]
    Auth { provider: Backend, status: u16 },

    /// The provider answered with a non-success status.
    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: Backend,
        status: u16,
        body: String,
    },

    /// HTTP request failed (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Failed to decode {provider} response: {source}")]
    Decode {
        provider: Backend,
        #[source]
        source: reqwest::Error,
    },

    /// Client could not be constructed (missing token, missing project id).
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),
}

impl ScmError {
    /// Whether the provider refused the credential.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Whether the failure happened before any remote call.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
