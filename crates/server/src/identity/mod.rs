//! Identity provider boundary.
//!
//! The provider owns authentication. This server only asks it who holds a
//! given access token, tells it to end a session, and builds the link that
//! starts its OAuth flow.

pub mod supabase;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use tourvisto_core::Principal;

pub use supabase::SupabaseIdentityClient;

/// Errors talking to the identity provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or timed out.
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with an unexpected status.
    #[error("identity provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider's response could not be understood.
    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),

    /// Could not build a provider URL.
    #[error("invalid identity provider url: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Unreachable(e.to_string())
        }
    }
}

/// A provider-issued access token.
///
/// Wrapped so the raw value never ends up in logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token, ignoring blank values.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else {
            Some(Self(SecretString::from(raw.to_owned())))
        }
    }

    /// Expose the raw token for an outgoing request.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Operations the sign-in workflow needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the principal holding `token`.
    ///
    /// Returns `Ok(None)` when the provider rejects the token.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the provider cannot answer.
    async fn get_principal(&self, token: &AccessToken) -> Result<Option<Principal>, ProviderError>;

    /// End the provider session behind `token`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the provider cannot answer.
    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError>;

    /// URL that starts the provider's OAuth flow and returns to `redirect_to`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Url` if the URL cannot be built.
    fn authorize_url(&self, redirect_to: &str) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_rejects_blank() {
        assert!(AccessToken::new("  ").is_none());
        assert!(AccessToken::new("").is_none());
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ.secret.jwt").map(|t| format!("{t:?}"));
        assert_eq!(token.as_deref(), Some("AccessToken([REDACTED])"));
    }
}
