//! Session resolution against the identity provider.

use tracing::instrument;

use tourvisto_core::Principal;

use super::SignInError;
use crate::identity::{AccessToken, IdentityProvider};

/// Looks up the authenticated principal for a request.
pub struct SessionResolver<'a> {
    provider: &'a dyn IdentityProvider,
}

impl<'a> SessionResolver<'a> {
    #[must_use]
    pub const fn new(provider: &'a dyn IdentityProvider) -> Self {
        Self { provider }
    }

    /// Resolve the principal behind `token`.
    ///
    /// No token means no principal; the provider is not called.
    ///
    /// # Errors
    ///
    /// Returns `SignInError::AuthUnavailable` if the provider cannot answer.
    #[instrument(skip_all, fields(has_token = token.is_some()))]
    pub async fn resolve(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<Option<Principal>, SignInError> {
        let Some(token) = token else {
            return Ok(None);
        };
        Ok(self.provider.get_principal(token).await?)
    }
}
