//! Client for a Supabase-compatible (`GoTrue`) auth REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use tourvisto_core::{AccountId, Email, Principal};

use super::{AccessToken, IdentityProvider, ProviderError};
use crate::config::IdentityConfig;

/// User object returned by `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    name: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

impl TryFrom<GoTrueUser> for Principal {
    type Error = ProviderError;

    fn try_from(user: GoTrueUser) -> Result<Self, Self::Error> {
        let id = AccountId::parse(&user.id)
            .map_err(|e| ProviderError::InvalidResponse(format!("user id: {e}")))?;
        let email = user
            .email
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidResponse("user has no email".to_owned()))
            .and_then(|raw| {
                Email::parse(raw).map_err(|e| ProviderError::InvalidResponse(format!("email: {e}")))
            })?;

        let meta = user.user_metadata;
        Ok(Self {
            id,
            email,
            name: non_blank(meta.name).or_else(|| non_blank(meta.full_name)),
            avatar_url: non_blank(meta.avatar_url).or_else(|| non_blank(meta.picture)),
        })
    }
}

/// Identity provider client speaking the `GoTrue` REST API.
#[derive(Clone)]
pub struct SupabaseIdentityClient {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
    oauth_provider: String,
}

impl std::fmt::Debug for SupabaseIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseIdentityClient")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("oauth_provider", &self.oauth_provider)
            .finish_non_exhaustive()
    }
}

impl SupabaseIdentityClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unreachable` if the HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            oauth_provider: config.oauth_provider.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityClient {
    #[instrument(skip_all)]
    async fn get_principal(&self, token: &AccessToken) -> Result<Option<Principal>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("/auth/v1/user")?)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(token.expose())
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!(status = status.as_u16(), "Provider rejected access token");
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Provider user lookup failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let user: GoTrueUser = response.json().await?;
        let principal = Principal::try_from(user)?;
        debug!(account_id = %principal.id, "Resolved principal");
        Ok(Some(principal))
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, token: &AccessToken) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.endpoint("/auth/v1/logout")?)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(token.expose())
            .send()
            .await?;

        let status = response.status();
        // An already-invalid token means there is no session left to end.
        if status.is_success() || matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        {
            return Ok(());
        }

        Err(ProviderError::Status {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    fn authorize_url(&self, redirect_to: &str) -> Result<String, ProviderError> {
        let mut url = self.endpoint("/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", &self.oauth_provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }
}
