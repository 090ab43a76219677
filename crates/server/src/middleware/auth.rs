//! Authentication extractors.
//!
//! Two sources of identity exist for a request:
//! - the provider access token ([`ProviderToken`]), read from an
//!   `Authorization: Bearer` header or the provider's token cookie
//! - the signed-in profile stored in the session after a successful
//!   callback ([`RequireProfile`], [`RequireAdmin`], [`OptionalProfile`])

use axum::{
    extract::FromRequestParts,
    http::{
        StatusCode,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use tourvisto_core::Route;

use crate::identity::AccessToken;
use crate::models::{CurrentProfile, session_keys};
use crate::state::AppState;

/// The identity provider access token sent with the request, if any.
///
/// A bearer header wins over the cookie.
#[derive(Debug, Clone)]
pub struct ProviderToken(pub Option<AccessToken>);

impl FromRequestParts<AppState> for ProviderToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_name = &state.config().identity.token_cookie;
        Ok(Self(
            bearer_token(parts).or_else(|| cookie_token(parts, cookie_name)),
        ))
    }
}

fn bearer_token(parts: &Parts) -> Option<AccessToken> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    AccessToken::new(token)
}

fn cookie_token(parts: &Parts, name: &str) -> Option<AccessToken> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| AccessToken::new(value))
}

/// Extractor that requires a signed-in profile.
///
/// HTML requests are redirected to the sign-in page, `/api/` requests get 401.
pub struct RequireProfile(pub CurrentProfile);

/// Extractor that requires a signed-in admin.
///
/// A non-admin snapshot is checked against the store first, so an account
/// approved after signing in gets through without signing in again.
/// Signed-in non-admins are redirected home.
pub struct RequireAdmin(pub CurrentProfile);

/// Error returned when a guarded route is hit without the right profile.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the sign-in page (for HTML requests).
    RedirectToSignIn,
    /// Redirect home (signed in, but not allowed here).
    RedirectHome,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Forbidden response (for API requests).
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn => Redirect::to(Route::SignIn.path()).into_response(),
            Self::RedirectHome => Redirect::to(Route::Home.path()).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

fn is_api(parts: &Parts) -> bool {
    parts.uri.path().starts_with("/api/")
}

async fn session_profile(parts: &Parts) -> Option<CurrentProfile> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentProfile>(session_keys::CURRENT_PROFILE)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireProfile
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_profile(parts).await.map(Self).ok_or_else(|| {
            if is_api(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToSignIn
            }
        })
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireProfile(mut profile) = RequireProfile::from_request_parts(parts, state).await?;
        if !profile.is_admin()
            && let Some(session) = parts.extensions.get::<Session>()
        {
            profile = refresh_current_profile(state, session, profile).await;
        }
        if profile.is_admin() {
            return Ok(Self(profile));
        }

        tracing::debug!(account_id = %profile.account_id, "Non-admin denied admin route");
        Err(if is_api(parts) {
            AuthRejection::Forbidden
        } else {
            AuthRejection::RedirectHome
        })
    }
}

/// Extractor that optionally gets the signed-in profile.
pub struct OptionalProfile(pub Option<CurrentProfile>);

impl<S> FromRequestParts<S> for OptionalProfile
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_profile(parts).await))
    }
}

/// Store the signed-in profile in the session.
///
/// Cycles the session id first so a pre-sign-in id is never reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_profile(
    session: &Session,
    profile: &CurrentProfile,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_PROFILE, profile).await
}

/// Re-read the session's profile from the store.
///
/// The session is rewritten when the stored status has changed. Store
/// failures keep the snapshot.
pub async fn refresh_current_profile(
    state: &AppState,
    session: &Session,
    current: CurrentProfile,
) -> CurrentProfile {
    let fresh = match state.store().get_profile(&current.account_id).await {
        Ok(Some(profile)) => CurrentProfile::from(&profile),
        Ok(None) => return current,
        Err(e) => {
            tracing::warn!(
                error = %e,
                account_id = %current.account_id,
                "Could not refresh session profile"
            );
            return current;
        }
    };

    if fresh.status != current.status {
        tracing::info!(
            account_id = %fresh.account_id,
            status = %fresh.status,
            "Session profile status changed"
        );
        if let Err(e) = session.insert(session_keys::CURRENT_PROFILE, &fresh).await {
            tracing::warn!(error = %e, "Failed to update session profile");
        }
    }
    fresh
}

/// Remove the signed-in profile from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_profile(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentProfile>(session_keys::CURRENT_PROFILE)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: (&str, &str)) -> Parts {
        Request::builder()
            .uri("/auth/callback")
            .header(header.0, header.1)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_bearer_token() {
        let p = parts(("authorization", "Bearer abc.def"));
        assert_eq!(bearer_token(&p).unwrap().expose(), "abc.def");

        let p = parts(("authorization", "Basic dXNlcg=="));
        assert!(bearer_token(&p).is_none());
    }

    #[test]
    fn test_cookie_token() {
        let p = parts(("cookie", "tv_session=xyz; sb-access-token=tok123; other=1"));
        assert_eq!(
            cookie_token(&p, "sb-access-token").unwrap().expose(),
            "tok123"
        );
        assert!(cookie_token(&p, "missing").is_none());
    }

    #[test]
    fn test_empty_cookie_is_no_token() {
        let p = parts(("cookie", "sb-access-token="));
        assert!(cookie_token(&p, "sb-access-token").is_none());
    }

    #[test]
    fn test_rejection_responses() {
        let r = AuthRejection::RedirectToSignIn.into_response();
        assert_eq!(r.status(), StatusCode::SEE_OTHER);
        assert_eq!(r.headers()["location"], "/sign-in");
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
