//! Sign-in, OAuth callback and sign-out handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use tourvisto_core::{Decision, Intent, Route};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{ProviderToken, clear_current_profile, set_current_profile};
use crate::models::CurrentProfile;
use crate::services::{SessionResolver, SignInFlow};
use crate::state::AppState;

/// Shown whenever sign-in fails, whatever the cause.
const GENERIC_SIGN_IN_ERROR: &str = "We couldn't sign you in. Please try again.";

/// Redirect target after a failed attempt.
const SIGN_IN_RETRY: &str = "/sign-in?error=sign_in_failed";

// =============================================================================
// Query Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub error: Option<String>,
}

/// Query parameters on the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub intent: Option<String>,
    /// Older links send the intent as `role`.
    pub role: Option<String>,
    /// Set by the provider when authorization was denied.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackQuery {
    fn intent(&self) -> Intent {
        Intent::from_param(self.intent.as_deref().or(self.role.as_deref()))
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    pub error: Option<&'static str>,
    pub user_url: String,
    pub admin_url: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/pending_approval.html")]
pub struct PendingApprovalTemplate {
    pub name: String,
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the sign-in page.
///
/// Someone the provider already recognizes is sent back to `/`, unless they
/// just landed here from a failed attempt.
///
/// # Route
///
/// `GET /sign-in`
pub async fn sign_in_page(
    State(state): State<AppState>,
    ProviderToken(token): ProviderToken,
    Query(query): Query<SignInQuery>,
) -> Result<Response> {
    if query.error.is_none() && token.is_some() {
        match SessionResolver::new(state.identity())
            .resolve(token.as_ref())
            .await
        {
            Ok(Some(_)) => return Ok(Redirect::to("/").into_response()),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not check existing provider session"),
        }
    }

    let identity = state.identity();
    let config = state.config();
    Ok(SignInTemplate {
        error: query.error.map(|_| GENERIC_SIGN_IN_ERROR),
        user_url: identity.authorize_url(&config.callback_url(Intent::User.as_param()))?,
        admin_url: identity.authorize_url(&config.callback_url(Intent::Admin.as_param()))?,
    }
    .into_response())
}

/// Finish an OAuth sign-in.
///
/// Runs the sign-in workflow, stores the resulting profile in the session and
/// redirects according to the decision, or renders the pending-approval page.
///
/// # Route
///
/// `GET /auth/callback?intent=user|admin`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    ProviderToken(token): ProviderToken,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = &query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Provider returned an OAuth error"
        );
        return Redirect::to(SIGN_IN_RETRY).into_response();
    }

    let intent = query.intent();
    let outcome = SignInFlow::new(state.identity(), state.store())
        .run(token.as_ref(), intent)
        .await;

    let Some(profile) = outcome.profile.as_ref() else {
        if let Err(e) = clear_current_profile(&session).await {
            tracing::warn!(error = %e, "Failed to clear session profile");
        }
        let target = if outcome.failed {
            SIGN_IN_RETRY
        } else {
            Route::SignIn.path()
        };
        return Redirect::to(target).into_response();
    };

    if let Err(e) = set_current_profile(&session, &CurrentProfile::from(profile)).await {
        let event_id = sentry::capture_error(&e);
        tracing::error!(
            error = %e,
            sentry_event_id = %event_id,
            "Failed to store profile in session"
        );
        return Redirect::to(SIGN_IN_RETRY).into_response();
    }
    set_sentry_user(&profile.account_id, Some(profile.email.as_str()));

    match outcome.decision {
        Decision::Redirect(route) => Redirect::to(route.path()).into_response(),
        Decision::PendingApproval => PendingApprovalTemplate {
            name: profile.name.clone(),
            email: profile.email.to_string(),
        }
        .into_response(),
    }
}

/// Sign out of the provider and this site.
///
/// Provider sign-out is best effort; the local session is always cleared.
///
/// # Route
///
/// `POST /auth/sign-out`
pub async fn sign_out(
    State(state): State<AppState>,
    session: Session,
    ProviderToken(token): ProviderToken,
) -> Response {
    if let Some(token) = token.as_ref()
        && let Err(e) = state.identity().sign_out(token).await
    {
        tracing::warn!(error = %e, "Provider sign-out failed");
    }

    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    let expire_token = format!(
        "{}=; Path=/; Max-Age=0; SameSite=Lax",
        state.config().identity.token_cookie
    );
    ([(SET_COOKIE, expire_token)], Redirect::to(Route::SignIn.path())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(intent: Option<&str>, role: Option<&str>) -> CallbackQuery {
        CallbackQuery {
            intent: intent.map(String::from),
            role: role.map(String::from),
            error: None,
            error_description: None,
        }
    }

    #[test]
    fn test_callback_intent_prefers_intent_param() {
        assert_eq!(query(Some("admin"), Some("user")).intent(), Intent::Admin);
    }

    #[test]
    fn test_callback_intent_falls_back_to_role() {
        assert_eq!(query(None, Some("admin")).intent(), Intent::Admin);
        assert_eq!(query(None, Some("ADMIN")).intent(), Intent::None);
        assert_eq!(query(None, None).intent(), Intent::None);
        assert_eq!(query(Some("client"), None).intent(), Intent::None);
    }
}
