//! Landing pages guarded by the session profile.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use tourvisto_core::{ElevationRequest, RequestStatus, Route};

use crate::error::Result;
use crate::middleware::{
    OptionalProfile, ProviderToken, RequireAdmin, RequireProfile, refresh_current_profile,
};
use crate::models::CurrentProfile;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub profile: CurrentProfile,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub profile: CurrentProfile,
    pub total_profiles: i64,
    pub pending: Vec<ElevationRequest>,
}

/// Route the bare site root.
///
/// A session profile goes to the dashboard or home, by its current stored
/// status. A provider token without a session goes through the callback so
/// the profile gets reconciled first.
///
/// # Route
///
/// `GET /`
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalProfile(profile): OptionalProfile,
    ProviderToken(token): ProviderToken,
) -> Response {
    if let Some(profile) = profile {
        let profile = refresh_current_profile(&state, &session, profile).await;
        let route = if profile.is_admin() {
            Route::Dashboard
        } else {
            Route::Home
        };
        return Redirect::to(route.path()).into_response();
    }
    if token.is_some() {
        return Redirect::to("/auth/callback").into_response();
    }
    Redirect::to(Route::SignIn.path()).into_response()
}

/// # Route
///
/// `GET /home`
pub async fn home(RequireProfile(profile): RequireProfile) -> impl IntoResponse {
    HomeTemplate { profile }
}

/// Admin dashboard with the queue of pending elevation requests.
///
/// # Route
///
/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(profile): RequireAdmin,
) -> Result<Response> {
    let store = state.store();
    let (_, total_profiles) = store.list_profiles(0, 0).await?;
    let pending = store
        .list_elevation_requests(Some(RequestStatus::Pending))
        .await?;

    Ok(DashboardTemplate {
        profile,
        total_profiles,
        pending,
    }
    .into_response())
}
