//! JSON API handlers.

use axum::{Json, extract::State};
use serde::Serialize;

use tourvisto_core::{Profile, RequestStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireProfile;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub profile: Profile,
    /// Status of the account's elevation request, if it ever made one.
    pub elevation: Option<RequestStatus>,
}

/// Fresh profile for the signed-in account.
///
/// # Route
///
/// `GET /api/me`
pub async fn me(
    State(state): State<AppState>,
    RequireProfile(current): RequireProfile,
) -> Result<Json<MeResponse>> {
    let store = state.store();
    let profile = store
        .get_profile(&current.account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile {}", current.account_id)))?;
    let elevation = store
        .get_elevation_request(&current.account_id)
        .await?
        .map(|r| r.req_status);

    Ok(Json(MeResponse { profile, elevation }))
}
